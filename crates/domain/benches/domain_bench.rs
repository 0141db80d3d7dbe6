use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Aggregate, LineItem, Money, Order, Repository};
use state_store::InMemoryStateStore;

fn line_item(cents: i64) -> LineItem {
    LineItem::new(AggregateId::new(), "Benchmark Bowl", 1, Money::from_cents(cents))
}

fn bench_raise_events(c: &mut Criterion) {
    c.bench_function("domain/add_item_and_confirm", |b| {
        b.iter(|| {
            let mut order = Order::new();
            order.add_item(line_item(1000)).unwrap();
            order.confirm().unwrap();
            order
        });
    });
}

fn bench_apply_50_events(c: &mut Criterion) {
    c.bench_function("domain/apply_50_events", |b| {
        b.iter(|| {
            let mut order = Order::new();
            for n in 1..=50 {
                order.add_item(line_item(100 * n)).unwrap();
            }
            order
        });
    });
}

fn bench_save_and_load(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let repository: Repository<Order, _> = Repository::new(InMemoryStateStore::new());

    c.bench_function("domain/save_and_load", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut order = Order::new();
                order.add_item(line_item(1000)).unwrap();
                order.confirm().unwrap();
                repository.save(&mut order).await.unwrap();
                repository.get(order.id().unwrap()).await.unwrap()
            })
        });
    });
}

fn bench_load_large_state(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let repository: Repository<Order, _> = Repository::new(InMemoryStateStore::new());

    // One order with 100 distinct line items
    let order_id = rt.block_on(async {
        let mut order = Order::new();
        for n in 1..=100 {
            order.add_item(line_item(10 * n)).unwrap();
        }
        repository.save(&mut order).await.unwrap();
        order.id().unwrap()
    });

    c.bench_function("domain/load_100_items", |b| {
        b.iter(|| rt.block_on(async { repository.get(order_id).await.unwrap() }));
    });
}

criterion_group!(
    benches,
    bench_raise_events,
    bench_apply_50_events,
    bench_save_and_load,
    bench_load_large_state,
);
criterion_main!(benches);
