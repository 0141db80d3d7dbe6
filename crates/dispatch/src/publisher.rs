//! The collaborator events are handed to after a successful command.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use domain::DomainEvent;
use tokio::sync::RwLock;

use crate::error::PublicationError;

/// Delivers one already persisted event.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: Arc<dyn DomainEvent>) -> Result<(), PublicationError>;
}

#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, event: Arc<dyn DomainEvent>) -> Result<(), PublicationError> {
        (**self).publish(event).await
    }
}

/// Publisher that records what it was given.
///
/// It can be told to reject chosen event types. Cloning shares the records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublisher {
    attempted: Arc<RwLock<Vec<Arc<dyn DomainEvent>>>>,
    published: Arc<RwLock<Vec<Arc<dyn DomainEvent>>>>,
    failing: Arc<RwLock<HashSet<&'static str>>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later publish of `event_type` fail.
    pub async fn fail_on(&self, event_type: &'static str) {
        self.failing.write().await.insert(event_type);
    }

    /// Every event `publish` was called with, including rejected ones.
    pub async fn attempted(&self) -> Vec<Arc<dyn DomainEvent>> {
        self.attempted.read().await.clone()
    }

    /// Events that were accepted, in publish order.
    pub async fn published(&self) -> Vec<Arc<dyn DomainEvent>> {
        self.published.read().await.clone()
    }

    pub async fn published_types(&self) -> Vec<&'static str> {
        self.published
            .read()
            .await
            .iter()
            .map(|event| event.event_type())
            .collect()
    }

    pub async fn clear(&self) {
        self.attempted.write().await.clear();
        self.published.write().await.clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, event: Arc<dyn DomainEvent>) -> Result<(), PublicationError> {
        self.attempted.write().await.push(event.clone());

        if self.failing.read().await.contains(event.event_type()) {
            return Err(PublicationError {
                event_type: event.event_type(),
                aggregate_id: event.aggregate_id(),
                reason: "configured to fail".to_string(),
            });
        }

        self.published.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Aggregate, MenuItem, Money};

    fn created_event() -> Arc<dyn DomainEvent> {
        let item = MenuItem::create("Mochi", Money::from_cents(300)).unwrap();
        item.root().pending_events()[0].clone()
    }

    #[tokio::test]
    async fn records_published_events() {
        let publisher = InMemoryPublisher::new();
        publisher.publish(created_event()).await.unwrap();

        assert_eq!(publisher.published_types().await, ["MenuItemCreated"]);
        assert_eq!(publisher.attempted().await.len(), 1);
    }

    #[tokio::test]
    async fn configured_failures_are_attempted_but_not_published() {
        let publisher = InMemoryPublisher::new();
        publisher.fail_on("MenuItemCreated").await;

        let event = created_event();
        let err = publisher.publish(event.clone()).await.unwrap_err();

        assert_eq!(err.event_type, "MenuItemCreated");
        assert_eq!(err.aggregate_id, event.aggregate_id());
        assert_eq!(publisher.attempted().await.len(), 1);
        assert!(publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn clones_share_records() {
        let publisher = InMemoryPublisher::new();
        let shared: Arc<dyn EventPublisher> = Arc::new(publisher.clone());

        shared.publish(created_event()).await.unwrap();
        assert_eq!(publisher.published().await.len(), 1);

        publisher.clear().await;
        assert!(publisher.attempted().await.is_empty());
    }
}
