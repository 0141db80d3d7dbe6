use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, Result, StateRecord, StateStoreError, Version,
    store::{StateStore, validate_record_for_save},
};

/// PostgreSQL-backed state store.
///
/// Each aggregate is one row in `aggregate_states`; writes are guarded by a
/// conditional statement on the `version` column.
#[derive(Clone)]
pub struct PostgresStateStore {
    pool: PgPool,
}

impl PostgresStateStore {
    /// Creates a new PostgreSQL state store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL and creates a store on the new pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<StateRecord> {
        Ok(StateRecord {
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            state: row.try_get("state")?,
        })
    }

    /// Reads the stored version, including logically deleted rows.
    async fn current_version(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Version> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM aggregate_states WHERE aggregate_type = $1 AND aggregate_id = $2",
        )
        .bind(aggregate_type)
        .bind(aggregate_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(Version::new(version.unwrap_or(0)))
    }

    async fn conflict(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        expected: Version,
    ) -> StateStoreError {
        metrics::counter!("state_store_conflicts_total").increment(1);
        match self.current_version(aggregate_type, aggregate_id).await {
            Ok(actual) => StateStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            },
            Err(e) => e,
        }
    }
}

/// Runs the guarded insert or update for one record. Returns false when the
/// version check did not match any row.
async fn write_record<'e, E>(
    executor: E,
    record: &StateRecord,
    expected_version: Version,
) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let result = if expected_version == Version::initial() {
        sqlx::query(
            r#"
            INSERT INTO aggregate_states (aggregate_type, aggregate_id, version, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (aggregate_type, aggregate_id) DO NOTHING
            "#,
        )
        .bind(&record.aggregate_type)
        .bind(record.aggregate_id.as_uuid())
        .bind(record.version.as_i64())
        .bind(&record.state)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(executor)
        .await?
    } else {
        sqlx::query(
            r#"
            UPDATE aggregate_states
            SET version = $3, state = $4, updated_at = $5
            WHERE aggregate_type = $1 AND aggregate_id = $2
              AND version = $6 AND deleted_at IS NULL
            "#,
        )
        .bind(&record.aggregate_type)
        .bind(record.aggregate_id.as_uuid())
        .bind(record.version.as_i64())
        .bind(&record.state)
        .bind(record.updated_at)
        .bind(expected_version.as_i64())
        .execute(executor)
        .await?
    };

    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl StateStore for PostgresStateStore {
    async fn load(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<StateRecord>> {
        let row = sqlx::query(
            r#"
            SELECT aggregate_type, aggregate_id, version, state, created_at, updated_at
            FROM aggregate_states
            WHERE aggregate_type = $1 AND aggregate_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(aggregate_type)
        .bind(aggregate_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    #[tracing::instrument(
        skip(self, record),
        fields(aggregate_type = %record.aggregate_type, aggregate_id = %record.aggregate_id)
    )]
    async fn save(&self, record: StateRecord, expected_version: Version) -> Result<Version> {
        validate_record_for_save(&record, expected_version)?;

        if !write_record(&self.pool, &record, expected_version).await? {
            return Err(self
                .conflict(&record.aggregate_type, record.aggregate_id, expected_version)
                .await);
        }

        tracing::debug!(version = %record.version, "state saved");
        Ok(record.version)
    }

    #[tracing::instrument(skip(self, writes), fields(records = writes.len()))]
    async fn save_all(&self, writes: Vec<(StateRecord, Version)>) -> Result<Vec<Version>> {
        for (record, expected_version) in &writes {
            validate_record_for_save(record, *expected_version)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut versions = Vec::with_capacity(writes.len());

        for (record, expected_version) in &writes {
            if !write_record(&mut *tx, record, *expected_version).await? {
                tx.rollback().await?;
                return Err(self
                    .conflict(&record.aggregate_type, record.aggregate_id, *expected_version)
                    .await);
            }
            versions.push(record.version);
        }

        tx.commit().await?;
        tracing::debug!(?versions, "states saved");
        Ok(versions)
    }

    async fn delete(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        expected_version: Version,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE aggregate_states
            SET deleted_at = $4
            WHERE aggregate_type = $1 AND aggregate_id = $2
              AND version = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(aggregate_type)
        .bind(aggregate_id.as_uuid())
        .bind(expected_version.as_i64())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self
                .conflict(aggregate_type, aggregate_id, expected_version)
                .await);
        }
        Ok(())
    }
}
