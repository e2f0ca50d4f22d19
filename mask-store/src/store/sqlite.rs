// mask-store/src/store/sqlite.rs
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::MappingStore;
use crate::address;
use crate::error::StoreError;
use crate::types::{MaskedMapping, MappingStatus, Plan};

const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS mappings (
    masked_address TEXT PRIMARY KEY,
    real_address   TEXT NOT NULL,
    plan           TEXT NOT NULL,
    created_at_ms  INTEGER NOT NULL,
    expires_at_ms  INTEGER NOT NULL,
    status         TEXT NOT NULL
)";

const CREATE_EXPIRY_INDEX: &str = "\
CREATE INDEX IF NOT EXISTS idx_mappings_expirable
    ON mappings (status, expires_at_ms)";

/// SQLite-backed mapping store.
///
/// The masked address is the primary key, so uniqueness rides on the
/// engine's constraint check instead of a read-then-write. Timestamps are
/// stored as unix milliseconds; integer comparison keeps the expiry scan
/// free of string-date pitfalls.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database at `path`, creating file and schema when missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    /// In-memory database for tests and throwaway runs. Pinned to a single
    /// pooled connection that is never reaped: each SQLite `:memory:`
    /// connection is its own empty database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_EXPIRY_INDEX).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl MappingStore for SqliteStore {
    async fn create(
        &self,
        masked_address: &str,
        real_address: &str,
        plan: Plan,
        now: DateTime<Utc>,
    ) -> Result<MaskedMapping, StoreError> {
        address::validate(real_address)?;
        let mapping = MaskedMapping::new(masked_address, real_address, plan, now);

        let result = sqlx::query(
            "INSERT INTO mappings \
             (masked_address, real_address, plan, created_at_ms, expires_at_ms, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&mapping.masked_address)
        .bind(&mapping.real_address)
        .bind(mapping.plan.as_str())
        .bind(mapping.created_at.timestamp_millis())
        .bind(mapping.expires_at.timestamp_millis())
        .bind(mapping.status.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(mapping),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateAddress)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn lookup(&self, masked_address: &str) -> Result<Option<MaskedMapping>, StoreError> {
        let row: Option<MappingRow> = sqlx::query_as(
            "SELECT masked_address, real_address, plan, created_at_ms, expires_at_ms, status \
             FROM mappings WHERE masked_address = ?1",
        )
        .bind(masked_address)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MaskedMapping::try_from).transpose()
    }

    async fn expire(&self, masked_address: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE mappings SET status = ?1 WHERE masked_address = ?2")
            .bind(MappingStatus::Expired.as_str())
            .bind(masked_address)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_expirable(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<MaskedMapping>, StoreError> {
        let rows: Vec<MappingRow> = sqlx::query_as(
            "SELECT masked_address, real_address, plan, created_at_ms, expires_at_ms, status \
             FROM mappings \
             WHERE status = ?1 AND expires_at_ms <= ?2 \
             ORDER BY expires_at_ms \
             LIMIT ?3",
        )
        .bind(MappingStatus::Active.as_str())
        .bind(now.timestamp_millis())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MaskedMapping::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct MappingRow {
    masked_address: String,
    real_address: String,
    plan: String,
    created_at_ms: i64,
    expires_at_ms: i64,
    status: String,
}

impl TryFrom<MappingRow> for MaskedMapping {
    type Error = StoreError;

    fn try_from(row: MappingRow) -> Result<Self, StoreError> {
        let plan = Plan::from_str(&row.plan)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", row.masked_address)))?;
        let status = MappingStatus::from_str(&row.status)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", row.masked_address)))?;
        let created_at = DateTime::from_timestamp_millis(row.created_at_ms).ok_or_else(|| {
            StoreError::Corrupt(format!("{}: created_at out of range", row.masked_address))
        })?;
        let expires_at = DateTime::from_timestamp_millis(row.expires_at_ms).ok_or_else(|| {
            StoreError::Corrupt(format!("{}: expires_at out of range", row.masked_address))
        })?;

        Ok(MaskedMapping {
            masked_address: row.masked_address,
            real_address: row.real_address,
            plan,
            created_at,
            expires_at,
            status,
        })
    }
}
