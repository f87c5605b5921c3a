//! PostgreSQL registration store.
//!
//! Pool-backed store over the `registrations` table:
//! - Exact-match lookup on `phone_number` (indexed, zero or more rows)
//! - Conditional linkage update guarded in the UPDATE predicate
//! - Schema migrations run inline at construction
//!
//! The handle is constructed once at bootstrap and passed into the
//! workflow explicitly; pool semantics make construction idempotent at
//! the connection level.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

use minireg_types::errors::MiniregError;
use minireg_types::records::{CallerId, RecordId, RegistrationRecord};
use minireg_types::traits::RegistrationStore;

// ============================================================
// SQL Migrations (run in constructor, not via sqlx::migrate!)
// ============================================================

const MIGRATION_CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS registrations (\
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(), \
    phone_number TEXT NOT NULL, \
    telegram_id TEXT, \
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb, \
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()\
)";

const MIGRATION_PHONE_INDEX: &str = "\
CREATE INDEX IF NOT EXISTS idx_registrations_phone_number \
ON registrations (phone_number)";

const SELECT_BY_PHONE: &str = "\
SELECT id, phone_number, telegram_id, metadata, created_at \
FROM registrations WHERE phone_number = $1 \
ORDER BY created_at, id";

// The predicate makes the no-overwrite invariant hold even when two
// linkage tasks race on the same record.
const LINK_CALLER: &str = "\
UPDATE registrations SET telegram_id = $2 \
WHERE id = $1 AND (telegram_id IS NULL OR telegram_id = '')";

// ============================================================
// PgRegistrationStore
// ============================================================

/// PostgreSQL-backed registration store.
///
/// Implements the [`RegistrationStore`] trait with:
/// - Exact, case-sensitive `phone_number` equality lookup
/// - Linkage writes that set `telegram_id` only where it is still unset
/// - All other record columns carried opaquely in `metadata`
pub struct PgRegistrationStore {
    pool: PgPool,
}

impl PgRegistrationStore {
    /// Create a new store, connecting to PostgreSQL at the given URL.
    ///
    /// Runs schema migrations on construction so the table and index exist.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, MiniregError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| MiniregError::StoreUnavailable(format!("connection failed: {e}")))?;
        Self::from_pool(pool).await
    }

    /// Create a store from an existing connection pool.
    ///
    /// Runs schema migrations on construction.
    pub async fn from_pool(pool: PgPool) -> Result<Self, MiniregError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run all schema migrations.
    async fn run_migrations(&self) -> Result<(), MiniregError> {
        let migrations = [MIGRATION_CREATE_TABLE, MIGRATION_PHONE_INDEX];

        for sql in migrations {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| MiniregError::StoreUnavailable(format!("migration failed: {e}")))?;
        }

        info!("registration store migrations applied successfully");
        Ok(())
    }
}

fn row_to_record(row: &PgRow) -> Result<RegistrationRecord, MiniregError> {
    let telegram_id: Option<String> = row
        .try_get("telegram_id")
        .map_err(|e| MiniregError::StoreUnavailable(format!("row decode failed: {e}")))?;
    Ok(RegistrationRecord {
        id: row
            .try_get("id")
            .map_err(|e| MiniregError::StoreUnavailable(format!("row decode failed: {e}")))?,
        phone_number: row
            .try_get("phone_number")
            .map_err(|e| MiniregError::StoreUnavailable(format!("row decode failed: {e}")))?,
        telegram_id: telegram_id.filter(|id| !id.is_empty()).map(CallerId),
        metadata: row
            .try_get("metadata")
            .map_err(|e| MiniregError::StoreUnavailable(format!("row decode failed: {e}")))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| MiniregError::StoreUnavailable(format!("row decode failed: {e}")))?,
    })
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn find_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<RegistrationRecord>, MiniregError> {
        let rows = sqlx::query(SELECT_BY_PHONE)
            .bind(phone)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MiniregError::StoreUnavailable(format!("lookup query failed: {e}")))?;

        rows.iter().map(row_to_record).collect()
    }

    async fn link_caller(&self, id: &RecordId, caller: &CallerId) -> Result<(), MiniregError> {
        let result = sqlx::query(LINK_CALLER)
            .bind(id)
            .bind(caller.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| MiniregError::LinkageWrite(format!("update failed: {e}")))?;

        // Zero rows means the record was already linked (or gone); both are
        // acceptable no-ops for a best-effort write.
        tracing::debug!(
            record_id = %id,
            rows_affected = result.rows_affected(),
            "linkage update completed"
        );
        Ok(())
    }
}

// ============================================================
// Tests
// ============================================================
