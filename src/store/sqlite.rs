use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{CatalogStore, StoreError};
use crate::core::entry::CatalogEntry;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS catalog_entries (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    name_lower TEXT NOT NULL
)";

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER`
const MAX_BIND_PARAMS: usize = 32_766;

/// Each upserted row binds id, name and name_lower
const UPSERT_ROWS_PER_STATEMENT: usize = MAX_BIND_PARAMS / 3;

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_catalog_entries_name_lower ON catalog_entries (name_lower)";

/// SQLite-backed catalog table.
///
/// `name_lower` holds the folded name so that case-insensitive search uses
/// the same folding as the rest of the crate, including non-ASCII names.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (and create if missing) the database at `url`.
    ///
    /// An in-memory URL gets a single connection that is never recycled,
    /// since every SQLite connection sees its own private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the URL is invalid, the database
    /// cannot be opened, or the table cannot be created.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new();
        if in_memory {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(max_connections.max(1));
        }

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn into_entries(rows: Vec<(i64, String)>) -> Vec<CatalogEntry> {
    rows.into_iter()
        .map(|(id, name)| CatalogEntry { id, name })
        .collect()
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn upsert_batch(&self, batch: &[CatalogEntry]) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        // A batch larger than one statement allows still commits atomically
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for chunk in batch.chunks(UPSERT_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO catalog_entries (id, name, name_lower) ");
            builder.push_values(chunk, |mut row, entry| {
                row.push_bind(entry.id)
                    .push_bind(entry.name.clone())
                    .push_bind(entry.name_key());
            });
            builder.push(
                " ON CONFLICT (id) DO UPDATE SET name = excluded.name, name_lower = excluded.name_lower",
            );
            affected += builder.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;

        debug!("Upserted {affected} rows");
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, StoreError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM catalog_entries WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name)| CatalogEntry { id, name }))
    }

    async fn find_by_lower_names(
        &self,
        lower_names: &[String],
    ) -> Result<Vec<CatalogEntry>, StoreError> {
        if lower_names.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows: Vec<(i64, String)> = Vec::new();
        for chunk in lower_names.chunks(MAX_BIND_PARAMS) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT id, name FROM catalog_entries WHERE name_lower IN (");
            let mut separated = builder.separated(", ");
            for name in chunk {
                separated.push_bind(name.clone());
            }
            separated.push_unseparated(")");

            rows.extend(
                builder
                    .build_query_as::<(i64, String)>()
                    .fetch_all(&self.pool)
                    .await?,
            );
        }

        // A row can match names in several chunks; callers rely on id order
        rows.sort_unstable_by_key(|(id, _)| *id);
        rows.dedup_by_key(|(id, _)| *id);
        Ok(into_entries(rows))
    }

    async fn load_all(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM catalog_entries ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(into_entries(rows))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
