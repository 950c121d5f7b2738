//! SQLite-backed item store.
//!
//! [`ItemStore`] owns the connection pool. It is opened once at start-up,
//! cloned into the router state and closed on shutdown. Every write runs in
//! its own transaction; the table's `UNIQUE` and `CHECK` constraints are the
//! last line of defence behind request validation.

use std::str::FromStr;
use std::time::Duration;

use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{GroceryItem, ItemChanges, NewItem};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS grocery_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name VARCHAR(100) NOT NULL UNIQUE,
    category VARCHAR(100) NOT NULL DEFAULT 'Other',
    purchased BOOLEAN NOT NULL DEFAULT 0,
    quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity >= 1)
)
"#;

const COLUMNS: &str = "id, name, category, purchased, quantity";

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another row already holds this name.
    #[error("duplicate name: {0}")]
    Duplicate(String),

    /// A `CHECK` or `NOT NULL` constraint rejected the row.
    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Duplicate(db_err.message().to_owned())
            }
            sqlx::Error::Database(db_err)
                if matches!(
                    db_err.kind(),
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation
                ) =>
            {
                Self::Constraint(db_err.message().to_owned())
            }
            _ => Self::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug)]
pub struct ItemStore {
    pool: SqlitePool,
}

impl ItemStore {
    /// Open the pool described by `config`. Does not touch the schema.
    pub async fn connect(config: &Config) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Each in-memory connection is its own database, so keep exactly one
        // and never let the pool recycle it.
        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(config.database_max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Fresh, migrated in-memory store.
    pub async fn in_memory() -> StoreResult<Self> {
        let store = Self::connect(&Config::in_memory()).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        info!("Database schema initialized");
        Ok(())
    }

    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn list(&self) -> StoreResult<Vec<GroceryItem>> {
        let items = sqlx::query_as::<_, GroceryItem>(&format!(
            "SELECT {COLUMNS} FROM grocery_items ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn get(&self, id: i64) -> StoreResult<Option<GroceryItem>> {
        let item = sqlx::query_as::<_, GroceryItem>(&format!(
            "SELECT {COLUMNS} FROM grocery_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn count(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM grocery_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Whether some item other than `exclude` already uses `name`.
    pub async fn name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM grocery_items WHERE name = ?1 AND id IS NOT ?2)",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken != 0)
    }

    pub async fn create(&self, item: &NewItem) -> StoreResult<GroceryItem> {
        let mut tx = self.pool.begin().await?;
        let created = sqlx::query_as::<_, GroceryItem>(&format!(
            "INSERT INTO grocery_items (name, category, purchased, quantity) \
             VALUES (?1, ?2, ?3, ?4) RETURNING {COLUMNS}"
        ))
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.purchased)
        .bind(item.quantity)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(item_id = created.id, item = %created, "Inserted item");
        Ok(created)
    }

    /// Merge `changes` into the row. `None` when the row does not exist.
    pub async fn update(&self, id: i64, changes: &ItemChanges) -> StoreResult<Option<GroceryItem>> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, GroceryItem>(&format!(
            "UPDATE grocery_items SET \
                name = COALESCE(?1, name), \
                category = COALESCE(?2, category), \
                purchased = COALESCE(?3, purchased), \
                quantity = COALESCE(?4, quantity) \
             WHERE id = ?5 RETURNING {COLUMNS}"
        ))
        .bind(changes.name.as_deref())
        .bind(changes.category.as_deref())
        .bind(changes.purchased)
        .bind(changes.quantity)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        if let Some(item) = &updated {
            debug!(item_id = item.id, item = %item, "Updated item");
        }
        Ok(updated)
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM grocery_items WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all(&self) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM grocery_items")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    pub async fn set_all_purchased(&self, purchased: bool) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE grocery_items SET purchased = ?1")
            .bind(purchased)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
