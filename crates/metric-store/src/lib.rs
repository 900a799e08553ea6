//! SQLite persistence for the Vitals service layer.
//!
//! Health metrics, chat sessions, chat messages and user profiles are stored
//! with SQLx. Timestamps are Unix milliseconds; metric metadata is JSON text.
//! [`SqliteStore`] exposes the store through the `MetricStore` and
//! `ChatStore` traits from `vitals-core`.
//!
//! # Example
//!
//! ```no_run
//! use metric_store::{Database, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:vitals.db?mode=rwc").await?;
//!     db.migrate().await?;
//!     let store = SqliteStore::new(db);
//!     # let _ = store;
//!     Ok(())
//! }
//! ```

pub mod chat_message;
pub mod chat_session;
pub mod error;
pub mod health_metric;
pub mod models;
mod store;
pub mod user_profile;

pub use error::{DatabaseError, Result};
pub use models::UserProfile;
pub use store::SqliteStore;
pub use user_profile::ProfileField;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 8;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// In-memory databases are private to each connection, so use
    /// [`Database::connect_with_pool_size`] with a size of 1 for
    /// `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
