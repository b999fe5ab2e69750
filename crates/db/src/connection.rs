use std::sync::Arc;
use std::time::Duration;

use ordermate_core::config::{AppConfig, StorageBackend};
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::migrations;
use crate::repositories::{
    InMemoryOrderRepository, OrderRepository, RepositoryError, SqlOrderRepository,
};

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Builds the order store selected by `storage.backend`, applying pending
/// migrations for the SQLite document store.
pub async fn open_order_repository(
    config: &AppConfig,
) -> Result<Arc<dyn OrderRepository>, RepositoryError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!(
                event_name = "system.storage.selected",
                correlation_id = "bootstrap",
                backend = "memory",
                "using in-memory order store"
            );
            Ok(Arc::new(InMemoryOrderRepository::default()))
        }
        StorageBackend::Sqlite => {
            let pool = connect_with_settings(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await?;
            migrations::run_pending(&pool).await?;
            info!(
                event_name = "system.storage.selected",
                correlation_id = "bootstrap",
                backend = "sqlite",
                "using sqlite order document store"
            );
            Ok(Arc::new(SqlOrderRepository::new(pool)))
        }
    }
}
