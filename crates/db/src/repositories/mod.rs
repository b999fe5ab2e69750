use async_trait::async_trait;
use thiserror::Error;

use ordermate_core::domain::order::{Order, OrderId};
use ordermate_core::errors::ApplicationError;

pub mod memory;
pub mod order;

pub use memory::InMemoryOrderRepository;
pub use order::SqlOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

/// Keyed order collection. `save` replaces the whole record for its id.
///
/// Implementations only guarantee single-call atomicity; read-modify-write
/// sequences on one id are serialized by the caller.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Order>, RepositoryError>;
    async fn save(&self, order: Order) -> Result<(), RepositoryError>;
    /// Returns `false` when no record existed for `id`.
    async fn delete(&self, id: &OrderId) -> Result<bool, RepositoryError>;

    /// Cheap reachability probe for health reporting.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
