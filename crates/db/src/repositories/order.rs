use chrono::{DateTime, Utc};
use sqlx::Row;

use ordermate_core::domain::order::{Order, OrderId};

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

/// Order store backed by SQLite, one JSON document per order id.
pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn decode_document(raw: &str) -> Result<Order, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("order document: {error}")))
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query("SELECT document FROM order_document WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| decode_document(&row.try_get::<String, _>("document")?)).transpose()
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query("SELECT document FROM order_document ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|row| decode_document(&row.try_get::<String, _>("document")?)).collect()
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        let document = serde_json::to_string(&order)
            .map_err(|error| RepositoryError::Decode(format!("encode order document: {error}")))?;

        sqlx::query(
            "INSERT INTO order_document (id, customer_name, status, document, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 customer_name = excluded.customer_name, \
                 status = excluded.status, \
                 document = excluded.document, \
                 updated_at = excluded.updated_at",
        )
        .bind(order.id.as_str())
        .bind(&order.customer_name)
        .bind(order.status.as_str())
        .bind(document)
        .bind(timestamp(order.created_at))
        .bind(timestamp(order.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM order_document WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
