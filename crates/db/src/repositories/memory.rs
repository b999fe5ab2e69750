use std::collections::HashMap;

use tokio::sync::RwLock;

use ordermate_core::domain::order::{Order, OrderId};

use super::{OrderRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut listed = orders.values().cloned().collect::<Vec<_>>();
        listed.sort_by(|left, right| {
            left.created_at.cmp(&right.created_at).then_with(|| left.id.cmp(&right.id))
        });
        Ok(listed)
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.0.clone(), order);
        Ok(())
    }

    async fn delete(&self, id: &OrderId) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.write().await;
        Ok(orders.remove(&id.0).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use ordermate_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};

    use crate::repositories::{InMemoryOrderRepository, OrderRepository};

    #[tokio::test]
    async fn save_then_find_returns_the_stored_record() {
        let repo = InMemoryOrderRepository::default();
        let order = order_fixture("ORD-1", 0);

        repo.save(order.clone()).await.expect("save order");
        let found = repo.find_by_id(&order.id).await.expect("find order");

        assert_eq!(found, Some(order));
    }

    #[tokio::test]
    async fn save_replaces_the_whole_record() {
        let repo = InMemoryOrderRepository::default();
        let mut order = order_fixture("ORD-1", 0);
        repo.save(order.clone()).await.expect("save order");

        order.status = OrderStatus::Ready;
        order.customer_name = "Sam".to_string();
        repo.save(order.clone()).await.expect("replace order");

        let found = repo.find_by_id(&order.id).await.expect("find order").expect("exists");
        assert_eq!(found.status, OrderStatus::Ready);
        assert_eq!(found.customer_name, "Sam");
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn list_is_ordered_by_creation_time() {
        let repo = InMemoryOrderRepository::default();
        repo.save(order_fixture("ORD-B", 2)).await.expect("save");
        repo.save(order_fixture("ORD-A", 1)).await.expect("save");

        let ids = repo
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|order| order.id.0)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["ORD-A".to_string(), "ORD-B".to_string()]);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_existed() {
        let repo = InMemoryOrderRepository::default();
        repo.save(order_fixture("ORD-1", 0)).await.expect("save");

        assert!(repo.delete(&OrderId::from("ORD-1")).await.expect("delete"));
        assert!(!repo.delete(&OrderId::from("ORD-1")).await.expect("second delete"));
        assert_eq!(repo.find_by_id(&OrderId::from("ORD-1")).await.expect("find"), None);
    }

    fn order_fixture(id: &str, minutes: i64) -> Order {
        let created_at = Utc::now() + Duration::minutes(minutes);
        Order {
            id: OrderId::from(id),
            lines: vec![OrderLine::new("1", 1)],
            customer_name: "Alex".to_string(),
            total: Decimal::new(1099, 2),
            status: OrderStatus::Pending,
            created_at,
            updated_at: created_at,
        }
    }
}
