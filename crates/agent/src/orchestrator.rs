//! Validation and mutation coordinator between resolved intent and storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use ordermate_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
use ordermate_core::errors::ApplicationError;
use ordermate_core::ordering::catalog::MenuCatalog;
use ordermate_core::ordering::OrderPricer;
use ordermate_db::repositories::OrderRepository;

use crate::conversation::{accumulate, Turn};
use crate::intent::resolve;

pub const UNRESOLVED_ITEMS_PROMPT: &str =
    "Sorry, I couldn't understand your order. Please specify item names and quantities.";
pub const MISSING_NAME_PROMPT: &str = "What name should I put the order under?";

type LockMap = HashMap<OrderId, Arc<Mutex<()>>>;

/// One async lock per order id, held across every read-modify-write.
///
/// An entry lives only while some caller holds or waits on it; the last
/// [`OrderGuard`] to drop removes it.
#[derive(Default)]
struct OrderLocks {
    locks: Arc<StdMutex<LockMap>>,
}

impl OrderLocks {
    async fn acquire(&self, id: &OrderId) -> OrderGuard {
        let lock = {
            let mut locks = lock_map(&self.locks);
            locks.entry(id.clone()).or_default().clone()
        };
        let claim = LockClaim { id: id.clone(), lock, locks: self.locks.clone() };
        let guard = claim.lock.clone().lock_owned().await;
        OrderGuard { _guard: guard, _claim: claim }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

fn lock_map(locks: &StdMutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A caller's interest in one id's lock, from before it waits until after it
/// releases.
struct LockClaim {
    id: OrderId,
    lock: Arc<Mutex<()>>,
    locks: Arc<StdMutex<LockMap>>,
}

impl Drop for LockClaim {
    fn drop(&mut self) {
        let mut locks = lock_map(&self.locks);
        // The map and this claim are the only owners left.
        let idle = Arc::strong_count(&self.lock) == 2;
        if idle && locks.get(&self.id).is_some_and(|entry| Arc::ptr_eq(entry, &self.lock)) {
            locks.remove(&self.id);
        }
    }
}

/// Fields drop in order: the mutex is released before the claim is checked.
struct OrderGuard {
    _guard: OwnedMutexGuard<()>,
    _claim: LockClaim,
}

pub struct OrderOrchestrator {
    catalog: Arc<MenuCatalog>,
    repository: Arc<dyn OrderRepository>,
    pricer: OrderPricer,
    locks: OrderLocks,
}

impl OrderOrchestrator {
    pub fn new(catalog: Arc<MenuCatalog>, repository: Arc<dyn OrderRepository>) -> Self {
        Self { catalog, repository, pricer: OrderPricer::default(), locks: OrderLocks::default() }
    }

    pub fn catalog(&self) -> &MenuCatalog {
        &self.catalog
    }

    /// Resolves `utterance` against the menu and places the order under the
    /// name accumulated from `history` plus the utterance itself.
    pub async fn take_order(
        &self,
        utterance: &str,
        history: &[Turn],
    ) -> Result<Order, ApplicationError> {
        let mut turns = history.to_vec();
        turns.push(Turn::user(utterance));
        let context = accumulate(&turns);

        let lines = resolve(utterance, self.catalog.items());
        self.place_order(&lines, context.customer_name.as_deref().unwrap_or_default()).await
    }

    pub async fn place_order(
        &self,
        lines: &[OrderLine],
        customer_name: &str,
    ) -> Result<Order, ApplicationError> {
        self.create(OrderId::generate(), lines, customer_name, false).await
    }

    /// Creates an order under a caller-chosen key; the key must be unused.
    pub async fn place_order_with_id(
        &self,
        order_id: OrderId,
        lines: &[OrderLine],
        customer_name: &str,
    ) -> Result<Order, ApplicationError> {
        self.create(order_id, lines, customer_name, true).await
    }

    async fn create(
        &self,
        order_id: OrderId,
        lines: &[OrderLine],
        customer_name: &str,
        check_existing: bool,
    ) -> Result<Order, ApplicationError> {
        let (lines, total, customer_name) = self.validate(lines, customer_name)?;

        let _guard = self.locks.acquire(&order_id).await;
        if check_existing && self.repository.find_by_id(&order_id).await?.is_some() {
            return Err(ApplicationError::DuplicateOrderId { order_id });
        }

        let now = Utc::now();
        let order = Order {
            id: order_id,
            lines,
            customer_name,
            total,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.repository.save(order.clone()).await?;

        info!(
            event_name = "order.created",
            correlation_id = "orchestrator",
            order_id = %order.id,
            total = %order.total,
            line_count = order.lines.len(),
            "order created"
        );
        Ok(order)
    }

    pub async fn update_order(
        &self,
        order_id: &OrderId,
        lines: &[OrderLine],
        customer_name: &str,
    ) -> Result<Order, ApplicationError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.require(order_id).await?;
        let (lines, total, customer_name) = self.validate(lines, customer_name)?;

        order.lines = lines;
        order.customer_name = customer_name;
        order.total = total;
        order.updated_at = Utc::now();
        self.repository.save(order.clone()).await?;

        info!(
            event_name = "order.updated",
            correlation_id = "orchestrator",
            order_id = %order.id,
            total = %order.total,
            "order updated"
        );
        Ok(order)
    }

    pub async fn set_status(
        &self,
        order_id: &OrderId,
        status: &str,
    ) -> Result<Order, ApplicationError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.require(order_id).await?;
        let status = status.parse::<OrderStatus>()?;

        let previous = order.status;
        order.set_status(status);
        self.repository.save(order.clone()).await?;

        info!(
            event_name = "order.status_changed",
            correlation_id = "orchestrator",
            order_id = %order.id,
            from = previous.as_str(),
            to = status.as_str(),
            "order status changed"
        );
        Ok(order)
    }

    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, ApplicationError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.require(order_id).await?;

        if order.cancel().is_err() {
            return Err(ApplicationError::AlreadyCancelled { order_id: order.id });
        }
        self.repository.save(order.clone()).await?;

        info!(
            event_name = "order.cancelled",
            correlation_id = "orchestrator",
            order_id = %order.id,
            "order cancelled"
        );
        Ok(order)
    }

    pub async fn get_status(&self, order_id: &OrderId) -> Result<OrderStatus, ApplicationError> {
        Ok(self.require(order_id).await?.status)
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order, ApplicationError> {
        self.require(order_id).await
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, ApplicationError> {
        Ok(self.repository.list().await?)
    }

    pub async fn delete_order(&self, order_id: &OrderId) -> Result<(), ApplicationError> {
        {
            let _guard = self.locks.acquire(order_id).await;
            if !self.repository.delete(order_id).await? {
                return Err(ApplicationError::NotFound { order_id: order_id.clone() });
            }
        }

        info!(
            event_name = "order.deleted",
            correlation_id = "orchestrator",
            order_id = %order_id,
            "order deleted"
        );
        Ok(())
    }

    async fn require(&self, order_id: &OrderId) -> Result<Order, ApplicationError> {
        self.repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound { order_id: order_id.clone() })
    }

    /// Empty lines ask for clarification, then every menu reference is
    /// checked, then the customer name. Nothing is stored here.
    fn validate(
        &self,
        lines: &[OrderLine],
        customer_name: &str,
    ) -> Result<(Vec<OrderLine>, rust_decimal::Decimal, String), ApplicationError> {
        if lines.is_empty() {
            return Err(ApplicationError::ClarificationNeeded {
                prompt: UNRESOLVED_ITEMS_PROMPT.to_string(),
            });
        }

        let priced = self.pricer.price(&self.catalog, lines)?;

        let customer_name = customer_name.trim();
        if customer_name.is_empty() {
            return Err(ApplicationError::ClarificationNeeded {
                prompt: MISSING_NAME_PROMPT.to_string(),
            });
        }

        Ok((lines.to_vec(), priced.total, customer_name.to_string()))
    }
}
