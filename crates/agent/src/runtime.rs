use std::fmt::Write;
use std::sync::Arc;

use tracing::info;

use ordermate_core::domain::menu::MenuItem;
use ordermate_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
use ordermate_core::errors::ApplicationError;

use crate::conversation::{accumulate, ConversationContext, Turn};
use crate::intent::resolve;
use crate::llm::{Completion, CompletionRequest, LlmClient, RetryingLlmClient};
use crate::orchestrator::OrderOrchestrator;
use crate::tools::{tool_definitions, LineRequest, OrderCommand};

/// Everything one turn can produce. Failures are values here, not errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Created(Order),
    Updated(Order),
    Status { order_id: OrderId, status: OrderStatus },
    Confirmation(String),
    Menu(Vec<MenuItem>),
    Order(Order),
    Orders(Vec<Order>),
    Reply(String),
    Failed(ApplicationError),
}

pub struct AgentRuntime {
    orchestrator: Arc<OrderOrchestrator>,
    llm: RetryingLlmClient<Arc<dyn LlmClient>>,
}

impl AgentRuntime {
    pub fn new(
        orchestrator: Arc<OrderOrchestrator>,
        llm: RetryingLlmClient<Arc<dyn LlmClient>>,
    ) -> Self {
        Self { orchestrator, llm }
    }

    pub fn orchestrator(&self) -> &Arc<OrderOrchestrator> {
        &self.orchestrator
    }

    /// Runs one user turn: one model completion, then at most one command.
    pub async fn handle_turn(&self, utterance: &str, history: &[Turn]) -> TurnOutcome {
        let mut turns = history.to_vec();
        turns.push(Turn::user(utterance));
        let context = accumulate(&turns);

        let request = CompletionRequest {
            system: system_prompt(self.orchestrator.catalog().items(), &context),
            turns,
            tools: tool_definitions(),
        };

        match self.llm.complete(&request).await {
            Ok(Completion::Text(text)) => TurnOutcome::Reply(text),
            Ok(Completion::Command(command)) => {
                let tool = command.tool_name();
                let outcome = self.execute(command, &context, utterance, history).await;
                info!(
                    event_name = "agent.command.executed",
                    tool,
                    failed = matches!(outcome, TurnOutcome::Failed(_)),
                    "agent command executed"
                );
                outcome
            }
            Err(error) => TurnOutcome::Failed(error),
        }
    }

    pub async fn execute(
        &self,
        command: OrderCommand,
        context: &ConversationContext,
        utterance: &str,
        history: &[Turn],
    ) -> TurnOutcome {
        match self.dispatch(command, context, utterance, history).await {
            Ok(outcome) => outcome,
            Err(error) => TurnOutcome::Failed(error),
        }
    }

    async fn dispatch(
        &self,
        command: OrderCommand,
        context: &ConversationContext,
        utterance: &str,
        history: &[Turn],
    ) -> Result<TurnOutcome, ApplicationError> {
        let orchestrator = &self.orchestrator;
        match command {
            OrderCommand::CreateOrder { items: None, customer_name: None } => {
                orchestrator.take_order(utterance, history).await.map(TurnOutcome::Created)
            }
            OrderCommand::CreateOrder { items, customer_name } => {
                let lines = self.lines_for(items.as_deref(), utterance);
                let name = non_blank(customer_name)
                    .or_else(|| context.customer_name.clone())
                    .unwrap_or_default();
                orchestrator.place_order(&lines, &name).await.map(TurnOutcome::Created)
            }
            OrderCommand::UpdateOrder { order_id, items, customer_name } => {
                let order_id = OrderId::from(order_id.as_str());
                let existing = orchestrator.get_order(&order_id).await?;
                let lines = self.lines_for(items.as_deref(), utterance);
                let name = non_blank(customer_name)
                    .or_else(|| context.customer_name.clone())
                    .unwrap_or(existing.customer_name);
                orchestrator.update_order(&order_id, &lines, &name).await.map(TurnOutcome::Updated)
            }
            OrderCommand::CancelOrder { order_id } => {
                let order_id = referenced_order(order_id, context, "cancel")?;
                let order = orchestrator.cancel_order(&order_id).await?;
                Ok(TurnOutcome::Confirmation(format!("Order {} has been cancelled.", order.id)))
            }
            OrderCommand::GetStatus { order_id } => {
                let order_id = referenced_order(order_id, context, "check")?;
                let status = orchestrator.get_status(&order_id).await?;
                Ok(TurnOutcome::Status { order_id, status })
            }
            OrderCommand::SetStatus { order_id, status } => orchestrator
                .set_status(&OrderId::from(order_id.as_str()), &status)
                .await
                .map(TurnOutcome::Updated),
            OrderCommand::ShowMenu => Ok(TurnOutcome::Menu(orchestrator.catalog().items().to_vec())),
            OrderCommand::GetOrder { order_id } => {
                orchestrator.get_order(&OrderId::from(order_id.as_str())).await.map(TurnOutcome::Order)
            }
            OrderCommand::ListOrders => orchestrator.list_orders().await.map(TurnOutcome::Orders),
            OrderCommand::DeleteOrder { order_id } => {
                let order_id = OrderId::from(order_id.as_str());
                orchestrator.delete_order(&order_id).await?;
                Ok(TurnOutcome::Confirmation(format!("Order {order_id} has been deleted.")))
            }
        }
    }

    fn lines_for(&self, items: Option<&[LineRequest]>, utterance: &str) -> Vec<OrderLine> {
        match items {
            Some(items) => items.iter().map(OrderLine::from).collect(),
            None => resolve(utterance, self.orchestrator.catalog().items()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn referenced_order(
    order_id: Option<String>,
    context: &ConversationContext,
    verb: &str,
) -> Result<OrderId, ApplicationError> {
    order_id
        .or_else(|| context.last_order_id().map(str::to_string))
        .map(|order_id| OrderId::from(order_id.as_str()))
        .ok_or_else(|| ApplicationError::ClarificationNeeded {
            prompt: format!("Which order should I {verb}? Please give me the order ID."),
        })
}

fn system_prompt(menu: &[MenuItem], context: &ConversationContext) -> String {
    let mut prompt = String::from(
        "You are a restaurant ordering assistant. Use the tools to place, update, cancel \
         and look up orders. Never invent prices or order ids. Ask for the customer's name \
         before placing an order if it is unknown.\n\nMenu:\n",
    );
    for item in menu {
        let _ = writeln!(
            prompt,
            "- id {}: {} (${}) {}",
            item.id, item.name, item.price, item.description
        );
    }
    if let Some(name) = &context.customer_name {
        let _ = writeln!(prompt, "\nCustomer name: {name}");
    }
    if !context.previous_order_ids.is_empty() {
        let _ = writeln!(
            prompt,
            "Orders placed in this conversation: {}",
            context.previous_order_ids.join(", ")
        );
    }
    prompt
}

/// Renders an outcome as the assistant's reply text. Order ids are always
/// written out in full so later turns can refer back to them.
pub fn render(outcome: &TurnOutcome) -> String {
    match outcome {
        TurnOutcome::Created(order) => format!(
            "Order placed for {}! Your order ID is {}. Total: ${}.",
            order.customer_name, order.id, order.total
        ),
        TurnOutcome::Updated(order) => format!(
            "Order {} updated. Status: {}. Total: ${}.",
            order.id, order.status, order.total
        ),
        TurnOutcome::Status { order_id, status } => format!("Order {order_id} is {status}."),
        TurnOutcome::Confirmation(message) | TurnOutcome::Reply(message) => message.clone(),
        TurnOutcome::Menu(items) => {
            let mut text = String::from("Here is our menu:");
            for item in items {
                let _ = write!(text, "\n- {} (id {}): ${}", item.name, item.id, item.price);
            }
            text
        }
        TurnOutcome::Order(order) => {
            let mut text = format!(
                "Order {} for {} is {}. Total: ${}.",
                order.id, order.customer_name, order.status, order.total
            );
            for line in &order.lines {
                let _ = write!(text, "\n- {} x item {}", line.quantity, line.menu_item_id);
            }
            text
        }
        TurnOutcome::Orders(orders) if orders.is_empty() => "There are no orders yet.".to_string(),
        TurnOutcome::Orders(orders) => {
            let mut text = String::from("Orders:");
            for order in orders {
                let _ = write!(
                    text,
                    "\n- {} ({}, {}): ${}",
                    order.id, order.customer_name, order.status, order.total
                );
            }
            text
        }
        TurnOutcome::Failed(error) => render_failure(error),
    }
}

fn render_failure(error: &ApplicationError) -> String {
    match error {
        ApplicationError::ClarificationNeeded { prompt } => prompt.clone(),
        ApplicationError::Domain(domain) => format!("Sorry, {domain}."),
        ApplicationError::NotFound { order_id } => {
            format!("Sorry, I couldn't find an order with ID {order_id}.")
        }
        ApplicationError::AlreadyCancelled { order_id } => {
            format!("Order {order_id} is already cancelled.")
        }
        ApplicationError::DuplicateOrderId { order_id } => {
            format!("An order with ID {order_id} already exists.")
        }
        ApplicationError::UpstreamTimeout { .. } | ApplicationError::UpstreamFailure(_) => {
            "Sorry, I'm having trouble thinking right now. Please try again in a moment.".to_string()
        }
        ApplicationError::Persistence(_) | ApplicationError::Configuration(_) => {
            "Sorry, something went wrong on our side. Please try again later.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use ordermate_core::domain::menu::MenuItem;
    use ordermate_core::domain::order::{OrderLine, OrderStatus};
    use ordermate_core::errors::ApplicationError;
    use ordermate_core::ordering::catalog::MenuCatalog;
    use ordermate_db::repositories::InMemoryOrderRepository;

    use super::{render, AgentRuntime, TurnOutcome};
    use crate::conversation::Turn;
    use crate::llm::{
        Completion, CompletionRequest, LlmClient, LlmError, RetryPolicy, RetryingLlmClient,
    };
    use crate::orchestrator::OrderOrchestrator;
    use crate::planner::RulePlanner;
    use crate::tools::{LineRequest, OrderCommand};

    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<Completion, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            self.requests.lock().expect("lock").push(request.clone());
            self.replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Response("script exhausted".to_string())))
        }
    }

    fn orchestrator() -> Arc<OrderOrchestrator> {
        let catalog = MenuCatalog::new(vec![
            MenuItem::new("2", "Burgers", "Beef burger", Decimal::new(1250, 2)),
            MenuItem::new("1", "Pizza", "Margherita", Decimal::new(1099, 2)),
        ]);
        Arc::new(OrderOrchestrator::new(
            Arc::new(catalog),
            Arc::new(InMemoryOrderRepository::default()),
        ))
    }

    fn runtime_with(llm: Arc<dyn LlmClient>) -> AgentRuntime {
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_secs(1),
            max_retries: 1,
            base_delay: Duration::from_millis(10),
        };
        AgentRuntime::new(orchestrator(), RetryingLlmClient::new(llm, policy))
    }

    fn scripted(replies: Vec<Result<Completion, LlmError>>) -> Arc<ScriptedLlm> {
        Arc::new(ScriptedLlm { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()) })
    }

    #[tokio::test]
    async fn local_planner_takes_an_order_using_the_remembered_name() {
        let runtime = runtime_with(Arc::new(RulePlanner));
        let history = vec![Turn::user("My name is Alex."), Turn::assistant("Nice to meet you, Alex!")];

        let outcome = runtime.handle_turn("I want 2 burgers and 1 pizza", &history).await;

        let TurnOutcome::Created(order) = outcome else { panic!("expected an order") };
        assert_eq!(order.customer_name, "Alex");
        assert_eq!(order.total, Decimal::new(3599, 2));
        assert_eq!(order.lines, vec![OrderLine::new("2", 2), OrderLine::new("1", 1)]);
    }

    #[tokio::test]
    async fn cancel_without_id_uses_the_last_order_in_the_conversation() {
        let runtime = runtime_with(Arc::new(RulePlanner));
        let history = vec![Turn::user("My name is Alex.")];
        let created = runtime.handle_turn("2 burgers please", &history).await;
        let reply = render(&created);
        let TurnOutcome::Created(order) = created else { panic!("expected an order") };

        let history = vec![
            Turn::user("My name is Alex."),
            Turn::user("2 burgers please"),
            Turn::assistant(reply),
        ];
        let outcome = runtime.handle_turn("cancel my order", &history).await;

        assert_eq!(
            outcome,
            TurnOutcome::Confirmation(format!("Order {} has been cancelled.", order.id))
        );
        assert_eq!(
            runtime.orchestrator().get_status(&order.id).await,
            Ok(OrderStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn order_without_a_name_asks_for_one() {
        let runtime = runtime_with(Arc::new(RulePlanner));

        let outcome = runtime.handle_turn("2 burgers", &[]).await;

        assert!(matches!(outcome, TurnOutcome::Failed(ApplicationError::ClarificationNeeded { .. })));
        assert_eq!(render(&outcome), "What name should I put the order under?");
    }

    #[tokio::test]
    async fn model_tool_call_with_explicit_items_is_priced_from_the_catalog() {
        let llm = scripted(vec![Ok(Completion::Command(OrderCommand::CreateOrder {
            items: Some(vec![LineRequest { menu_item_id: "1".to_string(), quantity: 3 }]),
            customer_name: Some("Sam".to_string()),
        }))]);
        let runtime = runtime_with(llm.clone());

        let outcome = runtime.handle_turn("three pizzas for Sam", &[]).await;

        let TurnOutcome::Created(order) = outcome else { panic!("expected an order") };
        assert_eq!(order.total, Decimal::new(3297, 2));
        let requests = llm.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].turns.last(), Some(&Turn::user("three pizzas for Sam")));
        assert!(requests[0].system.contains("Pizza"));
    }

    #[tokio::test]
    async fn model_failure_becomes_a_typed_outcome() {
        let llm = scripted(Vec::new());
        let runtime = runtime_with(llm);

        let outcome = runtime.handle_turn("hello", &[]).await;

        assert!(matches!(outcome, TurnOutcome::Failed(ApplicationError::UpstreamFailure(_))));
        assert!(render(&outcome).contains("try again"));
    }

    #[tokio::test]
    async fn missing_order_and_menu_render_as_messages() {
        let runtime = runtime_with(Arc::new(RulePlanner));

        let missing = runtime.handle_turn("status of order 42", &[]).await;
        assert_eq!(render(&missing), "Sorry, I couldn't find an order with ID 42.");

        let menu = runtime.handle_turn("menu please", &[]).await;
        assert!(render(&menu).contains("Burgers (id 2): $12.50"));
    }
}
