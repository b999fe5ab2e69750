//! Deterministic stand-in for a hosted model, used by the `local` provider.
//!
//! It reads only the latest user utterance and maps keywords to a command.
//! Items are never extracted here; `CreateOrder`/`UpdateOrder` come back
//! with `items: None` so the orchestrator resolves them from the utterance.

use async_trait::async_trait;

use ordermate_core::domain::order::OrderStatus;

use crate::conversation::{accumulate, extract_order_ids};
use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError};
use crate::tools::OrderCommand;

pub const HELP_TEXT: &str = "I can show the menu, take an order (for example \"2 burgers and 1 pizza\"), \
update or cancel an order, and check an order's status. Tell me your name with \"My name is ...\".";

const ORDER_WORDS: &[&str] = &["order", "want", "like", "have", "get", "buy"];

#[derive(Clone, Copy, Debug, Default)]
pub struct RulePlanner;

impl RulePlanner {
    pub fn plan(&self, request: &CompletionRequest) -> Completion {
        let utterance = request.latest_user_text();
        let lowered = utterance.to_lowercase();
        let words = lowered
            .split(|ch: char| !ch.is_alphanumeric() && ch != '-')
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>();
        let has = |word: &str| words.contains(&word);
        let order_id = find_order_reference(utterance);

        let command = if has("menu") {
            OrderCommand::ShowMenu
        } else if has("cancel") {
            OrderCommand::CancelOrder { order_id }
        } else if has("delete") || has("remove") {
            match order_id {
                Some(order_id) => OrderCommand::DeleteOrder { order_id },
                None => return Completion::Text("Which order should I delete?".to_string()),
            }
        } else if let (Some(order_id), Some(status)) =
            ((has("mark") || has("set")).then_some(order_id.clone()).flatten(), find_status(&words))
        {
            OrderCommand::SetStatus { order_id, status: status.as_str().to_string() }
        } else if has("status") || lowered.contains("where is") {
            OrderCommand::GetStatus { order_id }
        } else if has("change") || has("update") {
            match order_id {
                Some(order_id) => {
                    OrderCommand::UpdateOrder { order_id, items: None, customer_name: None }
                }
                None => return Completion::Text("Which order should I change?".to_string()),
            }
        } else if has("orders") && (has("list") || has("all") || has("my") || has("show")) {
            OrderCommand::ListOrders
        } else if let Some(order_id) = order_id.filter(|_| has("show") || has("details")) {
            OrderCommand::GetOrder { order_id }
        } else if ORDER_WORDS.iter().any(|word| has(*word))
            || words.iter().any(|word| word.parse::<u32>().is_ok())
        {
            OrderCommand::CreateOrder { items: None, customer_name: None }
        } else {
            return Completion::Text(small_talk(request));
        };

        Completion::Command(command)
    }
}

#[async_trait]
impl LlmClient for RulePlanner {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        Ok(self.plan(request))
    }
}

fn small_talk(request: &CompletionRequest) -> String {
    let latest = accumulate(&request.turns[request.turns.len().saturating_sub(1)..]);
    match latest.customer_name.filter(|name| !name.is_empty()) {
        Some(name) => format!("Nice to meet you, {name}! What would you like to order?"),
        None => HELP_TEXT.to_string(),
    }
}

/// A UUID anywhere in the text, otherwise the token after "order" when it
/// carries a digit (caller-keyed ids such as `A-100`).
fn find_order_reference(text: &str) -> Option<String> {
    if let Some(order_id) = extract_order_ids(text).next() {
        return Some(order_id);
    }

    let tokens = text
        .split_whitespace()
        .map(|token| token.trim_matches(|ch: char| !ch.is_alphanumeric() && ch != '-'))
        .collect::<Vec<_>>();
    tokens.windows(2).find_map(|pair| {
        (pair[0].eq_ignore_ascii_case("order") && pair[1].chars().any(|ch| ch.is_ascii_digit()))
            .then(|| pair[1].to_string())
    })
}

fn find_status(words: &[&str]) -> Option<OrderStatus> {
    words.iter().rev().find_map(|word| OrderStatus::parse(word))
}
