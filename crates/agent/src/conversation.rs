//! Folds chat history into the context later turns rely on.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const NAME_MARKER: &str = "my name is";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub customer_name: Option<String>,
    pub previous_order_ids: Vec<String>,
}

impl ConversationContext {
    pub fn last_order_id(&self) -> Option<&str> {
        self.previous_order_ids.last().map(String::as_str)
    }
}

/// Derives the context from `history`. Pure; nothing is persisted.
///
/// The customer name comes from user turns containing "my name is" (any
/// case): the text after the phrase up to the next `.`, trimmed, taken
/// verbatim. The last such turn wins. Previous order ids are the UUID
/// tokens found in assistant turns, first-seen order, without repeats.
pub fn accumulate(history: &[Turn]) -> ConversationContext {
    let mut context = ConversationContext::default();

    for turn in history {
        match turn.role {
            Role::User => {
                if let Some(name) = extract_name(&turn.text) {
                    context.customer_name = Some(name);
                }
            }
            Role::Assistant => {
                for order_id in extract_order_ids(&turn.text) {
                    if !context.previous_order_ids.contains(&order_id) {
                        context.previous_order_ids.push(order_id);
                    }
                }
            }
        }
    }

    context
}

fn extract_name(text: &str) -> Option<String> {
    // ASCII lowering keeps byte offsets aligned with `text`.
    let start = text.to_ascii_lowercase().find(NAME_MARKER)? + NAME_MARKER.len();
    let rest = &text[start..];
    let end = rest.find('.').unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

pub(crate) fn extract_order_ids(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|token| token.trim_matches(|ch: char| !ch.is_ascii_alphanumeric() && ch != '-'))
        .filter(|token| Uuid::parse_str(token).is_ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{accumulate, ConversationContext, Turn};

    #[test]
    fn name_runs_up_to_the_period() {
        let context = accumulate(&[Turn::user("My name is Alex.")]);
        assert_eq!(context.customer_name.as_deref(), Some("Alex"));
    }

    #[test]
    fn later_name_wins_and_needs_no_period() {
        let context = accumulate(&[Turn::user("My name is Alex."), Turn::user("My name is Sam")]);
        assert_eq!(context.customer_name.as_deref(), Some("Sam"));
    }

    #[test]
    fn phrase_match_ignores_case_and_keeps_original_text() {
        let context = accumulate(&[Turn::user("hi, MY NAME IS Jo Ann Smith. Confirm my order.")]);
        assert_eq!(context.customer_name.as_deref(), Some("Jo Ann Smith"));
    }

    #[test]
    fn captured_text_is_not_validated() {
        let context = accumulate(&[Turn::user("my name is not important, just get 2 burgers")]);
        assert_eq!(context.customer_name.as_deref(), Some("not important, just get 2 burgers"));
    }

    #[test]
    fn assistant_turns_never_set_the_name() {
        let context = accumulate(&[
            Turn::user("My name is Alex."),
            Turn::assistant("Hello! My name is Ordermate."),
        ]);
        assert_eq!(context.customer_name.as_deref(), Some("Alex"));
    }

    #[test]
    fn previous_orders_come_from_assistant_turns_in_order() {
        let first = "0b6f5a0e-2f7d-4a59-8d7f-9b0f3d1c2e11";
        let second = "5c0a8f3e-8a1b-4c2d-9e3f-1a2b3c4d5e6f";
        let context = accumulate(&[
            Turn::user(format!("what about {first}?")),
            Turn::assistant(format!("Order {second} placed for Alex.")),
            Turn::assistant(format!("Order {first} is ready. Order {second} is pending.")),
        ]);

        assert_eq!(context.previous_order_ids, vec![second.to_string(), first.to_string()]);
        assert_eq!(context.last_order_id(), Some(first));
    }

    #[test]
    fn empty_history_yields_empty_context() {
        assert_eq!(accumulate(&[]), ConversationContext::default());
    }

    #[test]
    fn accumulation_is_idempotent() {
        let history = vec![
            Turn::user("My name is Alex."),
            Turn::assistant("Order 0b6f5a0e-2f7d-4a59-8d7f-9b0f3d1c2e11 placed for Alex."),
            Turn::user("My name is Sam"),
        ];
        assert_eq!(accumulate(&history), accumulate(&history));
    }
}
