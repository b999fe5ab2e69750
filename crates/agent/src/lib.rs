//! Agent Runtime - conversational order taking
//!
//! This crate turns chat turns into order operations:
//! - Resolves quantity/item pairs from an utterance (`intent`)
//! - Rebuilds the customer's name and earlier order ids from history (`conversation`)
//! - Validates and applies order mutations under per-order locks (`orchestrator`)
//! - Asks a language model, or the local rule planner, which tool to run (`llm`, `planner`)
//!
//! # Turn flow
//!
//! 1. **Context** - fold the history plus the new utterance into a `ConversationContext`
//! 2. **Completion** - one bounded, retried model call returns text or an `OrderCommand`
//! 3. **Execution** - the orchestrator applies the command against the menu and store
//! 4. **Rendering** - the outcome becomes the reply appended to history verbatim
//!
//! # Safety Principle
//!
//! The model only picks a command. Prices, totals, ids and validation are
//! always computed by the orchestrator from the menu catalog.

pub mod conversation;
pub mod intent;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod planner;
pub mod runtime;
pub mod session;
pub mod tools;

use std::sync::Arc;

use ordermate_core::config::{LlmConfig, LlmProvider};
use ordermate_core::errors::ApplicationError;

pub use conversation::{accumulate, ConversationContext, Role, Turn};
pub use intent::resolve;
pub use llm::{Completion, CompletionRequest, LlmClient, LlmError, RetryPolicy, RetryingLlmClient};
pub use orchestrator::OrderOrchestrator;
pub use runtime::{render, AgentRuntime, TurnOutcome};
pub use session::{ChatSession, SessionRegistry};
pub use tools::OrderCommand;

/// Builds the configured completion backend wrapped in its retry policy.
pub fn build_llm_client(
    config: &LlmConfig,
) -> Result<RetryingLlmClient<Arc<dyn LlmClient>>, ApplicationError> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Local => Arc::new(planner::RulePlanner),
        LlmProvider::AzureOpenAi | LlmProvider::OpenAi | LlmProvider::Ollama => Arc::new(
            openai::HttpChatClient::from_config(config)
                .map_err(|error| ApplicationError::Configuration(error.to_string()))?,
        ),
    };
    Ok(RetryingLlmClient::new(client, RetryPolicy::from_config(config)))
}
