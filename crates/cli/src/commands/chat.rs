//! Interactive chat driver: reads utterances line by line, prints replies.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use ordermate_agent::{build_llm_client, AgentRuntime, ChatSession, OrderOrchestrator};
use ordermate_core::config::{AppConfig, LoadOptions};
use ordermate_core::ordering::catalog::MenuCatalog;
use ordermate_db::open_order_repository;
use tracing::debug;

use crate::commands::{async_runtime, CommandResult};

const PROMPT: &str = "you> ";
const EXIT_WORDS: &[&str] = &["exit", "quit"];

pub fn run() -> CommandResult {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_with_io(LoadOptions::default(), stdin.lock(), stdout.lock())
}

pub fn run_with_io<R: BufRead, W: Write>(
    options: LoadOptions,
    input: R,
    mut output: W,
) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match async_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let llm = match build_llm_client(&config.llm) {
        Ok(llm) => llm,
        Err(error) => return CommandResult::failure("chat", "llm_client", error.to_string(), 3),
    };

    runtime.block_on(async move {
        let repository = match open_order_repository(&config).await {
            Ok(repository) => repository,
            Err(error) => {
                return CommandResult::failure("chat", "order_store", error.to_string(), 4);
            }
        };
        let orchestrator =
            Arc::new(OrderOrchestrator::new(Arc::new(MenuCatalog::seeded()), repository));
        let agent = AgentRuntime::new(orchestrator, llm);

        match converse(&agent, input, &mut output).await {
            Ok(turns) => CommandResult::success("chat", format!("{turns} turn(s) handled")),
            Err(error) => CommandResult::failure("chat", "io", error.to_string(), 5),
        }
    })
}

async fn converse<R: BufRead, W: Write>(
    agent: &AgentRuntime,
    input: R,
    output: &mut W,
) -> io::Result<usize> {
    let mut session = ChatSession::default();
    let mut lines = input.lines();

    writeln!(output, "Welcome! Ask for the menu, place an order, or type `exit` to leave.")?;
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let Some(line) = lines.next().transpose()? else {
            writeln!(output)?;
            break;
        };
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if EXIT_WORDS.iter().any(|word| utterance.eq_ignore_ascii_case(word)) {
            break;
        }

        let (outcome, reply) = session.exchange(agent, utterance).await;
        debug!(event_name = "cli.chat.turn", outcome = ?outcome, "chat turn handled");
        writeln!(output, "assistant> {reply}")?;
    }

    Ok(session.history().len() / 2)
}
