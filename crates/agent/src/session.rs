//! Chat loop state: the verbatim turn history the accumulator replays.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::conversation::Turn;
use crate::runtime::{render, AgentRuntime, TurnOutcome};

pub const DEFAULT_SESSION: &str = "default";

#[derive(Clone, Debug, Default)]
pub struct ChatSession {
    history: Vec<Turn>,
}

impl ChatSession {
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Runs one turn and appends the utterance and the rendered reply to the
    /// history exactly as they were sent and shown.
    pub async fn exchange(
        &mut self,
        runtime: &AgentRuntime,
        utterance: &str,
    ) -> (TurnOutcome, String) {
        let outcome = runtime.handle_turn(utterance, &self.history).await;
        let reply = render(&outcome);
        self.history.push(Turn::user(utterance));
        self.history.push(Turn::assistant(reply.clone()));
        (outcome, reply)
    }
}

/// Sessions kept before the least recently used one is dropped.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

struct SessionSlot {
    session: Arc<Mutex<ChatSession>>,
    last_used: u64,
}

#[derive(Default)]
struct Sessions {
    slots: HashMap<String, SessionSlot>,
    clock: u64,
}

/// Sessions keyed by caller-supplied id. Turns within one session run one at
/// a time; different sessions proceed independently.
///
/// At most `capacity` sessions are kept; opening one more evicts the least
/// recently used session and its history.
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
    capacity: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { sessions: Mutex::default(), capacity: capacity.max(1) }
    }

    pub async fn exchange(
        &self,
        session_id: &str,
        runtime: &AgentRuntime,
        utterance: &str,
    ) -> (TurnOutcome, String) {
        let session = self.checkout(session_id).await;
        let mut session = session.lock().await;
        session.exchange(runtime, utterance).await
    }

    async fn checkout(&self, session_id: &str) -> Arc<Mutex<ChatSession>> {
        let mut sessions = self.sessions.lock().await;
        sessions.clock += 1;
        let now = sessions.clock;

        if let Some(slot) = sessions.slots.get_mut(session_id) {
            slot.last_used = now;
            return slot.session.clone();
        }

        if sessions.slots.len() >= self.capacity {
            let oldest = sessions
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                sessions.slots.remove(&oldest);
                debug!(event_name = "chat.session.evicted", session_id = %oldest, "session evicted");
            }
        }

        let session = Arc::new(Mutex::new(ChatSession::default()));
        sessions
            .slots
            .insert(session_id.to_string(), SessionSlot { session: session.clone(), last_used: now });
        session
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.slots.len()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().await.slots.contains_key(session_id)
    }
}
