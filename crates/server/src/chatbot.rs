use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ordermate_agent::session::DEFAULT_SESSION;
use ordermate_agent::TurnOutcome;
use ordermate_core::errors::ApplicationError;

use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub query: Option<String>,
    pub session_id: Option<String>,
}

/// Always served with 200; failures travel as text plus `error`.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub const MISSING_QUERY_REPLY: &str = "Please send a message in the `query` parameter.";

pub fn routes() -> Router<AppState> {
    Router::new().route("/chatbot/", get(chatbot))
}

async fn chatbot(
    State(state): State<AppState>,
    query: Result<Query<ChatQuery>, QueryRejection>,
) -> Json<ChatResponse> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return Json(malformed(rejection.body_text())),
    };
    let Some(utterance) = query.query else {
        return Json(malformed("missing field `query`".to_string()));
    };

    let session_id = query.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
    let (outcome, response) = state.sessions.exchange(session_id, &state.runtime, &utterance).await;

    let error = match &outcome {
        TurnOutcome::Failed(
            error @ (ApplicationError::UpstreamTimeout { .. } | ApplicationError::UpstreamFailure(_)),
        ) => Some(error.to_string()),
        _ => None,
    };
    info!(
        event_name = "http.chatbot.turn",
        session_id,
        upstream_error = error.is_some(),
        "chatbot turn handled"
    );

    Json(ChatResponse { response, error })
}

fn malformed(detail: String) -> ChatResponse {
    warn!(event_name = "http.chatbot.malformed", detail = %detail, "chatbot request rejected");
    ChatResponse { response: MISSING_QUERY_REPLY.to_string(), error: Some(detail) }
}
