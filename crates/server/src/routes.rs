use std::sync::Arc;

use axum::Router;

use ordermate_agent::llm::LlmClient;
use ordermate_agent::{AgentRuntime, OrderOrchestrator, RetryingLlmClient, SessionRegistry};
use ordermate_core::ordering::catalog::MenuCatalog;
use ordermate_db::OrderRepository;

use crate::{api, chatbot, health, legacy};

/// Shared handles every route works against.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<OrderOrchestrator>,
    pub runtime: Arc<AgentRuntime>,
    pub sessions: Arc<SessionRegistry>,
    pub repository: Arc<dyn OrderRepository>,
}

impl AppState {
    pub fn new(
        catalog: MenuCatalog,
        repository: Arc<dyn OrderRepository>,
        llm: RetryingLlmClient<Arc<dyn LlmClient>>,
    ) -> Self {
        let orchestrator = Arc::new(OrderOrchestrator::new(Arc::new(catalog), repository.clone()));
        let runtime = Arc::new(AgentRuntime::new(orchestrator.clone(), llm));
        Self { orchestrator, runtime, sessions: Arc::new(SessionRegistry::default()), repository }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(api::routes())
        .merge(legacy::routes())
        .merge(chatbot::routes())
        .merge(health::routes())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use ordermate_agent::llm::LlmClient;
    use ordermate_agent::planner::RulePlanner;
    use ordermate_agent::{RetryPolicy, RetryingLlmClient};
    use ordermate_core::ordering::catalog::MenuCatalog;
    use ordermate_db::InMemoryOrderRepository;

    use super::{router, AppState};

    pub fn state_with(llm: Arc<dyn LlmClient>) -> AppState {
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_secs(1),
            max_retries: 1,
            base_delay: Duration::from_millis(5),
        };
        AppState::new(
            MenuCatalog::seeded(),
            Arc::new(InMemoryOrderRepository::default()),
            RetryingLlmClient::new(llm, policy),
        )
    }

    pub fn app() -> Router {
        router(state_with(Arc::new(RulePlanner)))
    }

    pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };
        (status, value)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).expect("request")
    }

    pub fn json(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    pub fn empty(method: &str, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).expect("request")
    }
}
