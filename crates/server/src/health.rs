use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store = match state.repository.ping().await {
        Ok(()) => HealthCheck { status: "ready", detail: "order store reachable".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("order store unreachable: {error}") }
        }
    };
    let ready = store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("{} menu items loaded", state.orchestrator.catalog().len()),
        },
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};

    use ordermate_agent::planner::RulePlanner;
    use ordermate_db::{connect_with_settings, migrations, SqlOrderRepository};

    use crate::health::health;
    use crate::routes::test_support::state_with;

    #[tokio::test]
    async fn health_is_ready_for_memory_store() {
        let (status, Json(payload)) = health(State(state_with(Arc::new(RulePlanner)))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.service.detail, "5 menu items loaded");
    }

    #[tokio::test]
    async fn health_degrades_when_sqlite_pool_is_closed() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");
        let mut state = state_with(Arc::new(RulePlanner));
        state.repository = Arc::new(SqlOrderRepository::new(pool.clone()));
        pool.close().await;

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.store.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
