//! The simple string-keyed surface, served from the canonical order record.
//!
//! `{order_id, customer_name, item}` maps onto an `Order` whose id is the
//! caller's `order_id` and whose single line is `item` (menu name or id,
//! any case) with quantity 1.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use ordermate_core::domain::menu::MenuItemId;
use ordermate_core::domain::order::{OrderId, OrderLine, OrderStatus};
use ordermate_core::errors::{ApplicationError, DomainError};

use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct SimpleOrderRequest {
    pub order_id: String,
    pub customer_name: String,
    pub item: String,
}

#[derive(Debug, Serialize)]
pub struct SimpleStatus {
    pub order_id: String,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct SimpleConfirmation {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/order-status/{id}", get(order_status))
        .route("/create-order/", post(create_order))
        .route("/cancel-order/{id}", post(cancel_order))
}

async fn order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SimpleStatus>, ApiError> {
    let status = state.orchestrator.get_status(&OrderId(id.clone())).await?;
    Ok(Json(SimpleStatus { order_id: id, status }))
}

async fn create_order(
    State(state): State<AppState>,
    request: Result<Json<SimpleOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SimpleConfirmation>), ApiError> {
    let Json(request) = request?;
    let item = state.orchestrator.catalog().find_by_name_or_id(&request.item).ok_or_else(|| {
        ApplicationError::from(DomainError::UnknownMenuItem {
            menu_item_id: MenuItemId(request.item.clone()),
        })
    })?;
    let line = OrderLine { menu_item_id: item.id.clone(), quantity: 1 };

    let order = state
        .orchestrator
        .place_order_with_id(OrderId(request.order_id), &[line], &request.customer_name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SimpleConfirmation {
            message: "Order created successfully".to_string(),
            order_id: Some(order.id.0),
        }),
    ))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SimpleConfirmation>, ApiError> {
    let order = state.orchestrator.cancel_order(&OrderId(id)).await?;
    Ok(Json(SimpleConfirmation {
        message: format!("Order {} cancelled successfully", order.id),
        order_id: None,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{app, empty, get, json, send};

    #[tokio::test]
    async fn simple_surface_round_trip() {
        let app = app();

        let (status, body) = send(
            &app,
            json(
                "POST",
                "/create-order/",
                json!({ "order_id": "A-100", "customer_name": "Alex", "item": "burger" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["order_id"], "A-100");

        let (status, body) = send(&app, get("/order-status/A-100")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "order_id": "A-100", "status": "pending" }));

        let (_, order) = send(&app, get("/orders/A-100")).await;
        assert_eq!(order["total"], "12.50");
        assert_eq!(order["items"], json!([{ "menu_item_id": "2", "quantity": 1 }]));

        let (status, body) = send(&app, empty("POST", "/cancel-order/A-100")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Order A-100 cancelled successfully");

        let (status, _) = send(&app, empty("POST", "/cancel-order/A-100")).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn duplicate_unknown_and_missing() {
        let app = app();
        let request = json!({ "order_id": "B-1", "customer_name": "Sam", "item": "3" });

        let (status, _) = send(&app, json("POST", "/create-order/", request.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, json("POST", "/create-order/", request)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            json(
                "POST",
                "/create-order/",
                json!({ "order_id": "B-2", "customer_name": "Sam", "item": "sushi" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get("/order-status/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, empty("POST", "/cancel-order/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_without_an_item_is_a_json_bad_request() {
        let app = app();

        let (status, body) = send(
            &app,
            json("POST", "/create-order/", json!({ "order_id": "A-7", "customer_name": "Alex" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert!(body["detail"].as_str().expect("detail").contains("item"));
    }
}
