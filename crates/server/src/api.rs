//! Menu and order resource routes.
//!
//! - `GET    /`                      welcome message
//! - `GET    /menu`                  full menu
//! - `GET    /menu/{id}`             one menu item
//! - `POST   /orders`                place an order
//! - `GET    /orders`                all orders
//! - `GET    /orders/{id}`           one order
//! - `PUT    /orders/{id}`           replace lines and customer name
//! - `DELETE /orders/{id}`           remove an order
//! - `PATCH  /orders/{id}/status`    set status from `?status=`

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use ordermate_agent::tools::LineRequest;
use ordermate_core::domain::menu::{MenuItem, MenuItemId};
use ordermate_core::domain::order::{Order, OrderId, OrderLine};

use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<LineRequest>,
    pub customer_name: String,
}

impl OrderRequest {
    fn lines(&self) -> Vec<OrderLine> {
        self.items.iter().map(OrderLine::from).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/menu", get(list_menu))
        .route("/menu/{id}", get(get_menu_item))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order).put(update_order).delete(delete_order))
        .route("/orders/{id}/status", patch(update_status))
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse { message: "Welcome to the Restaurant API".to_string() })
}

async fn list_menu(State(state): State<AppState>) -> Json<Vec<MenuItem>> {
    Json(state.orchestrator.catalog().items().to_vec())
}

async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MenuItem>, ApiError> {
    state
        .orchestrator
        .catalog()
        .find(&MenuItemId(id))
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Menu item not found"))
}

async fn create_order(
    State(state): State<AppState>,
    request: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(request) = request?;
    let order = state.orchestrator.place_order(&request.lines(), &request.customer_name).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orchestrator.list_orders().await?))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orchestrator.get_order(&OrderId(id)).await?))
}

async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(request) = request?;
    let order = state
        .orchestrator
        .update_order(&OrderId(id), &request.lines(), &request.customer_name)
        .await?;
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.orchestrator.delete_order(&OrderId(id)).await?;
    Ok(Json(MessageResponse { message: "Order deleted successfully".to_string() }))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Query(query) = query?;
    let order = state.orchestrator.set_status(&OrderId(id), &query.status).await?;
    info!(
        event_name = "http.order.status_updated",
        order_id = %order.id,
        status = order.status.as_str(),
        "order status updated over http"
    );
    Ok(Json(MessageResponse { message: format!("Order status updated to {}", order.status) }))
}
