//! Orders service routes.
//!
//! - `POST /api/orders`: verify stock, create, `201` with `Location`
//! - `GET /api/orders/:id`: read back, `404` when absent

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use stockflow_core::{Order, OrderId, OrderOrchestrator, OrderRequest};
use tower_http::trace::TraceLayer;

use crate::deadline::deadline_from_headers;
use crate::problem::ApiError;

#[derive(Clone)]
pub struct OrdersState {
    orchestrator: Arc<OrderOrchestrator>,
}

impl OrdersState {
    pub fn new(orchestrator: Arc<OrderOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

pub fn router(state: OrdersState) -> Router {
    Router::new()
        .route("/api/orders", post(create_order))
        .route("/api/orders/:id", get(get_order))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_order(
    State(state): State<OrdersState>,
    headers: HeaderMap,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let deadline = deadline_from_headers(&headers);
    let receipt = state.orchestrator.place_order(&request, deadline).await?;
    Ok((StatusCode::CREATED, [(header::LOCATION, receipt.location)]))
}

async fn get_order(
    State(state): State<OrdersState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orchestrator.get_order(id).await?))
}
