//! Order route handlers.

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::{ApiJson, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrderPlacedResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// `POST /api/order/create` with body `{"address", "items": [{"product", "quantity"}]}`.
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<OrderPlacedResponse>)> {
    let placed = state.orders().place_order(&user, &body).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            success: true,
            message: "Order Placed",
            amount: placed.total.amount,
        }),
    ))
}
