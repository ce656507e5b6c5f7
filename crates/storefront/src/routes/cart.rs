//! Cart route handlers.

use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::{ApiJson, Result};
use crate::middleware::RequireAuth;
use crate::models::CartItems;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub success: bool,
    pub cart_items: CartItems,
}

#[derive(Debug, Serialize)]
pub struct CartUpdatedResponse {
    pub success: bool,
    pub message: &'static str,
}

/// `GET /api/cart/get`
#[instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    let cart_items = state.carts().get(&user).await?;
    Ok(Json(CartResponse {
        success: true,
        cart_items,
    }))
}

/// `POST /api/cart/update` with body `{"cartData": {...}}`.
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<CartUpdatedResponse>> {
    state.carts().replace(&user, body.get("cartData")).await?;
    Ok(Json(CartUpdatedResponse {
        success: true,
        message: "Cart Updated",
    }))
}
