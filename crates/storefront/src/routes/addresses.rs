//! Address route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::{ApiJson, Result};
use crate::middleware::RequireAuth;
use crate::models::Address;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AddressAddedResponse {
    pub success: bool,
    pub message: &'static str,
    pub address: Address,
}

#[derive(Debug, Serialize)]
pub struct AddressListResponse {
    pub success: bool,
    pub addresses: Vec<Address>,
}

/// `POST /api/user/add-address` with body `{"address": {...}}`.
#[instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<AddressAddedResponse>)> {
    let address = state.addresses().add(&user, body.get("address")).await?;

    Ok((
        StatusCode::CREATED,
        Json(AddressAddedResponse {
            success: true,
            message: "Address added successfully",
            address,
        }),
    ))
}

/// `GET /api/user/get-address`
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AddressListResponse>> {
    let addresses = state.addresses().list(&user).await?;
    Ok(Json(AddressListResponse {
        success: true,
        addresses,
    }))
}
