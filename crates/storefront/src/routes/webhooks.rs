//! Identity provider webhook handler.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::events::identity::{IdentityEvent, WebhookError};
use crate::state::AppState;

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> std::result::Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}

/// `POST /api/webhooks/identity`
#[instrument(skip_all)]
pub async fn identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let msg_id = header(&headers, "svix-id")?;
    let timestamp = header(&headers, "svix-timestamp")?;
    let signature = header(&headers, "svix-signature")?;

    state
        .webhooks()
        .verify(msg_id, timestamp, signature, &body)?;

    let event = IdentityEvent::from_json(&body)?;
    state.identity().apply(event).await?;

    Ok(Json(json!({ "success": true })))
}
