//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Every error body has the shape `{"success": false, "message": "..."}`.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::events::EventError;
use crate::events::identity::WebhookError;
use crate::services::auth::AuthError;
use crate::services::media::MediaError;
use crate::services::{AddressBookError, CartStoreError, OrderError, PricingError, ProductError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Event transport failed.
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// Image CDN operation failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Authentication machinery failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// No verified identity on the request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Identity lacks permission.
    #[error("Not authorized")]
    Unauthorized,

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Event(_) | Self::Media(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::InvalidKey(_) | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            // Unexpected failures surface their raw message
            Self::Database(err) => err.to_string(),
            Self::Event(err) => err.to_string(),
            Self::Media(err) => err.to_string(),
            Self::Internal(msg) => msg.clone(),
            Self::Auth(err) if self.status() == StatusCode::UNAUTHORIZED => {
                tracing::debug!(error = %err, "Rejected session token");
                "Not authenticated".to_string()
            }
            Self::Auth(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            success: false,
            message: self.message(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected JSON body");
        Self::BadRequest("Invalid request body".to_string())
    }
}

impl From<CartStoreError> for AppError {
    fn from(err: CartStoreError) -> Self {
        match err {
            CartStoreError::UserNotFound => Self::NotFound(err.to_string()),
            CartStoreError::Invalid(_) => Self::BadRequest(err.to_string()),
            CartStoreError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<AddressBookError> for AppError {
    fn from(err: AddressBookError) -> Self {
        match err {
            AddressBookError::Missing | AddressBookError::Incomplete => {
                Self::BadRequest(err.to_string())
            }
            AddressBookError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::Repository(e) => Self::Database(e),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidData => Self::BadRequest(err.to_string()),
            OrderError::Pricing(e) => e.into(),
            OrderError::Event(e) => Self::Event(e),
        }
    }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::Unauthorized => Self::Unauthorized,
            ProductError::MissingFields | ProductError::InvalidPrice | ProductError::NoFiles => {
                Self::BadRequest(err.to_string())
            }
            ProductError::Auth(e) => Self::Auth(e),
            ProductError::Media(e) => Self::Media(e),
            ProductError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        if err.is_unauthenticated() {
            tracing::warn!(error = %err, "Rejected identity webhook");
            return Self::Unauthenticated;
        }
        match err {
            WebhookError::Payload(_) => Self::BadRequest(err.to_string()),
            WebhookError::Repository(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// JSON body extractor whose rejections use the `AppError` body shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_of(AppError::BadRequest("Invalid data".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"success": false, "message": "Invalid data"}));
    }

    #[tokio::test]
    async fn test_auth_statuses() {
        let (status, body) = body_of(AppError::Unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authenticated");

        let (status, body) = body_of(AppError::Auth(AuthError::Expired)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authenticated");

        let (status, body) = body_of(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Not authorized");
    }

    #[tokio::test]
    async fn test_unexpected_errors_expose_raw_message() {
        let (status, body) = body_of(AppError::Event(EventError::Closed)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "event queue is closed");
    }

    #[test]
    fn test_service_error_mapping() {
        assert_eq!(
            AppError::from(OrderError::InvalidData).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(CartStoreError::UserNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(ProductError::Unauthorized).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(WebhookError::SignatureMismatch).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
