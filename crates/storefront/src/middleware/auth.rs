//! Authentication extractors.
//!
//! Session tokens are read from the `Authorization: Bearer` header, falling
//! back to the identity provider's `__session` cookie.

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};

use msgrocery_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Name of the cookie the identity provider stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

/// Extractor that requires a verified identity.
///
/// Rejects with `401 {"success": false, "message": "Not authenticated"}`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {user}!")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub UserId);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).ok_or(AppError::Unauthenticated)?;
        let user = state.sessions().verify(token)?;

        set_sentry_user(&user);
        tracing::Span::current().record("user_id", tracing::field::display(&user));

        Ok(Self(user))
    }
}

/// Extract the raw session token from a request.
#[must_use]
pub fn session_token(parts: &Parts) -> Option<&str> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
            .map(|(_, value)| value)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: (&str, &str)) -> Parts {
        Request::builder()
            .header(header.0, header.1)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(session_token(&parts(("authorization", "Bearer abc.def"))), Some("abc.def"));
        assert_eq!(session_token(&parts(("authorization", "Basic abc"))), None);
    }

    #[test]
    fn test_session_cookie_fallback() {
        let parts = parts(("cookie", "theme=dark; __session=tok.en.sig; other=1"));
        assert_eq!(session_token(&parts), Some("tok.en.sig"));
    }
}
