//! Identity provider lifecycle webhooks.
//!
//! The auth provider delivers `user.created`, `user.updated` and
//! `user.deleted` events signed with the Svix scheme:
//!
//! - `svix-id`, `svix-timestamp` and `svix-signature` headers
//! - signature = base64(HMAC-SHA256(key, "{id}.{timestamp}.{body}"))
//! - the header holds space-separated `v1,<signature>` entries
//! - the signing secret is `whsec_<base64 key>`
//!
//! Verified events are mirrored onto local user records.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

use msgrocery_core::{Email, UserId, UserRole};

use crate::db::{RepositoryError, UserRepository};
use crate::models::UserProfile;

type HmacSha256 = Hmac<Sha256>;

/// Maximum clock skew accepted on `svix-timestamp`.
const TIMESTAMP_TOLERANCE_SECS: u64 = 300;

/// Errors from verifying or applying a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid webhook secret")]
    InvalidSecret,

    #[error("invalid timestamp")]
    InvalidTimestamp,

    #[error("timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("invalid payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WebhookError {
    /// Whether the request failed authentication rather than processing.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::MissingHeader(_)
                | Self::InvalidTimestamp
                | Self::TimestampOutOfTolerance
                | Self::SignatureMismatch
        )
    }
}

/// Verifies Svix webhook signatures.
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl WebhookVerifier {
    /// Build a verifier from a `whsec_...` signing secret.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidSecret` if the key is not valid base64.
    pub fn new(secret: &SecretString) -> Result<Self, WebhookError> {
        let raw = secret.expose_secret();
        let encoded = raw.strip_prefix("whsec_").unwrap_or(raw);
        let key = BASE64
            .decode(encoded.trim())
            .map_err(|_| WebhookError::InvalidSecret)?;
        Ok(Self { key })
    }

    /// Verify a delivery against the current time.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError` if the timestamp is malformed or stale, or no
    /// signature entry matches.
    pub fn verify(
        &self,
        msg_id: &str,
        timestamp: &str,
        signatures: &str,
        body: &[u8],
    ) -> Result<(), WebhookError> {
        self.verify_at(msg_id, timestamp, signatures, body, chrono::Utc::now().timestamp())
    }

    /// Verify a delivery against a given time (unix seconds).
    ///
    /// # Errors
    ///
    /// See [`WebhookVerifier::verify`].
    pub fn verify_at(
        &self,
        msg_id: &str,
        timestamp: &str,
        signatures: &str,
        body: &[u8],
        now: i64,
    ) -> Result<(), WebhookError> {
        let ts: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;
        if now.abs_diff(ts) > TIMESTAMP_TOLERANCE_SECS {
            return Err(WebhookError::TimestampOutOfTolerance);
        }

        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.trim().as_bytes());
        mac.update(b".");
        mac.update(body);

        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.strip_prefix("v1,"))
            .filter_map(|sig| BASE64.decode(sig).ok())
            // verify_slice compares in constant time
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if matched {
            tracing::debug!(msg_id, "Webhook signature verified");
            Ok(())
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }
}

/// A verified identity lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    Created(UserProfile),
    Updated(UserProfile),
    Deleted(UserId),
    /// Any other event type; acknowledged without action.
    Ignored(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct UserData {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    first_name: Option<String>,
    last_name: Option<String>,
    image_url: Option<String>,
    #[serde(default)]
    public_metadata: PublicMetadata,
}

#[derive(Deserialize)]
struct EmailAddress {
    email_address: String,
}

#[derive(Deserialize, Default)]
struct PublicMetadata {
    role: Option<String>,
}

#[derive(Deserialize)]
struct DeletedData {
    id: String,
}

impl IdentityEvent {
    /// Parse a webhook body.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Payload` if a known event type is malformed.
    pub fn from_json(body: &[u8]) -> Result<Self, WebhookError> {
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|e| WebhookError::Payload(e.to_string()))?;

        match envelope.kind.as_str() {
            "user.created" => Ok(Self::Created(profile(envelope.data)?)),
            "user.updated" => Ok(Self::Updated(profile(envelope.data)?)),
            "user.deleted" => {
                let data: DeletedData = serde_json::from_value(envelope.data)
                    .map_err(|e| WebhookError::Payload(e.to_string()))?;
                Ok(Self::Deleted(user_id(data.id)?))
            }
            _ => Ok(Self::Ignored(envelope.kind)),
        }
    }
}

fn user_id(id: String) -> Result<UserId, WebhookError> {
    UserId::new(id).ok_or_else(|| WebhookError::Payload("empty user id".to_string()))
}

fn profile(data: serde_json::Value) -> Result<UserProfile, WebhookError> {
    let data: UserData =
        serde_json::from_value(data).map_err(|e| WebhookError::Payload(e.to_string()))?;

    let email = data
        .email_addresses
        .first()
        .ok_or_else(|| WebhookError::Payload("user has no email address".to_string()))?;
    let email = Email::parse(&email.email_address)
        .map_err(|e| WebhookError::Payload(e.to_string()))?;

    let name = [data.first_name, data.last_name]
        .into_iter()
        .flatten()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let role = data
        .public_metadata
        .role
        .and_then(|r| r.parse::<UserRole>().ok())
        .unwrap_or_default();

    Ok(UserProfile {
        id: user_id(data.id)?,
        email,
        name,
        image_url: data.image_url.unwrap_or_default(),
        role,
    })
}

/// Applies identity events to local user records.
#[derive(Clone)]
pub struct IdentitySync {
    users: Arc<dyn UserRepository>,
}

impl IdentitySync {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Mirror one event onto the user table.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Repository` if the write fails.
    #[instrument(skip(self, event))]
    pub async fn apply(&self, event: IdentityEvent) -> Result<(), WebhookError> {
        match event {
            IdentityEvent::Created(profile) => {
                self.users.upsert(&profile).await?;
                tracing::info!(user_id = %profile.id, "User created");
            }
            IdentityEvent::Updated(profile) => {
                if self.users.update(&profile).await? {
                    tracing::info!(user_id = %profile.id, "User updated");
                } else {
                    tracing::warn!(user_id = %profile.id, "Update for unknown user ignored");
                }
            }
            IdentityEvent::Deleted(id) => {
                let existed = self.users.delete(&id).await?;
                tracing::info!(user_id = %id, existed, "User deleted");
            }
            IdentityEvent::Ignored(kind) => {
                tracing::debug!(kind, "Ignoring identity event");
            }
        }
        Ok(())
    }
}
