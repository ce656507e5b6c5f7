//! Authentication service.
//!
//! Callers are identified by session tokens issued by the external identity
//! provider: a JWT whose `sub` claim is the user id. Tokens are verified
//! locally against the provider's RS256 public key or an HS256 shared secret.

mod error;
pub mod seller;

pub use error::AuthError;
pub use seller::{RoleAuthorizer, SellerAuthorizer};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::ExposeSecret;
use serde::Deserialize;

use msgrocery_core::UserId;

use crate::config::{AuthConfig, JwtKey};

/// Claims read from a session token.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Verifies session tokens.
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl SessionVerifier {
    /// Build a verifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if the PEM key cannot be parsed.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let (decoding_key, algorithm) = match &config.key {
            JwtKey::RsaPem(pem) => (
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| AuthError::InvalidKey(e.to_string()))?,
                Algorithm::RS256,
            ),
            JwtKey::Secret(secret) => (
                DecodingKey::from_secret(secret.expose_secret().as_bytes()),
                Algorithm::HS256,
            ),
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["sub", "exp"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verify a token and return the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Expired` for expired tokens and `InvalidToken` or
    /// `MissingSubject` for anything else that fails verification.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;

        UserId::new(data.claims.sub).ok_or(AuthError::MissingSubject)
    }
}
