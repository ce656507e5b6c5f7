//! Cart reads and replacement.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use msgrocery_core::UserId;

use crate::db::{RepositoryError, UserRepository};
use crate::models::{CartError, CartItems};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error("User not found")]
    UserNotFound,

    #[error("Invalid cart data")]
    Invalid(#[source] CartError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Per-user carts, always replaced as a whole.
#[derive(Clone)]
pub struct CartStore {
    users: Arc<dyn UserRepository>,
}

impl CartStore {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Current cart of a user.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError::UserNotFound` if the user does not exist.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn get(&self, user: &UserId) -> Result<CartItems, CartStoreError> {
        self.users
            .get_cart(user)
            .await?
            .ok_or(CartStoreError::UserNotFound)
    }

    /// Replace a user's cart with a client payload.
    ///
    /// # Errors
    ///
    /// Returns `CartStoreError::Invalid` if the payload is missing or is not a
    /// map of positive quantities, and `UserNotFound` if the user does not
    /// exist.
    #[instrument(skip(self, payload), fields(user_id = %user))]
    pub async fn replace(&self, user: &UserId, payload: Option<&Value>) -> Result<(), CartStoreError> {
        let cart = CartItems::from_json(payload.unwrap_or(&Value::Null))
            .map_err(CartStoreError::Invalid)?;

        if self.users.set_cart(user, &cart).await? {
            tracing::debug!(items = cart.len(), "Cart replaced");
            Ok(())
        } else {
            Err(CartStoreError::UserNotFound)
        }
    }

    /// Empty a user's cart.
    ///
    /// Returns `false` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    pub async fn clear(&self, user: &UserId) -> Result<bool, RepositoryError> {
        self.users.set_cart(user, &CartItems::default()).await
    }
}
