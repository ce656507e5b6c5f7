//! Per-user address book.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use msgrocery_core::UserId;

use crate::db::{AddressRepository, RepositoryError};
use crate::models::{Address, AddressInput};

/// Errors from address operations.
#[derive(Debug, Error)]
pub enum AddressBookError {
    #[error("Address data missing")]
    Missing,

    #[error("All address fields are required")]
    Incomplete,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone)]
pub struct AddressBook {
    addresses: Arc<dyn AddressRepository>,
}

impl AddressBook {
    #[must_use]
    pub fn new(addresses: Arc<dyn AddressRepository>) -> Self {
        Self { addresses }
    }

    /// Validate and store a new address for a user.
    ///
    /// # Errors
    ///
    /// Returns `AddressBookError::Missing` if no address object was sent and
    /// `Incomplete` if any of the six fields is absent or blank.
    #[instrument(skip(self, payload), fields(user_id = %user))]
    pub async fn add(&self, user: &UserId, payload: Option<&Value>) -> Result<Address, AddressBookError> {
        let payload = payload
            .filter(|v| !v.is_null())
            .ok_or(AddressBookError::Missing)?;
        let input: AddressInput =
            serde_json::from_value(payload.clone()).map_err(|_| AddressBookError::Incomplete)?;
        let address = input.validate().ok_or(AddressBookError::Incomplete)?;

        let address = self.addresses.create(user, address).await?;
        tracing::info!(address_id = %address.id, "Address added");
        Ok(address)
    }

    /// All addresses of a user; empty if none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the read fails.
    pub async fn list(&self, user: &UserId) -> Result<Vec<Address>, RepositoryError> {
        self.addresses.list_for_user(user).await
    }
}
