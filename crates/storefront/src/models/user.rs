//! User domain types.
//!
//! Users are mirrored from the identity provider; the storefront only owns
//! their cart.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use msgrocery_core::{Email, UserId, UserRole};

/// A storefront user (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Identity provider user id.
    pub id: UserId,
    /// Primary email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub image_url: String,
    /// Role mirrored from provider metadata.
    pub role: UserRole,
    /// Current cart contents.
    pub cart_items: CartItems,
}

/// Profile fields mirrored from identity lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub image_url: String,
    pub role: UserRole,
}

/// Rejection reasons for a cart payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Payload is not a JSON object.
    #[error("cart must be an object")]
    NotAnObject,
    /// A product key is blank.
    #[error("cart contains an empty product id")]
    EmptyProductId,
    /// A quantity is not a positive integer.
    #[error("invalid quantity for product {0}")]
    InvalidQuantity(String),
}

/// A user's cart: product id to quantity.
///
/// Carts are always replaced as a whole, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItems(BTreeMap<String, u32>);

impl CartItems {
    /// Validate a client-supplied cart payload.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the payload is not an object, has blank keys,
    /// or has a quantity that is not a positive integer.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, CartError> {
        let object = value.as_object().ok_or(CartError::NotAnObject)?;

        let mut items = BTreeMap::new();
        for (product, quantity) in object {
            if product.trim().is_empty() {
                return Err(CartError::EmptyProductId);
            }
            let quantity = quantity
                .as_u64()
                .filter(|q| *q > 0)
                .and_then(|q| u32::try_from(q).ok())
                .ok_or_else(|| CartError::InvalidQuantity(product.clone()))?;
            items.insert(product.clone(), quantity);
        }

        Ok(Self(items))
    }

    /// Quantity of a product, if present.
    #[must_use]
    pub fn quantity(&self, product: &str) -> Option<u32> {
        self.0.get(product).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, u32)> for CartItems {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cart_from_json_accepts_positive_quantities() {
        let cart = CartItems::from_json(&json!({"p1": 2, "p2": 1})).unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.quantity("p1"), Some(2));
    }

    #[test]
    fn test_cart_from_json_accepts_empty_object() {
        assert!(CartItems::from_json(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_cart_from_json_rejects_non_objects() {
        assert_eq!(CartItems::from_json(&json!([1, 2])), Err(CartError::NotAnObject));
        assert_eq!(CartItems::from_json(&json!("cart")), Err(CartError::NotAnObject));
        assert_eq!(CartItems::from_json(&json!(null)), Err(CartError::NotAnObject));
    }

    #[test]
    fn test_cart_from_json_rejects_bad_quantities() {
        for bad in [json!({"p1": 0}), json!({"p1": -1}), json!({"p1": 1.5}), json!({"p1": "2"})] {
            assert!(matches!(
                CartItems::from_json(&bad),
                Err(CartError::InvalidQuantity(_))
            ));
        }
    }

    #[test]
    fn test_cart_serializes_as_plain_map() {
        let cart: CartItems = [("p1".to_string(), 3)].into_iter().collect();
        assert_eq!(serde_json::to_value(&cart).unwrap(), json!({"p1": 3}));
    }
}
