//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use msgrocery_core::{ProductId, ProductPrice, UserId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Seller who listed the product.
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub offer_price: Option<Decimal>,
    /// CDN URLs of the product images.
    pub image: Vec<String>,
    /// Creation time, epoch milliseconds.
    pub date: i64,
}

impl Product {
    /// The price fields used by order pricing.
    #[must_use]
    pub const fn price(&self) -> ProductPrice {
        ProductPrice::new(self.price, self.offer_price)
    }
}

/// A validated product listing with uploaded images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub offer_price: Option<Decimal>,
    pub image: Vec<String>,
}

impl NewProduct {
    /// Attach identity and timestamp, producing a stored record.
    #[must_use]
    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            category: self.category,
            price: self.price,
            offer_price: self.offer_price,
            image: self.image,
            date: created_at.timestamp_millis(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_wire_format() {
        let product = NewProduct {
            user_id: UserId::new("user_seller").unwrap(),
            name: "Apples".to_string(),
            description: "Crisp red apples".to_string(),
            category: "Fruits".to_string(),
            price: Decimal::from(120),
            offer_price: Some(Decimal::new(9950, 2)),
            image: vec!["https://cdn.example/apples.png".to_string()],
        }
        .into_product(ProductId::new_v4(), Utc::now());

        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["userId"], "user_seller");
        assert_eq!(json["price"], 120.0);
        assert_eq!(json["offerPrice"], 99.5);
        assert_eq!(product.price().unit_price(), Decimal::new(9950, 2));
    }
}
