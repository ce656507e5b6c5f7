//! Seed the database with a sample grocery catalog.
//!
//! Creates (or refreshes) a seller user and lists products under it. The
//! catalog comes from a JSON file when given, otherwise from a built-in set.
//!
//! # File format
//!
//! ```json
//! [
//!   {"name": "Apples", "description": "1kg", "category": "Fruits",
//!    "price": 180, "offerPrice": 160, "image": ["https://..."]}
//! ]
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use msgrocery_core::{Email, UserId, UserRole, is_storable_amount};
use msgrocery_storefront::db::{PgProductRepository, PgUserRepository, ProductRepository, UserRepository, create_pool};
use msgrocery_storefront::models::{NewProduct, UserProfile};

use super::{CommandError, database_url};

/// One catalog entry in a seed file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub offer_price: Option<Decimal>,
    #[serde(default)]
    pub image: Vec<String>,
}

fn builtin_catalog() -> Vec<SeedProduct> {
    let item = |name: &str, description: &str, category: &str, price: i64, offer: Option<i64>| {
        SeedProduct {
            name: name.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            price: Decimal::from(price),
            offer_price: offer.map(Decimal::from),
            image: Vec::new(),
        }
    };

    vec![
        item("Potato 500g", "Fresh farm potatoes", "Vegetables", 35, Some(30)),
        item("Tomato 1kg", "Ripe red tomatoes", "Vegetables", 40, None),
        item("Apple 1kg", "Crisp Shimla apples", "Fruits", 180, Some(160)),
        item("Banana 1 dozen", "Ripe yellow bananas", "Fruits", 60, None),
        item("Amul Milk 1L", "Toned milk", "Dairy", 66, None),
        item("Paneer 200g", "Fresh cottage cheese", "Dairy", 95, Some(90)),
        item("Basmati Rice 5kg", "Long grain aged rice", "Grains", 650, Some(599)),
        item("Whole Wheat Atta 5kg", "Stone ground flour", "Grains", 280, None),
        item("Orange Juice 1L", "No added sugar", "Drinks", 130, Some(115)),
        item("Brown Bread", "Whole wheat sandwich loaf", "Bakery", 50, None),
    ]
}

/// Check a catalog before touching the database.
///
/// # Errors
///
/// Returns `CommandError::SeedData` describing the first invalid entry.
pub fn validate(catalog: &[SeedProduct]) -> Result<(), CommandError> {
    for (index, product) in catalog.iter().enumerate() {
        let invalid = |msg: &str| CommandError::SeedData(format!("entry {index} ({}): {msg}", product.name));

        if product.name.trim().is_empty() || product.category.trim().is_empty() {
            return Err(invalid("name and category are required"));
        }
        if !is_storable_amount(product.price) {
            return Err(invalid("price must be non-negative with at most two decimals"));
        }
        if product
            .offer_price
            .is_some_and(|offer| !is_storable_amount(offer) || offer > product.price)
        {
            return Err(invalid("offerPrice must be between 0 and price"));
        }
    }
    Ok(())
}

/// Seed products under a seller account.
///
/// # Errors
///
/// Returns `CommandError` if the file is unreadable or invalid, or a database
/// write fails.
pub async fn catalog(file: Option<&Path>, seller_id: &str, seller_email: &str) -> Result<(), CommandError> {
    let catalog = match file {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading catalog from file");
            let content = tokio::fs::read_to_string(path).await?;
            serde_json::from_str::<Vec<SeedProduct>>(&content)
                .map_err(|e| CommandError::SeedData(e.to_string()))?
        }
        None => builtin_catalog(),
    };
    validate(&catalog)?;

    let seller = UserId::new(seller_id)
        .ok_or_else(|| CommandError::SeedData("seller id must not be blank".to_string()))?;
    let email = Email::parse(seller_email).map_err(|e| CommandError::SeedData(e.to_string()))?;

    let pool = create_pool(&database_url()?).await?;
    let users = PgUserRepository::new(pool.clone());
    let products = PgProductRepository::new(pool.clone());

    users
        .upsert(&UserProfile {
            id: seller.clone(),
            email,
            name: "Seed Seller".to_string(),
            image_url: String::new(),
            role: UserRole::Seller,
        })
        .await?;
    tracing::info!(seller = %seller, "Seller account ready");

    for product in catalog {
        let created = products
            .create(NewProduct {
                user_id: seller.clone(),
                name: product.name,
                description: product.description,
                category: product.category,
                price: product.price,
                offer_price: product.offer_price,
                image: product.image,
            })
            .await?;
        tracing::info!(product_id = %created.id, name = %created.name, "Product seeded");
    }

    pool.close().await;
    tracing::info!("Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        assert!(validate(&builtin_catalog()).is_ok());
    }

    #[test]
    fn test_offer_above_price_is_rejected() {
        let mut catalog = builtin_catalog();
        catalog[0].offer_price = Some(catalog[0].price + Decimal::ONE);
        assert!(matches!(validate(&catalog), Err(CommandError::SeedData(_))));
    }

    #[test]
    fn test_price_beyond_catalog_range_is_rejected() {
        let mut catalog = builtin_catalog();
        catalog[1].price = Decimal::from(10_000_000_000_i64);
        assert!(matches!(validate(&catalog), Err(CommandError::SeedData(_))));
    }

    #[test]
    fn test_parse_seed_file_entry() {
        let entries: Vec<SeedProduct> = serde_json::from_str(
            r#"[{"name": "Apples", "description": "1kg", "category": "Fruits", "price": 180, "offerPrice": 159.5}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].offer_price, Some(Decimal::new(1595, 1)));
        assert!(entries[0].image.is_empty());
    }
}
