//! Product repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use msgrocery_core::{ProductId, ProductPrice, UserId};

use super::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product};

/// `PostgreSQL` implementation of [`ProductRepository`].
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    user_id: UserId,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    offer_price: Option<Decimal>,
    image: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            category: row.category,
            price: row.price,
            offer_price: row.offer_price,
            image: row.image,
            date: row.created_at.timestamp_millis(),
        }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn find_price(&self, id: ProductId) -> Result<Option<ProductPrice>, RepositoryError> {
        let row: Option<(Decimal, Option<Decimal>)> =
            sqlx::query_as("SELECT price, offer_price FROM storefront.product WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(price, offer_price)| ProductPrice::new(price, offer_price)))
    }

    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(
            r"
            INSERT INTO storefront.product
                (id, user_id, name, description, category, price, offer_price, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, name, description, category, price, offer_price,
                      image, created_at
            ",
        )
        .bind(ProductId::new_v4())
        .bind(&product.user_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.offer_price)
        .bind(&product.image)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}
