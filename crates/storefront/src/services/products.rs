//! Seller product intake.

use std::str::FromStr;
use std::sync::Arc;

use futures::future::try_join_all;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use msgrocery_core::{UserId, is_storable_amount};

use super::auth::{AuthError, SellerAuthorizer};
use super::media::{ImageUpload, MediaError, MediaStore};
use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product};

/// Errors from adding a product.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Not authorized")]
    Unauthorized,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid price")]
    InvalidPrice,

    #[error("No files uploaded")]
    NoFiles,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Product listing form as submitted by a seller.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub offer_price: Option<String>,
    pub images: Vec<ImageUpload>,
}

#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    media: Arc<dyn MediaStore>,
    sellers: Arc<dyn SellerAuthorizer>,
}

impl ProductService {
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        media: Arc<dyn MediaStore>,
        sellers: Arc<dyn SellerAuthorizer>,
    ) -> Self {
        Self {
            products,
            media,
            sellers,
        }
    }

    /// Check that a user may list products.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Unauthorized` for non-sellers.
    pub async fn authorize(&self, user: &UserId) -> Result<(), ProductError> {
        if self.sellers.is_authorized(user).await? {
            Ok(())
        } else {
            Err(ProductError::Unauthorized)
        }
    }

    /// Validate a listing, upload its images and store it.
    ///
    /// The user must already have passed [`ProductService::authorize`].
    /// Images are uploaded concurrently; any failed upload fails the listing.
    ///
    /// # Errors
    ///
    /// Returns `ProductError` for invalid fields or failed uploads.
    #[instrument(skip(self, form), fields(user_id = %user, images = form.images.len()))]
    pub async fn add(&self, user: &UserId, form: ProductForm) -> Result<Product, ProductError> {
        let name = required(form.name)?;
        let description = required(form.description)?;
        let category = required(form.category)?;
        let price = required(form.price)?;
        let offer_price = required(form.offer_price)?;
        let price = parse_price(&price)?;
        let offer_price = parse_price(&offer_price)?;
        if offer_price > price {
            return Err(ProductError::InvalidPrice);
        }
        if form.images.is_empty() {
            return Err(ProductError::NoFiles);
        }

        let image = try_join_all(form.images.into_iter().map(|img| self.media.upload(img))).await?;

        let product = self
            .products
            .create(NewProduct {
                user_id: user.clone(),
                name,
                description,
                category,
                price,
                offer_price: Some(offer_price),
                image,
            })
            .await?;

        tracing::info!(product_id = %product.id, "Product added");
        Ok(product)
    }
}

fn required(field: Option<String>) -> Result<String, ProductError> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ProductError::MissingFields)
}

/// Parse a price that the catalog can store exactly.
fn parse_price(raw: &str) -> Result<Decimal, ProductError> {
    Decimal::from_str(raw)
        .ok()
        .filter(|p| is_storable_amount(*p))
        .ok_or(ProductError::InvalidPrice)
}
