//! User repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use msgrocery_core::{UserId, UserRole};

use super::{RepositoryError, UserRepository};
use crate::models::{CartItems, UserProfile};

/// `PostgreSQL` implementation of [`UserRepository`].
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_cart(&self, id: &UserId) -> Result<Option<CartItems>, RepositoryError> {
        let row: Option<(Json<CartItems>,)> =
            sqlx::query_as(r#"SELECT cart_items FROM storefront."user" WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(cart),)| cart))
    }

    async fn set_cart(&self, id: &UserId, cart: &CartItems) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE storefront."user"
            SET cart_items = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(cart))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_role(&self, id: &UserId) -> Result<Option<UserRole>, RepositoryError> {
        let row: Option<(String,)> =
            sqlx::query_as(r#"SELECT role FROM storefront."user" WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(role,)| {
            role.parse::<UserRole>()
                .map_err(RepositoryError::DataCorruption)
        })
        .transpose()
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO storefront."user" (id, email, name, image_url, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                name = EXCLUDED.name,
                image_url = EXCLUDED.image_url,
                role = EXCLUDED.role,
                updated_at = NOW()
            "#,
        )
        .bind(&profile.id)
        .bind(profile.email.as_str())
        .bind(&profile.name)
        .bind(&profile.image_url)
        .bind(profile.role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, profile: &UserProfile) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE storefront."user"
            SET email = $2, name = $3, image_url = $4, role = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(&profile.id)
        .bind(profile.email.as_str())
        .bind(&profile.name)
        .bind(&profile.image_url)
        .bind(profile.role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(r#"DELETE FROM storefront."user" WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
