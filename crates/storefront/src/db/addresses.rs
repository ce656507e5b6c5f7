//! Address repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;

use msgrocery_core::{AddressId, UserId};

use super::{AddressRepository, RepositoryError};
use crate::models::{Address, NewAddress};

/// `PostgreSQL` implementation of [`AddressRepository`].
#[derive(Debug, Clone)]
pub struct PgAddressRepository {
    pool: PgPool,
}

impl PgAddressRepository {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    user_id: UserId,
    full_name: String,
    phone_number: String,
    pincode: String,
    area: String,
    city: String,
    state: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            full_name: row.full_name,
            phone_number: row.phone_number,
            pincode: row.pincode,
            area: row.area,
            city: row.city,
            state: row.state,
        }
    }
}

#[async_trait]
impl AddressRepository for PgAddressRepository {
    async fn create(
        &self,
        user_id: &UserId,
        address: NewAddress,
    ) -> Result<Address, RepositoryError> {
        let row: AddressRow = sqlx::query_as(
            r"
            INSERT INTO storefront.address
                (id, user_id, full_name, phone_number, pincode, area, city, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, full_name, phone_number, pincode, area, city, state
            ",
        )
        .bind(AddressId::new_v4())
        .bind(user_id)
        .bind(&address.full_name)
        .bind(&address.phone_number)
        .bind(&address.pincode)
        .bind(&address.area)
        .bind(&address.city)
        .bind(&address.state)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows: Vec<AddressRow> = sqlx::query_as(
            r"
            SELECT id, user_id, full_name, phone_number, pincode, area, city, state
            FROM storefront.address
            WHERE user_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }
}
