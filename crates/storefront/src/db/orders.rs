//! Order repository for database operations.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use msgrocery_core::{OrderId, OrderStatus};

use super::{OrderRepository, RepositoryError};
use crate::models::NewOrder;

/// `PostgreSQL` implementation of [`OrderRepository`].
#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert_many(&self, orders: &[NewOrder]) -> Result<u64, RepositoryError> {
        if orders.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            r#"INSERT INTO storefront."order" (id, event_id, user_id, items, amount, address, status, date) "#,
        );
        builder.push_values(orders, |mut row, order| {
            row.push_bind(OrderId::new_v4())
                .push_bind(order.event_id)
                .push_bind(order.user_id.clone())
                .push_bind(Json(order.items.clone()))
                .push_bind(order.amount)
                .push_bind(order.address)
                .push_bind(OrderStatus::OrderPlaced.as_str())
                .push_bind(order.date);
        });
        builder.push(" ON CONFLICT (event_id) DO NOTHING");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
