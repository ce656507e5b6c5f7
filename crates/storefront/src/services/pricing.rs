//! Order pricing.
//!
//! Turns client-supplied line items into validated [`OrderLineItem`]s and a
//! total. Every product is looked up at its current price; one unresolved
//! product fails the whole computation.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use msgrocery_core::{OrderTotal, ProductId};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::OrderLineItem;

/// Handling of line items with a missing product or a non-positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineItemPolicy {
    /// Drop the item and price the rest.
    #[default]
    Skip,
    /// Fail the order, naming the item's index.
    Reject,
}

impl FromStr for LineItemPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "reject" => Ok(Self::Reject),
            other => Err(format!("expected `skip` or `reject`, got `{other}`")),
        }
    }
}

/// Errors from pricing an order.
#[derive(Debug, Error)]
pub enum PricingError {
    /// A product id does not resolve to a catalog product.
    #[error("Product not found for id: {0}")]
    ProductNotFound(String),

    /// A line item is malformed and the policy is [`LineItemPolicy::Reject`].
    #[error("Invalid line item at index {0}")]
    InvalidLineItem(usize),

    /// No usable line items remain.
    #[error("Invalid data")]
    NoLineItems,

    /// The order total does not fit a stored amount.
    #[error("Order amount exceeds the maximum allowed")]
    AmountOutOfRange,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validated line items with their total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub items: Vec<OrderLineItem>,
    pub total: OrderTotal,
}

/// Computes order totals from current catalog prices.
#[derive(Clone)]
pub struct PricingEngine {
    products: Arc<dyn ProductRepository>,
    policy: LineItemPolicy,
}

impl PricingEngine {
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>, policy: LineItemPolicy) -> Self {
        Self { products, policy }
    }

    /// Price a list of raw `{product, quantity}` line items.
    ///
    /// Lookups run one at a time in item order.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::ProductNotFound` for the first product id that
    /// is malformed or absent from the catalog, `InvalidLineItem` when the
    /// policy rejects a malformed item, `NoLineItems` when nothing is left to
    /// price, and `AmountOutOfRange` when the total cannot be stored.
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn compute_total(&self, items: &[Value]) -> Result<PricedOrder, PricingError> {
        let mut priced = Vec::with_capacity(items.len());
        let mut subtotal = Decimal::ZERO;

        for (index, item) in items.iter().enumerate() {
            let Some((raw_id, quantity)) = parse_line_item(item) else {
                match self.policy {
                    LineItemPolicy::Skip => {
                        tracing::debug!(index, "skipping malformed line item");
                        continue;
                    }
                    LineItemPolicy::Reject => return Err(PricingError::InvalidLineItem(index)),
                }
            };

            let product = ProductId::parse(raw_id)
                .map_err(|_| PricingError::ProductNotFound(raw_id.to_string()))?;
            let price = self
                .products
                .find_price(product)
                .await?
                .ok_or_else(|| PricingError::ProductNotFound(raw_id.to_string()))?;

            subtotal = price
                .unit_price()
                .checked_mul(Decimal::from(quantity))
                .and_then(|line| subtotal.checked_add(line))
                .ok_or(PricingError::AmountOutOfRange)?;
            priced.push(OrderLineItem { product, quantity });
        }

        if priced.is_empty() {
            return Err(PricingError::NoLineItems);
        }

        let total = OrderTotal::checked_from_subtotal(subtotal).ok_or_else(|| {
            tracing::warn!(%subtotal, "order total out of range");
            PricingError::AmountOutOfRange
        })?;

        Ok(PricedOrder {
            items: priced,
            total,
        })
    }
}

/// Extract a non-blank product id and a positive quantity.
///
/// Quantities may arrive as numbers or numeric strings.
fn parse_line_item(item: &Value) -> Option<(&str, u32)> {
    let product = item.get("product")?.as_str().filter(|p| !p.trim().is_empty())?;
    let quantity = match item.get("quantity")? {
        Value::Number(n) => n.as_u64().and_then(|q| u32::try_from(q).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
    .filter(|q| *q > 0)?;
    Some((product, quantity))
}
