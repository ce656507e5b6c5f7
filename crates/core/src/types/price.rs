//! Price arithmetic using decimal amounts.
//!
//! The storefront runs a single currency, so amounts are bare [`Decimal`]s in
//! the store's currency unit. Order totals are the subtotal plus a fixed
//! surcharge of [`TAX_RATE`], truncated to a whole currency unit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tax surcharge applied to every order subtotal (2%).
pub const TAX_RATE: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

/// Exclusive upper bound of a stored amount (10^10, the `NUMERIC(12,2)` range).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Decimal places kept by a stored amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Whether an amount can be stored exactly: non-negative, at most
/// [`AMOUNT_SCALE`] decimal places and below [`MAX_AMOUNT`].
#[must_use]
pub fn is_storable_amount(amount: Decimal) -> bool {
    !amount.is_sign_negative() && amount.normalize().scale() <= AMOUNT_SCALE && amount < MAX_AMOUNT
}

/// Tax owed on a subtotal: `floor(subtotal * TAX_RATE)`.
///
/// Subtotals are never negative, so flooring truncates toward zero.
#[must_use]
pub fn tax_on(subtotal: Decimal) -> Decimal {
    (subtotal * TAX_RATE).floor()
}

/// The price fields of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrice {
    /// List price (MRP).
    pub price: Decimal,
    /// Discounted price, overriding `price` when present.
    pub offer_price: Option<Decimal>,
}

impl ProductPrice {
    /// Create a price pair.
    #[must_use]
    pub const fn new(price: Decimal, offer_price: Option<Decimal>) -> Self {
        Self { price, offer_price }
    }

    /// The price a customer pays per unit.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.offer_price.unwrap_or(self.price)
    }
}

/// Breakdown of an order amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderTotal {
    /// Sum of unit price times quantity over all line items.
    pub subtotal: Decimal,
    /// Surcharge from [`tax_on`].
    pub tax: Decimal,
    /// `subtotal + tax`.
    pub amount: Decimal,
}

impl OrderTotal {
    /// Derive tax and amount from a subtotal.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let tax = tax_on(subtotal);
        Self {
            subtotal,
            tax,
            amount: subtotal + tax,
        }
    }

    /// Like [`OrderTotal::from_subtotal`], but `None` if the arithmetic
    /// overflows or the amount is not storable.
    #[must_use]
    pub fn checked_from_subtotal(subtotal: Decimal) -> Option<Self> {
        let tax = subtotal.checked_mul(TAX_RATE)?.floor();
        let amount = subtotal.checked_add(tax)?;
        is_storable_amount(amount).then_some(Self {
            subtotal,
            tax,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_is_two_percent() {
        assert_eq!(TAX_RATE, Decimal::new(2, 2));
    }

    #[test]
    fn test_unit_price_prefers_offer() {
        let with_offer = ProductPrice::new(Decimal::from(100), Some(Decimal::from(90)));
        assert_eq!(with_offer.unit_price(), Decimal::from(90));

        let list_only = ProductPrice::new(Decimal::from(50), None);
        assert_eq!(list_only.unit_price(), Decimal::from(50));
    }

    #[test]
    fn test_tax_is_truncated() {
        assert_eq!(tax_on(Decimal::from(200)), Decimal::from(4));
        assert_eq!(tax_on(Decimal::from(240)), Decimal::from(4));
        assert_eq!(tax_on(Decimal::from(49)), Decimal::ZERO);
        assert_eq!(tax_on(Decimal::new(12_575, 2)), Decimal::from(2));
    }

    #[test]
    fn test_order_total_from_subtotal() {
        let total = OrderTotal::from_subtotal(Decimal::from(240));
        assert_eq!(total.tax, Decimal::from(4));
        assert_eq!(total.amount, Decimal::from(244));
        assert!(total.amount >= total.subtotal);
    }

    #[test]
    fn test_max_amount_is_ten_billion() {
        assert_eq!(MAX_AMOUNT, Decimal::from(10_000_000_000_i64));
    }

    #[test]
    fn test_storable_amounts() {
        assert!(is_storable_amount(Decimal::new(999_999_999_999, 2)));
        assert!(is_storable_amount(Decimal::new(1_500, 3)));
        assert!(!is_storable_amount(MAX_AMOUNT));
        assert!(!is_storable_amount(Decimal::new(1_005, 3)));
        assert!(!is_storable_amount(Decimal::from(-1)));
    }

    #[test]
    fn test_checked_total_rejects_out_of_range() {
        assert_eq!(
            OrderTotal::checked_from_subtotal(Decimal::from(240)),
            Some(OrderTotal::from_subtotal(Decimal::from(240)))
        );
        // 4294967295 * 1000 plus tax
        assert_eq!(
            OrderTotal::checked_from_subtotal(Decimal::from(4_294_967_295_000_i64)),
            None
        );
        assert_eq!(OrderTotal::checked_from_subtotal(Decimal::MAX), None);
    }

    #[test]
    fn test_zero_subtotal() {
        assert_eq!(OrderTotal::from_subtotal(Decimal::ZERO), OrderTotal::default());
    }
}
