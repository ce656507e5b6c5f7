//! Order types.
//!
//! Orders are written only by the order consumer, one per `order/created`
//! event. The `event_id` ties a stored order back to the event that produced
//! it and is unique in storage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use msgrocery_core::{AddressId, EventId, OrderId, OrderStatus, ProductId, UserId};

/// One product and quantity within an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product: ProductId,
    pub quantity: u32,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub items: Vec<OrderLineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub address: AddressId,
    pub status: OrderStatus,
    /// Placement time, epoch milliseconds.
    pub date: i64,
}

/// An order projected from an event, ready for bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub event_id: EventId,
    pub user_id: UserId,
    pub items: Vec<OrderLineItem>,
    pub amount: Decimal,
    pub address: AddressId,
    pub date: i64,
}

impl NewOrder {
    /// Attach a record id, producing a stored order.
    #[must_use]
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            event_id: self.event_id,
            user_id: self.user_id,
            items: self.items,
            amount: self.amount,
            address: self.address,
            status: OrderStatus::OrderPlaced,
            date: self.date,
        }
    }
}
