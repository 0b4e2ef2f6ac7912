use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Limit,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    Open,
    Filled,
    Cancelled,
    Rejected,
}

/// A desired order expressed abstractly: one price level and a quantity.
/// The sizing policy emits a single leg per side per cycle; ladder-based
/// strategies may emit many.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderLeg {
    pub price: f64,
    pub quantity: f64,
}

/// Ordered set of desired legs for one side of the book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegBook {
    pub legs: Vec<OrderLeg>,
}

impl LegBook {
    #[must_use]
    pub fn new() -> Self {
        Self { legs: Vec::new() }
    }

    pub fn push(&mut self, price: f64, quantity: f64) {
        self.legs.push(OrderLeg { price, quantity });
    }

    pub fn clear(&mut self) {
        self.legs.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    #[must_use]
    pub fn total_quantity(&self) -> f64 {
        self.legs.iter().map(|l| l.quantity).sum()
    }
}

/// An order resident on the exchange, keyed by exchange order id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub status: OrderStatus,
}

/// An order about to be sent to the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub kind: OrderKind,
}

/// A fill, ephemeral: consumed immediately by the position ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
}
