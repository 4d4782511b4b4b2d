use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle. Only `Pending` may move; every other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Executed,
    Cancelled,
    /// Settlement refused the order (only under the `MarkFailed` sell policy).
    Failed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Executed => "EXECUTED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "EXECUTED" => Some(Self::Executed),
            "CANCELLED" => Some(Self::Cancelled),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Executed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Pending, Self::Failed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A buy or sell request, shown to users as a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "TransactionID")]
    pub id: i64,
    #[serde(rename = "UserID")]
    pub user_id: i64,
    #[serde(rename = "StockID")]
    pub stock_id: i64,
    #[serde(rename = "TransactionType")]
    pub side: OrderSide,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "TransactionStatus")]
    pub status: OrderStatus,
    #[serde(rename = "Timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Largest share count a single order may carry.
pub const MAX_ORDER_QUANTITY: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewOrder {
    pub user_id: i64,
    pub stock_id: i64,
    pub side: OrderSide,
    pub quantity: i64,
    pub price: f64,
}

impl NewOrder {
    /// All fields present and positive; the only check intake performs.
    pub fn is_complete(&self) -> bool {
        self.user_id > 0
            && self.stock_id > 0
            && self.quantity > 0
            && self.price.is_finite()
            && self.price > 0.0
    }

    /// Quantity under the per-order cap and a finite order value.
    pub fn within_limits(&self) -> bool {
        self.quantity <= MAX_ORDER_QUANTITY && (self.quantity as f64 * self.price).is_finite()
    }
}
