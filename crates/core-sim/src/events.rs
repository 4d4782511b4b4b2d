use serde::Serialize;

use crate::{instrument::Instrument, order::OrderStatus};

/// Messages pushed to every connected viewer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MarketEvent {
    Connected,
    StockUpdate {
        stocks: Vec<Instrument>,
    },
    MarketStatusChanged {
        open: bool,
    },
    OrderSettled {
        transaction_id: i64,
        user_id: i64,
        status: OrderStatus,
    },
}

impl MarketEvent {
    pub fn stock_update(stocks: Vec<Instrument>) -> Self {
        Self::StockUpdate { stocks }
    }

    pub fn market_status_changed(open: bool) -> Self {
        Self::MarketStatusChanged { open }
    }

    pub fn order_settled(transaction_id: i64, user_id: i64, status: OrderStatus) -> Self {
        Self::OrderSettled {
            transaction_id,
            user_id,
            status,
        }
    }
}
