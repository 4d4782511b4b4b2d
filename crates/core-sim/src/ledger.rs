use serde::Serialize;

use crate::money::{is_positive_amount, round_cents};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient shares: holding {held}, requested {requested}")]
    InsufficientShares { held: i64, requested: i64 },
    #[error("insufficient funds: balance {balance:.2}, requested {requested:.2}")]
    InsufficientFunds { balance: f64, requested: f64 },
    #[error("quantity must be a positive integer")]
    InvalidQuantity,
    #[error("amount must be a positive number")]
    InvalidAmount,
    #[error("share count overflows: holding {held}, adding {adding}")]
    QuantityOverflow { held: i64, adding: i64 },
    #[error("order value is not representable")]
    AmountOverflow,
}

/// Shares of one instrument owned by one user.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Holding {
    pub quantity: i64,
    /// Weighted-average cost basis, recomputed on buys only.
    pub average_price: f64,
}

impl Holding {
    pub fn new(quantity: i64, average_price: f64) -> Self {
        Self {
            quantity,
            average_price,
        }
    }

    pub fn apply_buy(&self, quantity: i64, price: f64) -> Result<Holding, LedgerError> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        if !is_positive_amount(price) {
            return Err(LedgerError::InvalidAmount);
        }

        let new_quantity =
            self.quantity
                .checked_add(quantity)
                .ok_or(LedgerError::QuantityOverflow {
                    held: self.quantity,
                    adding: quantity,
                })?;
        let cost = self.average_price * self.quantity as f64 + price * quantity as f64;
        let average_price = cost / new_quantity as f64;
        if !cost.is_finite() || !average_price.is_finite() {
            return Err(LedgerError::AmountOverflow);
        }

        Ok(Holding {
            quantity: new_quantity,
            average_price,
        })
    }

    /// Sells never touch the cost basis and never go below zero shares.
    pub fn apply_sell(&self, quantity: i64) -> Result<Holding, LedgerError> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        if self.quantity < quantity {
            return Err(LedgerError::InsufficientShares {
                held: self.quantity,
                requested: quantity,
            });
        }

        Ok(Holding {
            quantity: self.quantity - quantity,
            average_price: self.average_price,
        })
    }
}

pub fn sale_proceeds(quantity: i64, price: f64) -> Result<f64, LedgerError> {
    let proceeds = round_cents(quantity as f64 * price);
    if !proceeds.is_finite() {
        return Err(LedgerError::AmountOverflow);
    }
    Ok(proceeds)
}

pub fn credit(balance: f64, amount: f64) -> Result<f64, LedgerError> {
    if !is_positive_amount(amount) {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(round_cents(balance + amount))
}

pub fn debit(balance: f64, amount: f64) -> Result<f64, LedgerError> {
    if !is_positive_amount(amount) {
        return Err(LedgerError::InvalidAmount);
    }
    if balance < amount {
        return Err(LedgerError::InsufficientFunds {
            balance,
            requested: amount,
        });
    }
    Ok(round_cents(balance - amount))
}

/// Portfolio read model row: a holding joined with its instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioPosition {
    #[serde(rename = "PortfolioID")]
    pub id: i64,
    #[serde(rename = "StockID")]
    pub stock_id: i64,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "CompanyName")]
    pub company_name: String,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "AveragePrice")]
    pub average_price: f64,
}
