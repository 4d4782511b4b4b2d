use core_sim::{
    ledger::{self, sale_proceeds},
    money::round_cents,
    Holding, LedgerError, Order, OrderSide, OrderStatus, PortfolioPosition,
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::{orders::transition_from_pending, Store, StoreError, StoreResult};

/// What happens to a SELL whose holding is too small at settlement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectedSellPolicy {
    /// Mark the order EXECUTED and apply nothing.
    #[default]
    MarkExecuted,
    /// Mark the order FAILED and apply nothing.
    MarkFailed,
}

impl RejectedSellPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "executed" => Some(Self::MarkExecuted),
            "failed" => Some(Self::MarkFailed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarkExecuted => "executed",
            Self::MarkFailed => "failed",
        }
    }

    fn status(self) -> OrderStatus {
        match self {
            Self::MarkExecuted => OrderStatus::Executed,
            Self::MarkFailed => OrderStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettlementOutcome {
    /// Buy applied to the holding.
    Bought { holding: Holding },
    /// Shares removed and proceeds credited.
    Sold { holding: Holding, proceeds: f64 },
    /// Sell refused for lack of shares; the order ends in the policy's
    /// status with no ledger change.
    SellRejected {
        held: i64,
        requested: i64,
        status: OrderStatus,
    },
    /// Share count or order value cannot be represented; the order is FAILED
    /// with no ledger change.
    Unsettleable { requested: i64 },
    /// The order was no longer PENDING (cancelled or already settled).
    Skipped,
}

impl SettlementOutcome {
    pub fn final_status(&self) -> Option<OrderStatus> {
        match self {
            Self::Bought { .. } | Self::Sold { .. } => Some(OrderStatus::Executed),
            Self::SellRejected { status, .. } => Some(*status),
            Self::Unsettleable { .. } => Some(OrderStatus::Failed),
            Self::Skipped => None,
        }
    }
}

impl Store {
    pub fn holding(&self, user_id: i64, stock_id: i64) -> StoreResult<Option<Holding>> {
        let conn = self.conn.lock();
        load_holding(&conn, user_id, stock_id)
    }

    /// Holdings joined with their instruments; rows for deleted instruments
    /// drop out of the join.
    pub fn portfolio(&self, user_id: i64) -> StoreResult<Vec<PortfolioPosition>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT h.id, h.stock_id, i.ticker, i.company_name, h.quantity, h.average_price
             FROM holdings h
             JOIN instruments i ON h.stock_id = i.id
             WHERE h.user_id = ?1
             ORDER BY h.id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(PortfolioPosition {
                id: row.get(0)?,
                stock_id: row.get(1)?,
                ticker: row.get(2)?,
                company_name: row.get(3)?,
                quantity: row.get(4)?,
                average_price: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Ledger balance; users without an account read as zero.
    pub fn balance(&self, user_id: i64) -> StoreResult<f64> {
        let conn = self.conn.lock();
        load_balance(&conn, user_id).map(|balance| balance.unwrap_or(0.0))
    }

    pub fn deposit(&self, user_id: i64, amount: f64) -> StoreResult<f64> {
        // Validates the amount before touching the row.
        ledger::credit(0.0, amount)?;
        let conn = self.conn.lock();
        credit_cash(&conn, user_id, amount)?;
        load_balance(&conn, user_id)?.ok_or(StoreError::NotFound("cash account"))
    }

    /// Guarded debit: the row only changes while the balance covers `amount`.
    pub fn withdraw(&self, user_id: i64, amount: f64) -> StoreResult<f64> {
        let conn = self.conn.lock();
        let current = load_balance(&conn, user_id)?.unwrap_or(0.0);
        ledger::debit(current, amount)?;

        let updated = conn.execute(
            "UPDATE cash_accounts SET balance = ROUND(balance - ?1, 2)
             WHERE user_id = ?2 AND balance >= ?1",
            params![amount, user_id],
        )?;
        if updated == 0 {
            return Err(LedgerError::InsufficientFunds {
                balance: current,
                requested: amount,
            }
            .into());
        }
        load_balance(&conn, user_id)?.ok_or(StoreError::NotFound("cash account"))
    }

    /// Applies one order: status transition, holding change and cash credit
    /// commit together or not at all.
    pub fn settle_order(
        &self,
        order: &Order,
        policy: RejectedSellPolicy,
    ) -> StoreResult<SettlementOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let outcome = settle_in(&tx, order, policy)?;
        tx.commit()?;
        Ok(outcome)
    }
}

fn settle_in(
    conn: &Connection,
    order: &Order,
    policy: RejectedSellPolicy,
) -> StoreResult<SettlementOutcome> {
    let current = load_holding(conn, order.user_id, order.stock_id)?.unwrap_or_default();

    match order.side {
        OrderSide::Buy => match current.apply_buy(order.quantity, order.price) {
            Ok(next) => {
                if !transition_from_pending(conn, order.id, OrderStatus::Executed)? {
                    return Ok(SettlementOutcome::Skipped);
                }
                save_holding(conn, order.user_id, order.stock_id, next)?;
                Ok(SettlementOutcome::Bought { holding: next })
            }
            Err(err @ (LedgerError::QuantityOverflow { .. } | LedgerError::AmountOverflow)) => {
                fail_unsettleable(conn, order, err)
            }
            Err(err) => Err(err.into()),
        },
        OrderSide::Sell => {
            let proceeds = match sale_proceeds(order.quantity, order.price) {
                Ok(proceeds) => proceeds,
                Err(err) => return fail_unsettleable(conn, order, err),
            };
            match current.apply_sell(order.quantity) {
                Ok(next) => {
                    if !transition_from_pending(conn, order.id, OrderStatus::Executed)? {
                        return Ok(SettlementOutcome::Skipped);
                    }
                    save_holding(conn, order.user_id, order.stock_id, next)?;
                    credit_cash(conn, order.user_id, proceeds)?;
                    Ok(SettlementOutcome::Sold {
                        holding: next,
                        proceeds,
                    })
                }
                Err(LedgerError::InsufficientShares { held, requested }) => {
                    let status = policy.status();
                    if !transition_from_pending(conn, order.id, status)? {
                        return Ok(SettlementOutcome::Skipped);
                    }
                    Ok(SettlementOutcome::SellRejected {
                        held,
                        requested,
                        status,
                    })
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}

/// Retrying cannot help an order whose numbers overflow, so it is closed out.
fn fail_unsettleable(
    conn: &Connection,
    order: &Order,
    err: LedgerError,
) -> StoreResult<SettlementOutcome> {
    warn!(transaction_id = order.id, error = %err, "order cannot be settled");
    if !transition_from_pending(conn, order.id, OrderStatus::Failed)? {
        return Ok(SettlementOutcome::Skipped);
    }
    Ok(SettlementOutcome::Unsettleable {
        requested: order.quantity,
    })
}

fn load_holding(conn: &Connection, user_id: i64, stock_id: i64) -> StoreResult<Option<Holding>> {
    Ok(conn
        .query_row(
            "SELECT quantity, average_price FROM holdings WHERE user_id = ?1 AND stock_id = ?2",
            params![user_id, stock_id],
            |row| Ok(Holding::new(row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

fn save_holding(conn: &Connection, user_id: i64, stock_id: i64, holding: Holding) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO holdings (user_id, stock_id, quantity, average_price)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id, stock_id) DO UPDATE SET
             quantity = excluded.quantity,
             average_price = excluded.average_price",
        params![user_id, stock_id, holding.quantity, holding.average_price],
    )?;
    Ok(())
}

fn load_balance(conn: &Connection, user_id: i64) -> StoreResult<Option<f64>> {
    Ok(conn
        .query_row(
            "SELECT balance FROM cash_accounts WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?)
}

fn credit_cash(conn: &Connection, user_id: i64, amount: f64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO cash_accounts (user_id, balance) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET balance = ROUND(balance + excluded.balance, 2)",
        params![user_id, round_cents(amount)],
    )?;
    Ok(())
}
