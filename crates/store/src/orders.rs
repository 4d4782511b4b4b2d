use chrono::{DateTime, Utc};
use core_sim::{NewOrder, Order, OrderSide, OrderStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{from_millis, to_millis, Store, StoreError, StoreResult};

const ORDER_COLUMNS: &str = "id, user_id, stock_id, side, quantity, price, status, created_at";

impl Store {
    /// Records a new PENDING order stamped with `created_at`.
    pub fn insert_order(&self, order: &NewOrder, created_at: DateTime<Utc>) -> StoreResult<Order> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO orders (user_id, stock_id, side, quantity, price, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                order.user_id,
                order.stock_id,
                order.side.as_str(),
                order.quantity,
                order.price,
                OrderStatus::Pending.as_str(),
                to_millis(created_at),
            ],
        )?;

        Ok(Order {
            id: conn.last_insert_rowid(),
            user_id: order.user_id,
            stock_id: order.stock_id,
            side: order.side,
            quantity: order.quantity,
            price: order.price,
            status: OrderStatus::Pending,
            created_at,
        })
    }

    pub fn get_order(&self, id: i64) -> StoreResult<Option<Order>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
            params![id],
            order_from_row,
        )
        .optional()?
        .transpose()
    }

    /// PENDING to CANCELLED. Returns `NotFound` when the order is missing or
    /// has already left PENDING.
    pub fn cancel_order(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn.lock();
        if !transition_from_pending(&conn, id, OrderStatus::Cancelled)? {
            return Err(StoreError::NotFound("pending transaction"));
        }
        Ok(())
    }

    /// A user's orders, newest first.
    pub fn orders_for_user(&self, user_id: i64) -> StoreResult<Vec<Order>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], order_from_row)?;
        rows.map(|row| -> StoreResult<Order> { row? }).collect()
    }

    /// PENDING orders created at or before `cutoff`, oldest first.
    pub fn eligible_orders(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Order>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE status = ?1 AND created_at <= ?2
             ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(
            params![OrderStatus::Pending.as_str(), to_millis(cutoff)],
            order_from_row,
        )?;
        rows.map(|row| -> StoreResult<Order> { row? }).collect()
    }
}

/// Conditional status update; false when the order was not PENDING.
pub(crate) fn transition_from_pending(
    conn: &Connection,
    id: i64,
    next: OrderStatus,
) -> StoreResult<bool> {
    debug_assert!(OrderStatus::Pending.can_transition_to(next));
    let updated = conn.execute(
        "UPDATE orders SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![next.as_str(), id, OrderStatus::Pending.as_str()],
    )?;
    Ok(updated > 0)
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<StoreResult<Order>> {
    let side: String = row.get("side")?;
    let status: String = row.get("status")?;
    let created_at: i64 = row.get("created_at")?;

    let Some(side) = OrderSide::parse(&side) else {
        return Ok(Err(StoreError::Corrupt(format!("unknown order side {side:?}"))));
    };
    let Some(status) = OrderStatus::parse(&status) else {
        return Ok(Err(StoreError::Corrupt(format!("unknown order status {status:?}"))));
    };
    let created_at = match from_millis(created_at) {
        Ok(ts) => ts,
        Err(err) => return Ok(Err(err)),
    };

    Ok(Ok(Order {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        stock_id: row.get("stock_id")?,
        side,
        quantity: row.get("quantity")?,
        price: row.get("price")?,
        status,
        created_at,
    }))
}
