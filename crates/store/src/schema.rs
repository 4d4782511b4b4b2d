//! Table definitions and first-run seed data.

use rusqlite::{params, Connection, Result};

use core_sim::{calendar, MarketSchedule};

pub const SCHEDULE_ID: i64 = 1;

/// Create all tables and indexes, then seed the schedule row if missing.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name TEXT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
        [],
    )?;

    // History is a JSON array of {time, price}, capped by the price simulator.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS instruments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL UNIQUE,
            company_name TEXT NOT NULL,
            initial_price REAL NOT NULL,
            current_price REAL NOT NULL,
            volume INTEGER NOT NULL,
            day_high REAL NOT NULL,
            day_low REAL NOT NULL,
            day_start REAL NOT NULL,
            day_end REAL NOT NULL,
            history TEXT NOT NULL DEFAULT '[]'
        )",
        [],
    )?;

    // No foreign keys: orders and holdings outlive a deleted instrument.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            stock_id INTEGER NOT NULL,
            side TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            price REAL NOT NULL,
            status TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_orders_status_created ON orders(status, created_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_orders_user_created ON orders(user_id, created_at DESC)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS holdings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            stock_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 0),
            average_price REAL NOT NULL,
            UNIQUE(user_id, stock_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cash_accounts (
            user_id INTEGER PRIMARY KEY,
            balance REAL NOT NULL CHECK (balance >= 0)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS market_schedule (
            id INTEGER PRIMARY KEY,
            open_time TEXT NOT NULL,
            close_time TEXT NOT NULL,
            open_days TEXT NOT NULL,
            holidays TEXT NOT NULL DEFAULT '',
            status INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    let seed = MarketSchedule::default_with_id(SCHEDULE_ID);
    conn.execute(
        "INSERT OR IGNORE INTO market_schedule (id, open_time, close_time, open_days, holidays, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            seed.id,
            calendar::format_time_of_day(seed.open),
            calendar::format_time_of_day(seed.close),
            seed.open_days_csv(),
            seed.holidays_csv(),
            seed.status,
        ],
    )?;

    Ok(())
}
