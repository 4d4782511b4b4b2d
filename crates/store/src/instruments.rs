use core_sim::{
    instrument::{encode_history, parse_history},
    Instrument, InstrumentDraft,
};
use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

use crate::{is_unique_violation, Store, StoreError, StoreResult};

const INSTRUMENT_COLUMNS: &str = "id, ticker, company_name, initial_price, current_price, volume, \
     day_high, day_low, day_start, day_end, history";

impl Store {
    pub fn list_instruments(&self) -> StoreResult<Vec<Instrument>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INSTRUMENT_COLUMNS} FROM instruments ORDER BY id"
        ))?;
        let rows = stmt.query_map([], instrument_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_instrument(&self, id: i64) -> StoreResult<Option<Instrument>> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {INSTRUMENT_COLUMNS} FROM instruments WHERE id = ?1"),
                params![id],
                instrument_from_row,
            )
            .optional()?)
    }

    /// Creates an instrument; the initial price doubles as the current price
    /// and the history starts empty.
    pub fn insert_instrument(&self, draft: &InstrumentDraft) -> StoreResult<Instrument> {
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO instruments (ticker, company_name, initial_price, current_price, volume,
                 day_high, day_low, day_start, day_end, history)
             VALUES (?1, ?2, ?3, ?3, ?4, ?5, ?6, ?7, ?8, '[]')",
            params![
                draft.ticker,
                draft.company_name,
                draft.price,
                draft.volume,
                draft.day_high,
                draft.day_low,
                draft.day_start,
                draft.day_end,
            ],
        );
        match result {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Err(StoreError::Duplicate("ticker")),
            Err(err) => return Err(err.into()),
        }

        Ok(Instrument {
            id: conn.last_insert_rowid(),
            ticker: draft.ticker.clone(),
            company_name: draft.company_name.clone(),
            initial_price: draft.price,
            current_price: draft.price,
            volume: draft.volume,
            day_high: draft.day_high,
            day_low: draft.day_low,
            day_start: draft.day_start,
            day_end: draft.day_end,
            history: Vec::new(),
        })
    }

    /// Overwrites the editable fields. History and initial price are kept.
    pub fn update_instrument(&self, id: i64, draft: &InstrumentDraft) -> StoreResult<()> {
        let conn = self.conn.lock();
        let result = conn.execute(
            "UPDATE instruments
             SET ticker = ?1, company_name = ?2, current_price = ?3, volume = ?4,
                 day_high = ?5, day_low = ?6, day_start = ?7, day_end = ?8
             WHERE id = ?9",
            params![
                draft.ticker,
                draft.company_name,
                draft.price,
                draft.volume,
                draft.day_high,
                draft.day_low,
                draft.day_start,
                draft.day_end,
                id,
            ],
        );
        match result {
            Ok(0) => Err(StoreError::NotFound("stock")),
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate("ticker")),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the instrument row only; orders and holdings that reference it
    /// are left in place.
    pub fn delete_instrument(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM instruments WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound("stock"));
        }
        Ok(())
    }

    /// Persists the fields the price simulator moves.
    pub fn save_price_tick(&self, instrument: &Instrument) -> StoreResult<()> {
        let history = encode_history(&instrument.history)?;
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE instruments
             SET current_price = ?1, day_high = ?2, day_low = ?3, history = ?4
             WHERE id = ?5",
            params![
                instrument.current_price,
                instrument.day_high,
                instrument.day_low,
                history,
                instrument.id,
            ],
        )?;
        Ok(())
    }
}

/// A history column that does not decode is treated as empty for that row.
fn instrument_from_row(row: &Row<'_>) -> rusqlite::Result<Instrument> {
    let id: i64 = row.get("id")?;
    let ticker: String = row.get("ticker")?;
    let raw_history: String = row.get("history")?;
    let history = parse_history(&raw_history).unwrap_or_else(|err| {
        warn!(stock_id = id, %ticker, error = %err, "unreadable price history, starting fresh");
        Vec::new()
    });

    Ok(Instrument {
        id,
        ticker,
        company_name: row.get("company_name")?,
        initial_price: row.get("initial_price")?,
        current_price: row.get("current_price")?,
        volume: row.get("volume")?,
        day_high: row.get("day_high")?,
        day_low: row.get("day_low")?,
        day_start: row.get("day_start")?,
        day_end: row.get("day_end")?,
        history,
    })
}
