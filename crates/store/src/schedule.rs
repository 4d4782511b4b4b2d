use core_sim::{calendar, MarketSchedule};
use rusqlite::{params, OptionalExtension, Row};

use crate::{schema::SCHEDULE_ID, Store, StoreError, StoreResult};

impl Store {
    /// The singleton calendar row; `None` only if it was deleted by hand.
    pub fn market_schedule(&self) -> StoreResult<Option<MarketSchedule>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, open_time, close_time, open_days, holidays, status
             FROM market_schedule WHERE id = ?1",
            params![SCHEDULE_ID],
            schedule_from_row,
        )
        .optional()?
        .transpose()
    }

    pub fn update_schedule(&self, schedule: &MarketSchedule) -> StoreResult<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE market_schedule
             SET open_time = ?1, close_time = ?2, open_days = ?3, holidays = ?4, status = ?5
             WHERE id = ?6",
            params![
                calendar::format_time_of_day(schedule.open),
                calendar::format_time_of_day(schedule.close),
                schedule.open_days_csv(),
                schedule.holidays_csv(),
                schedule.status,
                schedule.id,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound("market schedule"));
        }
        Ok(())
    }

    /// Writes only the open/closed flag.
    pub fn set_market_status(&self, id: i64, open: bool) -> StoreResult<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE market_schedule SET status = ?1 WHERE id = ?2",
            params![open, id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound("market schedule"));
        }
        Ok(())
    }
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<StoreResult<MarketSchedule>> {
    let open: String = row.get("open_time")?;
    let close: String = row.get("close_time")?;
    let open_days: String = row.get("open_days")?;
    let holidays: String = row.get("holidays")?;

    let (Some(open), Some(close)) = (
        calendar::parse_time_of_day(&open),
        calendar::parse_time_of_day(&close),
    ) else {
        return Ok(Err(StoreError::Corrupt(format!(
            "market hours {open:?}-{close:?}"
        ))));
    };

    Ok(Ok(MarketSchedule {
        id: row.get("id")?,
        open,
        close,
        open_days: calendar::parse_open_days(&open_days),
        holidays: calendar::parse_holidays(&holidays),
        status: row.get("status")?,
    }))
}
