use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};

pub const DEFAULT_OPEN: &str = "09:00";
pub const DEFAULT_CLOSE: &str = "17:00";
pub const DEFAULT_OPEN_DAYS: [u8; 5] = [1, 2, 3, 4, 5];

/// The singleton trading calendar record.
///
/// Weekdays are numbered 1 (Monday) through 7 (Sunday).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSchedule {
    pub id: i64,
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub open_days: BTreeSet<u8>,
    pub holidays: Vec<String>,
    /// Stored open/closed flag, reconciled by the calendar job.
    pub status: bool,
}

impl MarketSchedule {
    pub fn default_with_id(id: i64) -> Self {
        Self {
            id,
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            open_days: DEFAULT_OPEN_DAYS.into_iter().collect(),
            holidays: Vec::new(),
            status: false,
        }
    }

    /// Open weekday and minute-of-day inside `[open, close]`, both ends inclusive.
    ///
    /// Seconds are ignored, so a 17:00 close admits the whole 17:00 minute.
    pub fn should_be_open(&self, now: NaiveDateTime) -> bool {
        let weekday = now.weekday().number_from_monday() as u8;
        if !self.open_days.contains(&weekday) {
            return false;
        }

        let current = minute_of_day(now.time());
        current >= minute_of_day(self.open) && current <= minute_of_day(self.close)
    }

    pub fn open_days_csv(&self) -> String {
        join_days(&self.open_days)
    }

    pub fn holidays_csv(&self) -> String {
        self.holidays.join(",")
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parses a comma-separated weekday list, dropping anything outside 1..=7.
pub fn parse_open_days(value: &str) -> BTreeSet<u8> {
    value
        .split(',')
        .filter_map(|part| part.trim().parse::<u8>().ok())
        .filter(|day| (1..=7).contains(day))
        .collect()
}

pub fn join_days(days: &BTreeSet<u8>) -> String {
    days.iter()
        .map(|day| day.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_holidays(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
