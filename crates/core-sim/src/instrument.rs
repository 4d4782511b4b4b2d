use serde::{Deserialize, Serialize};

use crate::money::round_cents;

/// One point of the rolling intraday chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Wall-clock time of day, `HH:MM`.
    pub time: String,
    pub price: f64,
}

/// A tradable stock as stored and as pushed to viewers.
///
/// Field names on the wire follow the column names the trading UI reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: i64,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "CompanyName")]
    pub company_name: String,
    #[serde(rename = "InitialPrice")]
    pub initial_price: f64,
    #[serde(rename = "CurrentPrice")]
    pub current_price: f64,
    #[serde(rename = "Volume")]
    pub volume: i64,
    #[serde(rename = "dayHigh")]
    pub day_high: f64,
    #[serde(rename = "dayLow")]
    pub day_low: f64,
    #[serde(rename = "dayStart")]
    pub day_start: f64,
    #[serde(rename = "dayEnd")]
    pub day_end: f64,
    pub history: Vec<PricePoint>,
}

/// Fields accepted when an instrument is created or edited.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentDraft {
    pub ticker: String,
    pub company_name: String,
    pub price: f64,
    pub volume: i64,
    pub day_high: f64,
    pub day_low: f64,
    pub day_start: f64,
    pub day_end: f64,
}

impl Instrument {
    /// Moves the instrument to `new_price`, widening the day range and
    /// appending to the capped history.
    pub fn apply_price(&mut self, new_price: f64, time_of_day: String, history_cap: usize) {
        self.day_high = if self.day_high > 0.0 {
            self.day_high.max(new_price)
        } else {
            new_price
        };
        self.day_low = if self.day_low > 0.0 {
            self.day_low.min(new_price)
        } else {
            new_price
        };
        self.current_price = new_price;
        push_capped(
            &mut self.history,
            PricePoint {
                time: time_of_day,
                price: round_cents(new_price),
            },
            history_cap,
        );
    }
}

/// Appends `point`, evicting from the front until at most `cap` points remain.
pub fn push_capped(history: &mut Vec<PricePoint>, point: PricePoint, cap: usize) {
    history.push(point);
    if history.len() > cap {
        let excess = history.len() - cap;
        history.drain(..excess);
    }
}

pub fn parse_history(raw: &str) -> Result<Vec<PricePoint>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}

pub fn encode_history(history: &[PricePoint]) -> Result<String, serde_json::Error> {
    serde_json::to_string(history)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(price: f64) -> Instrument {
        Instrument {
            id: 1,
            ticker: "ACME".to_string(),
            company_name: "Acme Corp".to_string(),
            initial_price: price,
            current_price: price,
            volume: 1_000,
            day_high: price,
            day_low: price,
            day_start: price,
            day_end: price,
            history: Vec::new(),
        }
    }

    #[test]
    fn apply_price_widens_day_range() {
        let mut stock = instrument(100.0);

        stock.apply_price(101.5, "10:00".to_string(), 20);
        stock.apply_price(98.25, "10:01".to_string(), 20);

        assert_eq!(stock.current_price, 98.25);
        assert_eq!(stock.day_high, 101.5);
        assert_eq!(stock.day_low, 98.25);
        assert_eq!(stock.history.len(), 2);
        assert_eq!(stock.history[1].time, "10:01");
    }

    #[test]
    fn zero_day_range_is_seeded_from_new_price() {
        let mut stock = instrument(50.0);
        stock.day_high = 0.0;
        stock.day_low = 0.0;

        stock.apply_price(51.0, "09:30".to_string(), 20);

        assert_eq!(stock.day_high, 51.0);
        assert_eq!(stock.day_low, 51.0);
    }

    #[test]
    fn history_evicts_oldest_points_beyond_cap() {
        let mut history = Vec::new();
        for minute in 0..25 {
            push_capped(
                &mut history,
                PricePoint {
                    time: format!("10:{minute:02}"),
                    price: 10.0 + minute as f64,
                },
                20,
            );
        }

        assert_eq!(history.len(), 20);
        assert_eq!(history[0].time, "10:05");
        assert_eq!(history[19].time, "10:24");
    }

    #[test]
    fn blank_history_parses_as_empty() {
        assert!(parse_history("").unwrap().is_empty());
        assert!(parse_history("[]").unwrap().is_empty());
        assert!(parse_history("{not json").is_err());
    }

    #[test]
    fn serializes_with_ui_column_names() {
        let json = serde_json::to_value(instrument(12.0)).unwrap();

        assert_eq!(json["Ticker"], "ACME");
        assert_eq!(json["CurrentPrice"], 12.0);
        assert_eq!(json["dayHigh"], 12.0);
        assert!(json["history"].is_array());
    }
}
