#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Largest per-run move in either direction, in percent of the last price.
    pub max_fluctuation_pct: f64,
    pub min_price: f64,
    pub history_cap: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_fluctuation_pct: 2.0,
            min_price: 0.01,
            history_cap: 20,
        }
    }
}

impl SimConfig {
    pub fn max_fluctuation_rate(&self) -> f64 {
        self.max_fluctuation_pct / 100.0
    }
}
