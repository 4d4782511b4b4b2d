use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{config::SimConfig, money::round_cents};

/// Uniform random walk used to perturb instrument prices once per run.
#[derive(Debug, Clone)]
pub struct PriceWalk {
    rng: StdRng,
    config: SimConfig,
}

impl PriceWalk {
    pub fn new(config: SimConfig) -> Self {
        Self::with_rng(StdRng::from_entropy(), config)
    }

    pub fn seeded(seed: u64, config: SimConfig) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), config)
    }

    fn with_rng(rng: StdRng, config: SimConfig) -> Self {
        assert!(
            config.max_fluctuation_pct.is_finite() && config.max_fluctuation_pct >= 0.0,
            "max_fluctuation_pct must be finite and non-negative"
        );
        assert!(
            config.min_price.is_finite() && config.min_price > 0.0,
            "min_price must be finite and positive"
        );

        Self { rng, config }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Draws a fluctuation rate in `[-max, +max]`.
    pub fn next_fluctuation(&mut self) -> f64 {
        let max = self.config.max_fluctuation_rate();
        if max == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-max..=max)
    }

    pub fn next_price(&mut self, price: f64) -> f64 {
        let fluctuation = self.next_fluctuation();
        apply_fluctuation(price, fluctuation, self.config.min_price)
    }
}

/// `max(min_price, round_cents(price * (1 + fluctuation)))`.
pub fn apply_fluctuation(price: f64, fluctuation: f64, min_price: f64) -> f64 {
    let base = if price.is_finite() { price } else { min_price };
    round_cents(base + base * fluctuation).max(min_price)
}
