/// Rounds a dollar amount to whole cents, half away from zero.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn is_positive_amount(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
