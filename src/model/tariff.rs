/// Hourly electricity tariff aligned to the scheduling horizon.
///
/// Prices are stored already rotated by the configured hour shift, so index 0
/// is the first hour of the scheduling horizon rather than midnight.
#[derive(Debug, Clone, PartialEq)]
pub struct Tariff {
    prices: Vec<f32>,
}

impl Tariff {
    /// Creates a tariff from per-hour prices, index 0 = first horizon hour.
    pub fn new(prices: Vec<f32>) -> Self {
        Self { prices }
    }

    /// Creates a tariff from midnight-aligned prices rotated left by
    /// `shift_hours`, so that index 0 corresponds to the shift hour.
    pub fn with_shift(mut prices: Vec<f32>, shift_hours: usize) -> Self {
        if !prices.is_empty() {
            let shift = shift_hours % prices.len();
            prices.rotate_left(shift);
        }
        Self { prices }
    }

    /// Scheduling horizon in hours.
    pub fn horizon(&self) -> usize {
        self.prices.len()
    }

    /// Price for the given horizon hour.
    pub fn price(&self, hour: usize) -> f32 {
        self.prices[hour]
    }

    /// All per-hour prices.
    pub fn prices(&self) -> &[f32] {
        &self.prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_rotates_prices() {
        let t = Tariff::with_shift(vec![1.0, 2.0, 3.0, 4.0], 1);
        assert_eq!(t.prices(), &[2.0, 3.0, 4.0, 1.0]);
    }

    #[test]
    fn shift_wraps_past_horizon() {
        let t = Tariff::with_shift(vec![1.0, 2.0, 3.0], 4);
        assert_eq!(t.prices(), &[2.0, 3.0, 1.0]);
    }

    #[test]
    fn zero_shift_is_identity() {
        let t = Tariff::with_shift(vec![0.1, 0.2], 0);
        assert_eq!(t.prices(), &[0.1, 0.2]);
    }

    #[test]
    fn empty_tariff_has_zero_horizon() {
        let t = Tariff::with_shift(Vec::new(), 6);
        assert_eq!(t.horizon(), 0);
    }
}
