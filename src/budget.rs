//! Remaining-budget math and the warning color ramp shown on project cards.

/// Percent of the budget still unspent, rounded to the nearest integer.
/// A zero budget is defined as 0% remaining instead of dividing by zero.
pub fn remaining_percent(budget: f64, actual_cost: f64) -> i64 {
    if budget == 0.0 {
        return 0;
    }
    (((budget - actual_cost) / budget) * 100.0).round() as i64
}

/// Three-band ramp from safe red (plenty left) through amber down to blue
/// (overspent), interpolated linearly within each band.
pub fn remaining_color(percent: i64) -> (u8, u8, u8) {
    if percent >= 40 {
        (200, 0, 0)
    } else if percent >= 20 {
        let ratio = (percent - 20) as f64 / 20.0;
        let red = (200.0 + (1.0 - ratio) * 55.0).round() as u8;
        let green = (ratio * 100.0).round() as u8;
        (red, green, 0)
    } else if percent >= 0 {
        let ratio = percent as f64 / 20.0;
        let red = (ratio * 200.0).round() as u8;
        let green = (100.0 + ratio * 50.0).round() as u8;
        let blue = (200.0 - ratio * 100.0).round() as u8;
        (red, green, blue)
    } else {
        (0, 80, 200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_to_nearest_integer() {
        assert_eq!(remaining_percent(1_000_000.0, 600_000.0), 40);
        assert_eq!(remaining_percent(3_000_000.0, 1_000_000.0), 67);
    }

    #[test]
    fn untouched_budget_is_fully_remaining() {
        assert_eq!(remaining_percent(1_000_000.0, 0.0), 100);
    }

    #[test]
    fn zero_budget_is_defined_as_zero_remaining() {
        assert_eq!(remaining_percent(0.0, 0.0), 0);
        assert_eq!(remaining_percent(0.0, 500_000.0), 0);
    }

    #[test]
    fn overspend_goes_negative() {
        assert_eq!(remaining_percent(1_000_000.0, 1_500_000.0), -50);
    }

    #[test]
    fn color_band_edges() {
        assert_eq!(remaining_color(100), (200, 0, 0));
        assert_eq!(remaining_color(40), (200, 0, 0));
        // top of the middle band approaches the red band
        assert_eq!(remaining_color(39), (203, 95, 0));
        assert_eq!(remaining_color(20), (255, 0, 0));
        assert_eq!(remaining_color(19), (190, 148, 105));
        assert_eq!(remaining_color(0), (0, 100, 200));
        assert_eq!(remaining_color(-10), (0, 80, 200));
    }
}
