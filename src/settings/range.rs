//! Range resolution shared by every bounded setting.

/// Inclusive `[min, max]` interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Resolve a (min, max) pair against a valid interval.
///
/// Non-finite or out-of-range endpoints are replaced by the matching default
/// endpoint. If the resolved pair is empty or inverted (`max <= min`) both
/// endpoints are replaced; the pair is never swapped.
pub fn resolve_range(target_min: f64, target_max: f64, valid: Interval, default: Interval) -> Interval {
    let mut min = target_min;
    if !min.is_finite() || !valid.contains(min) {
        min = default.min;
    }

    let mut max = target_max;
    if !max.is_finite() || !valid.contains(max) {
        max = default.max;
    }

    if max <= min {
        return default;
    }

    Interval::new(min, max)
}

/// Single-value variant of [`resolve_range`].
pub fn resolve_scalar(value: f64, valid: Interval, default: f64) -> f64 {
    if value.is_finite() && valid.contains(value) {
        value
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: Interval = Interval::new(0.0, 10.0);
    const DEFAULT: Interval = Interval::new(1.0, 9.0);

    #[test]
    fn keeps_valid_pair() {
        assert_eq!(resolve_range(2.0, 3.0, VALID, DEFAULT), Interval::new(2.0, 3.0));
    }

    #[test]
    fn substitutes_non_finite_endpoints() {
        assert_eq!(resolve_range(f64::NAN, 3.0, VALID, DEFAULT), Interval::new(1.0, 3.0));
        assert_eq!(resolve_range(2.0, f64::INFINITY, VALID, DEFAULT), Interval::new(2.0, 9.0));
    }

    #[test]
    fn substitutes_out_of_range_endpoints() {
        assert_eq!(resolve_range(-1.0, 3.0, VALID, DEFAULT), Interval::new(1.0, 3.0));
        assert_eq!(resolve_range(2.0, 11.0, VALID, DEFAULT), Interval::new(2.0, 9.0));
        assert_eq!(resolve_range(12.0, 11.0, VALID, DEFAULT), DEFAULT);
    }

    #[test]
    fn inverted_pair_resets_both_ends() {
        assert_eq!(resolve_range(5.0, 4.0, VALID, DEFAULT), DEFAULT);
        assert_eq!(resolve_range(5.0, 5.0, VALID, DEFAULT), DEFAULT);
    }

    #[test]
    fn scalar_falls_back_to_default() {
        assert_eq!(resolve_scalar(4.0, VALID, 1.0), 4.0);
        assert_eq!(resolve_scalar(-4.0, VALID, 1.0), 1.0);
        assert_eq!(resolve_scalar(f64::NAN, VALID, 1.0), 1.0);
    }
}
