//! Physical constants of the control model.
//!
//! These are deliberately not configuration: every threshold in the
//! library derives from δ and the stable coupling range, and hosts are
//! not offered knobs to move them.

/// Feigenbaum's constant δ, truncated to four decimals.
///
/// Four decimals is intentional: the coupling signals feeding the model
/// ride on network I/O with a millisecond-order noise floor, so
/// sub-millisecond precision in the bound is meaningless. The full
/// value is 4.669201609102990...
pub const FEIGENBAUM_DELTA: f64 = 4.6692;

/// 1/δ ≈ 0.2142: the maximum safe scaling ratio, and the largest
/// correction a single recovery pulse may apply. Derived, never pinned.
pub const CRITICALITY_SCALING_RATIO: f64 = 1.0 / FEIGENBAUM_DELTA;

/// Lower bound of the stable coupling range. Below this the system
/// converges to trivial dynamics.
pub const STABLE_COUPLING_MIN: f64 = 1.0;

/// Upper bound of the stable coupling range. At r = 3.0 the
/// period-doubling cascade begins; r ≥ 3.0 is treated as saturation
/// everywhere in this workspace.
pub const STABLE_COUPLING_MAX: f64 = 3.0;

/// True iff r lies strictly inside the stable range (1.0, 3.0).
pub fn in_stable_range(r: f64) -> bool {
    r > STABLE_COUPLING_MIN && r < STABLE_COUPLING_MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_has_four_decimals() {
        assert_eq!(FEIGENBAUM_DELTA, 4.6692);
        assert!((CRITICALITY_SCALING_RATIO - 0.214_169).abs() < 1e-6);
    }

    #[test]
    fn stable_range_is_open() {
        assert!(!in_stable_range(1.0));
        assert!(!in_stable_range(3.0));
        assert!(in_stable_range(1.0001));
        assert!(in_stable_range(2.9999));
        assert!(!in_stable_range(3.5));
    }
}
