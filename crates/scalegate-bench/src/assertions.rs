//! Scalability assertions over a benchmark's fitted USL model.
//!
//! These return `Result` rather than panicking so tests compose them
//! with `?` and report the full violation message on failure.

use thiserror::Error;

use scalegate_usl::{FitError, UslCoefficients, fit_usl};

use crate::driver::{LevelResult, to_samples};

/// Thresholds for the scalability properties.
#[derive(Debug, Clone, Copy)]
pub struct AssertionConfig {
    /// α must stay below this for "zero contention".
    pub max_contention: f64,
    /// β must stay below this for "zero coordination".
    pub max_coordination: f64,
    /// Minimum R² before the model is trusted at all.
    pub min_r_squared: f64,
    /// Efficiency floor for "linear scaling".
    pub min_efficiency: f64,
    /// Highest concurrency level the assertions examine.
    pub max_n: u32,
}

impl Default for AssertionConfig {
    fn default() -> Self {
        Self {
            max_contention: 0.01,
            max_coordination: 0.01,
            min_r_squared: 0.95,
            min_efficiency: 0.95,
            max_n: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssertionError {
    #[error("contention too high: α = {alpha:.6} (max {max:.6})")]
    Contention { alpha: f64, max: f64 },

    #[error("coordination overhead too high: β = {beta:.6} (max {max:.6})")]
    Coordination { beta: f64, max: f64 },

    #[error("poor model fit: R² = {r_squared:.4} (min {min:.4})")]
    PoorFit { r_squared: f64, min: f64 },

    #[error("scaling not linear at N={n}: efficiency {efficiency:.3} (min {min:.3})")]
    NotLinear { n: u32, efficiency: f64, min: f64 },

    #[error("retrograde scaling from N={from} to N={to}: {before:.1} → {after:.1} ops/sec")]
    Retrograde {
        from: u32,
        to: u32,
        before: f64,
        after: f64,
    },

    #[error(transparent)]
    Fit(#[from] FitError),
}

fn fit_checked(
    results: &[LevelResult],
    cfg: &AssertionConfig,
) -> Result<UslCoefficients, AssertionError> {
    let coeffs = fit_usl(&to_samples(results))?;
    if coeffs.r_squared < cfg.min_r_squared {
        return Err(AssertionError::PoorFit {
            r_squared: coeffs.r_squared,
            min: cfg.min_r_squared,
        });
    }
    Ok(coeffs)
}

/// α below the contention bound: the workload is lock-free or close.
pub fn assert_zero_contention(
    results: &[LevelResult],
    cfg: &AssertionConfig,
) -> Result<(), AssertionError> {
    let coeffs = fit_checked(results, cfg)?;
    if coeffs.alpha > cfg.max_contention {
        return Err(AssertionError::Contention {
            alpha: coeffs.alpha,
            max: cfg.max_contention,
        });
    }
    Ok(())
}

/// β below the coordination bound: no meaningful crosstalk overhead.
pub fn assert_zero_coordination(
    results: &[LevelResult],
    cfg: &AssertionConfig,
) -> Result<(), AssertionError> {
    let coeffs = fit_checked(results, cfg)?;
    if coeffs.beta > cfg.max_coordination {
        return Err(AssertionError::Coordination {
            beta: coeffs.beta,
            max: cfg.max_coordination,
        });
    }
    Ok(())
}

/// Efficiency stays above the floor at every measured level up to
/// `max_n`: throughput grows essentially as λN.
pub fn assert_linear_scaling(
    results: &[LevelResult],
    cfg: &AssertionConfig,
) -> Result<(), AssertionError> {
    let coeffs = fit_checked(results, cfg)?;
    for r in results.iter().filter(|r| r.n <= cfg.max_n) {
        let efficiency = coeffs.efficiency(r.n);
        if efficiency < cfg.min_efficiency {
            return Err(AssertionError::NotLinear {
                n: r.n,
                efficiency,
                min: cfg.min_efficiency,
            });
        }
    }
    Ok(())
}

/// Predicted throughput never falls between consecutive measured
/// levels up to `max_n`.
pub fn assert_no_retrograde(
    results: &[LevelResult],
    cfg: &AssertionConfig,
) -> Result<(), AssertionError> {
    let coeffs = fit_checked(results, cfg)?;
    for pair in results.windows(2) {
        if pair[1].n > cfg.max_n {
            break;
        }
        let before = coeffs.predict(pair[0].n);
        let after = coeffs.predict(pair[1].n);
        if after < before {
            return Err(AssertionError::Retrograde {
                from: pair[0].n,
                to: pair[1].n,
                before,
                after,
            });
        }
    }
    Ok(())
}

/// All four scalability properties with the given thresholds.
pub fn assert_scalability(
    results: &[LevelResult],
    cfg: &AssertionConfig,
) -> Result<(), AssertionError> {
    assert_zero_contention(results, cfg)?;
    assert_zero_coordination(results, cfg)?;
    assert_linear_scaling(results, cfg)?;
    assert_no_retrograde(results, cfg)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Fabricate level results straight from a USL curve.
    fn synthetic_results(lambda: f64, alpha: f64, beta: f64, levels: &[u32]) -> Vec<LevelResult> {
        levels
            .iter()
            .map(|&n| {
                let nf = n as f64;
                let throughput =
                    (lambda * nf) / (1.0 + alpha * (nf - 1.0) + beta * nf * (nf - 1.0));
                LevelResult {
                    n,
                    duration: Duration::from_secs(1),
                    operations: throughput as u64,
                    throughput,
                    latencies: Vec::new(),
                    errors: 0,
                }
            })
            .collect()
    }

    #[test]
    fn clean_workload_passes_everything() {
        let results = synthetic_results(1000.0, 0.001, 0.0001, &[1, 2, 4, 8, 16]);
        assert_scalability(&results, &AssertionConfig::default()).unwrap();
    }

    #[test]
    fn contended_workload_fails_contention() {
        let results = synthetic_results(1000.0, 0.15, 0.0, &[1, 2, 4, 8, 16]);
        let err = assert_zero_contention(&results, &AssertionConfig::default()).unwrap_err();
        assert!(matches!(err, AssertionError::Contention { .. }));
    }

    #[test]
    fn coordinated_workload_fails_coordination() {
        let results = synthetic_results(1000.0, 0.001, 0.05, &[1, 2, 4, 8, 16]);
        let err = assert_zero_coordination(&results, &AssertionConfig::default()).unwrap_err();
        assert!(matches!(err, AssertionError::Coordination { .. }));
    }

    #[test]
    fn contention_degrades_linearity() {
        let results = synthetic_results(1000.0, 0.15, 0.0, &[1, 2, 4, 8, 16]);
        let err = assert_linear_scaling(&results, &AssertionConfig::default()).unwrap_err();
        assert!(matches!(err, AssertionError::NotLinear { .. }));
    }

    #[test]
    fn heavy_coherency_is_retrograde() {
        // Peak = √(0.9/0.05) ≈ 4.2: throughput falls from N=4 to N=8.
        let results = synthetic_results(1000.0, 0.1, 0.05, &[1, 2, 4, 8, 16]);
        let err = assert_no_retrograde(&results, &AssertionConfig::default()).unwrap_err();
        assert!(matches!(err, AssertionError::Retrograde { .. }));
    }

    #[test]
    fn insufficient_data_surfaces_fit_error() {
        let results = synthetic_results(1000.0, 0.0, 0.0, &[1, 2]);
        let err = assert_scalability(&results, &AssertionConfig::default()).unwrap_err();
        assert!(matches!(err, AssertionError::Fit(_)));
    }
}
