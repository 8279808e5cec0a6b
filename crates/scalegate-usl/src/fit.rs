//! Linearized least-squares fit of the USL.
//!
//! The USL rearranges into a form that is linear in its transformed
//! coefficients:
//!
//! ```text
//! N/C(N) = b₀ + b₁(N−1) + b₂N(N−1)
//! λ = 1/b₀,  α = b₁/b₀,  β = b₂/b₀
//! ```
//!
//! The 3×3 normal equations are solved by Cramer's rule. R² is computed
//! against the *original* throughput data using the USL formula, not
//! the linearized residuals, so it reports fit quality where it counts.

use thiserror::Error;

use crate::sample::{UslCoefficients, UslSample, usl_model};

/// Determinants smaller than this mean the design matrix carries no
/// usable signal (e.g. all samples at one concurrency level).
const DEGENERATE_DET: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("need at least 3 samples, got {0}")]
    InsufficientSamples(usize),
}

/// Accumulated sums of the linearized design matrix.
#[derive(Default)]
struct Accumulator {
    count: f64,
    sum_y: f64,
    sum_x1: f64,
    sum_x2: f64,
    sum_x1x1: f64,
    sum_x2x2: f64,
    sum_x1x2: f64,
    sum_yx1: f64,
    sum_yx2: f64,
}

impl Accumulator {
    fn push(&mut self, sample: &UslSample) {
        // Zero or negative throughput cannot be linearized (N/C blows
        // up); malformed samples are skipped silently.
        if sample.throughput <= 0.0 {
            return;
        }
        let n = sample.n as f64;
        let y = n / sample.throughput;
        let x1 = n - 1.0;
        let x2 = n * (n - 1.0);

        self.count += 1.0;
        self.sum_y += y;
        self.sum_x1 += x1;
        self.sum_x2 += x2;
        self.sum_x1x1 += x1 * x1;
        self.sum_x2x2 += x2 * x2;
        self.sum_x1x2 += x1 * x2;
        self.sum_yx1 += y * x1;
        self.sum_yx2 += y * x2;
    }
}

/// Fit USL coefficients to (N, throughput) samples.
///
/// Requires at least 3 samples. A degenerate design matrix does not
/// error: it yields the sentinel fit (λ = first throughput, α = 0.01,
/// β = 0, R² = 0), which callers read as "model not informative".
///
/// A negative fitted β with positive α is a linearization artifact on
/// noisy data; left alone it would predict superlinear scaling
/// forever. In that case the fit is redone with the 2-parameter model
/// (β ≡ 0) and β clamped to zero; R² is then recomputed from the final
/// coefficients.
pub fn fit_usl(samples: &[UslSample]) -> Result<UslCoefficients, FitError> {
    if samples.len() < 3 {
        return Err(FitError::InsufficientSamples(samples.len()));
    }

    let mut acc = Accumulator::default();
    for s in samples {
        acc.push(s);
    }

    // 3×3 normal equations:
    // [count    sum_x1   sum_x2 ] [b0]   [sum_y  ]
    // [sum_x1   sum_x1x1 sum_x1x2] [b1] = [sum_yx1]
    // [sum_x2   sum_x1x2 sum_x2x2] [b2]   [sum_yx2]
    let det = acc.count * (acc.sum_x1x1 * acc.sum_x2x2 - acc.sum_x1x2 * acc.sum_x1x2)
        - acc.sum_x1 * (acc.sum_x1 * acc.sum_x2x2 - acc.sum_x1x2 * acc.sum_x2)
        + acc.sum_x2 * (acc.sum_x1 * acc.sum_x1x2 - acc.sum_x1x1 * acc.sum_x2);

    if det.abs() < DEGENERATE_DET {
        return Ok(UslCoefficients {
            lambda: samples[0].throughput,
            alpha: 0.01,
            beta: 0.0,
            r_squared: 0.0,
        });
    }

    let det0 = acc.sum_y * (acc.sum_x1x1 * acc.sum_x2x2 - acc.sum_x1x2 * acc.sum_x1x2)
        - acc.sum_x1 * (acc.sum_yx1 * acc.sum_x2x2 - acc.sum_x1x2 * acc.sum_yx2)
        + acc.sum_x2 * (acc.sum_yx1 * acc.sum_x1x2 - acc.sum_x1x1 * acc.sum_yx2);

    let det1 = acc.count * (acc.sum_yx1 * acc.sum_x2x2 - acc.sum_x1x2 * acc.sum_yx2)
        - acc.sum_y * (acc.sum_x1 * acc.sum_x2x2 - acc.sum_x1x2 * acc.sum_x2)
        + acc.sum_x2 * (acc.sum_x1 * acc.sum_yx2 - acc.sum_yx1 * acc.sum_x2);

    let det2 = acc.count * (acc.sum_x1x1 * acc.sum_yx2 - acc.sum_yx1 * acc.sum_x1x2)
        - acc.sum_x1 * (acc.sum_x1 * acc.sum_yx2 - acc.sum_yx1 * acc.sum_x2)
        + acc.sum_y * (acc.sum_x1 * acc.sum_x1x2 - acc.sum_x1x1 * acc.sum_x2);

    let b0 = det0 / det;
    let b1 = det1 / det;
    let b2 = det2 / det;

    let mut lambda = 1.0 / b0;
    let mut alpha = b1 / b0;
    let mut beta = b2 / b0;

    if beta < 0.0 && alpha > 0.0 {
        if let Some((l2, a2)) = fit_two_parameter(&acc) {
            lambda = l2;
            alpha = a2;
            beta = 0.0;
        }
    }

    let r_squared = r_squared(samples, lambda, alpha, beta);

    Ok(UslCoefficients {
        lambda,
        alpha,
        beta,
        r_squared,
    })
}

/// Contention-only refit: Y = b₀ + b₁(N−1), β ≡ 0.
fn fit_two_parameter(acc: &Accumulator) -> Option<(f64, f64)> {
    let det = acc.count * acc.sum_x1x1 - acc.sum_x1 * acc.sum_x1;
    if det.abs() < DEGENERATE_DET {
        return None;
    }
    let b0 = (acc.sum_x1x1 * acc.sum_y - acc.sum_x1 * acc.sum_yx1) / det;
    let b1 = (acc.count * acc.sum_yx1 - acc.sum_x1 * acc.sum_y) / det;
    Some((1.0 / b0, b1 / b0))
}

/// R² of the final coefficients against the valid (C > 0) samples.
fn r_squared(samples: &[UslSample], lambda: f64, alpha: f64, beta: f64) -> f64 {
    let valid: Vec<&UslSample> = samples.iter().filter(|s| s.throughput > 0.0).collect();
    if valid.is_empty() {
        return 0.0;
    }

    let mean: f64 = valid.iter().map(|s| s.throughput).sum::<f64>() / valid.len() as f64;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for s in &valid {
        let predicted = usl_model(s.n as f64, lambda, alpha, beta);
        ss_res += (s.throughput - predicted) * (s.throughput - predicted);
        ss_tot += (s.throughput - mean) * (s.throughput - mean);
    }

    if ss_tot == 0.0 {
        // All throughputs identical: either the model reproduces them
        // (perfect) or it cannot explain a flat line at all.
        return if ss_res < 1e-12 { 1.0 } else { 0.0 };
    }

    1.0 - ss_res / ss_tot
}
