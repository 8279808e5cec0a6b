//! Period-doubling diagnostics for iterated maps.
//!
//! Off the request path entirely: this module exists to explore how a
//! feedback system x_{n+1} = f(x_n, r) destabilizes as its control
//! parameter grows, and to confirm numerically that the doubling
//! cascade contracts at δ. The admission thresholds elsewhere in the
//! workspace assume that universality; this is where it can be checked.

use tracing::debug;

/// A bifurcation point: the control parameter where the attractor's
/// period doubled.
#[derive(Debug, Clone, PartialEq)]
pub struct BifurcationPoint {
    /// Control parameter at which the new period was first seen.
    pub r: f64,
    /// Attractor period (1, 2, 4, 8, ...).
    pub period: usize,
    /// Oscillation amplitude (max − min of the attractor).
    pub amplitude: f64,
}

/// Result of a cascade sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeAnalysis {
    /// Detected period-doubling points, in sweep order.
    pub bifurcations: Vec<BifurcationPoint>,
    /// Estimated δ from consecutive bifurcation intervals, when at
    /// least three doublings were seen.
    pub delta: Option<f64>,
    /// First control parameter with no detectable period after the
    /// cascade (onset of chaos), if reached.
    pub chaos_onset: Option<f64>,
}

/// Sweep configuration.
#[derive(Debug, Clone)]
pub struct BifurcationConfig {
    pub min_r: f64,
    pub max_r: f64,
    pub step_r: f64,
    /// Attractor samples recorded per r value.
    pub iterations: usize,
    /// Transient iterations discarded before recording.
    pub warmup: usize,
    /// Period-detection tolerance on |x_i − x_{i+p}|.
    pub tolerance: f64,
    /// Largest period to test (powers of two only).
    pub max_period: usize,
}

impl Default for BifurcationConfig {
    fn default() -> Self {
        Self {
            min_r: 2.5,
            max_r: 4.0,
            step_r: 0.01,
            iterations: 1000,
            warmup: 2000,
            tolerance: 1e-4,
            max_period: 128,
        }
    }
}

/// The canonical example: x_{n+1} = r·x·(1−x). Period doubling starts
/// at r = 3.0 and the cascade accumulates at r ≈ 3.5699.
pub fn logistic_map(x: f64, r: f64) -> f64 {
    r * x * (1.0 - x)
}

/// Iterate the map, discard the transient, and return the attractor
/// trajectory.
pub fn iterate_map<F>(f: F, x0: f64, r: f64, warmup: usize, iterations: usize) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64,
{
    let mut x = x0;
    for _ in 0..warmup {
        x = f(x, r);
    }
    let mut trajectory = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        x = f(x, r);
        trajectory.push(x);
    }
    trajectory
}

/// Detect the attractor's period, testing powers of two up to the cap.
/// `None` means no period within the cap: chaotic, or not settled.
pub fn detect_period(trajectory: &[f64], tolerance: f64, max_period: usize) -> Option<usize> {
    if trajectory.len() < 2 * max_period {
        return None;
    }

    let mut period = 1;
    while period <= max_period {
        let repeats = trajectory[..trajectory.len() - period]
            .iter()
            .zip(&trajectory[period..])
            .all(|(a, b)| (a - b).abs() <= tolerance);
        if repeats {
            return Some(period);
        }
        period *= 2;
    }
    None
}

/// Oscillation amplitude: max − min over the trajectory.
pub fn amplitude(trajectory: &[f64]) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &x in trajectory {
        min = min.min(x);
        max = max.max(x);
    }
    if min > max { 0.0 } else { max - min }
}

/// Sweep the control parameter and collect the period-doubling cascade.
///
/// δ is estimated as the mean of (r_{n+1} − r_n)/(r_{n+2} − r_{n+1})
/// over consecutive bifurcation triplets; with a coarse step the
/// estimate is rough, but it converges on 4.669 as the step shrinks.
pub fn analyze_cascade<F>(f: F, x0: f64, cfg: &BifurcationConfig) -> CascadeAnalysis
where
    F: Fn(f64, f64) -> f64,
{
    let mut bifurcations: Vec<BifurcationPoint> = Vec::new();
    let mut chaos_onset = None;
    let mut previous_period: Option<usize> = None;

    let mut r = cfg.min_r;
    while r <= cfg.max_r {
        let trajectory = iterate_map(&f, x0, r, cfg.warmup, cfg.iterations);
        let period = detect_period(&trajectory, cfg.tolerance, cfg.max_period);

        match (previous_period, period) {
            (Some(prev), Some(p)) if p == prev * 2 => {
                debug!(r, period = p, "period doubled");
                bifurcations.push(BifurcationPoint {
                    r,
                    period: p,
                    amplitude: amplitude(&trajectory),
                });
            }
            (Some(_), None) if chaos_onset.is_none() && bifurcations.len() >= 2 => {
                chaos_onset = Some(r);
            }
            _ => {}
        }

        if period.is_some() {
            previous_period = period;
        }
        r += cfg.step_r;
    }

    let delta = estimate_delta(&bifurcations);

    CascadeAnalysis {
        bifurcations,
        delta,
        chaos_onset,
    }
}

fn estimate_delta(bifurcations: &[BifurcationPoint]) -> Option<f64> {
    if bifurcations.len() < 3 {
        return None;
    }

    let mut ratios = Vec::new();
    for window in bifurcations.windows(3) {
        let denominator = window[2].r - window[1].r;
        if denominator.abs() > 1e-10 {
            let ratio = (window[1].r - window[0].r) / denominator;
            if ratio > 0.0 && ratio < 100.0 {
                ratios.push(ratio);
            }
        }
    }

    if ratios.is_empty() {
        return None;
    }
    Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
}
