//! Ring-buffered latency tracker and derived tail statistics.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Buffer size used when a caller asks for zero capacity.
const DEFAULT_CAPACITY: usize = 1000;

/// Derived view over the tracker's live region.
///
/// Recomputed on demand from one consistent snapshot; nothing here is
/// stored canonically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailStats {
    /// Total samples ever recorded (monotonic, not windowed).
    pub sample_count: u64,
    /// Arithmetic mean over the live region. Unreliable under
    /// power-law tails; prefer the percentiles.
    pub mean: Duration,
    pub p50: Duration,
    pub p99: Duration,
    pub p999: Duration,
    /// P99/P50, the headline statistic.
    pub tail_ratio: f64,
    /// Pareto α estimated from the quantile ratio.
    pub pareto_index: f64,
    /// Coupling parameter estimated from the tail ratio.
    pub estimated_r: f64,
    /// tail_ratio < 3: outliers do not dominate.
    pub is_gaussian: bool,
    /// tail_ratio > 10: the tail owns the distribution.
    pub is_power_law: bool,
}

struct Ring {
    samples: Vec<Duration>,
    write_index: usize,
    total: u64,
}

impl Ring {
    fn live(&self) -> &[Duration] {
        let effective = (self.total as usize).min(self.samples.len());
        &self.samples[..effective]
    }
}

/// Bounded-memory percentile estimator over recent latencies.
///
/// The window slides by insertion count, not wall time: with capacity M
/// the live region is always the last min(total, M) samples. Writes are
/// O(1) ring overwrites under a mutex; percentile queries copy the live
/// region under the lock and sort the copy outside it, so writers are
/// never blocked behind a sort.
pub struct TailTracker {
    inner: Mutex<Ring>,
}

impl TailTracker {
    /// Create a tracker with a fixed ring capacity. Zero selects the
    /// default of 1000.
    ///
    /// Larger buffers smooth out noise but delay saturation detection;
    /// 1000 suits medium traffic, 100 low, 10000 high.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        Self {
            inner: Mutex::new(Ring {
                samples: vec![Duration::ZERO; capacity],
                write_index: 0,
                total: 0,
            }),
        }
    }

    fn ring(&self) -> MutexGuard<'_, Ring> {
        self.inner.lock().expect("latency ring lock poisoned")
    }

    /// Record one latency sample. O(1).
    pub fn record(&self, latency: Duration) {
        let mut ring = self.ring();
        let idx = ring.write_index;
        ring.samples[idx] = latency;
        ring.write_index = (idx + 1) % ring.samples.len();
        ring.total += 1;
    }

    /// Ring capacity M.
    pub fn capacity(&self) -> usize {
        self.ring().samples.len()
    }

    /// Total samples recorded since construction.
    pub fn sample_count(&self) -> u64 {
        self.ring().total
    }

    /// Consistent snapshot of the live region, sorted ascending.
    fn sorted_live(&self) -> Vec<Duration> {
        let mut snapshot = {
            let ring = self.ring();
            ring.live().to_vec()
        };
        snapshot.sort_unstable();
        snapshot
    }

    /// The p-th percentile (p in [0, 1]) of the live region.
    /// Zero when no samples have been recorded.
    pub fn percentile(&self, p: f64) -> Duration {
        percentile_of(&self.sorted_live(), p)
    }

    pub fn p50(&self) -> Duration {
        self.percentile(0.50)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(0.99)
    }

    pub fn p999(&self) -> Duration {
        self.percentile(0.999)
    }

    /// Arithmetic mean of the live region; zero when empty.
    ///
    /// Under a power-law tail the mean is dominated by outliers;
    /// check [`TailStats::is_power_law`] before trusting it.
    pub fn mean(&self) -> Duration {
        let ring = self.ring();
        let live = ring.live();
        if live.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = live.iter().sum();
        sum / live.len() as u32
    }

    /// P99/P50. Returns 1 when P50 is zero (not enough signal).
    pub fn tail_ratio(&self) -> f64 {
        let sorted = self.sorted_live();
        ratio_of(&sorted)
    }

    /// Pareto α estimated from the quantile ratio:
    /// α = ln(0.99/0.50) / ln(P99/P50). Zero when the denominator is
    /// non-positive.
    pub fn pareto_index(&self) -> f64 {
        let sorted = self.sorted_live();
        pareto_of(&sorted)
    }

    /// Coupling parameter estimated from the tail ratio.
    pub fn estimate_r(&self) -> f64 {
        estimate_r_from_ratio(self.tail_ratio())
    }

    /// True when the distribution still looks Gaussian (ratio < 3).
    pub fn is_gaussian(&self) -> bool {
        self.tail_ratio() < 3.0
    }

    /// True when the distribution looks like a power law (ratio > 10).
    pub fn is_power_law(&self) -> bool {
        self.tail_ratio() > 10.0
    }

    /// Full statistical snapshot, computed from one consistent copy of
    /// the live region.
    pub fn stats(&self) -> TailStats {
        let (total, sorted) = {
            let ring = self.ring();
            (ring.total, ring.live().to_vec())
        };
        let mut sorted = sorted;
        sorted.sort_unstable();

        let mean = if sorted.is_empty() {
            Duration::ZERO
        } else {
            sorted.iter().sum::<Duration>() / sorted.len() as u32
        };
        let tail_ratio = ratio_of(&sorted);

        TailStats {
            sample_count: total,
            mean,
            p50: percentile_of(&sorted, 0.50),
            p99: percentile_of(&sorted, 0.99),
            p999: percentile_of(&sorted, 0.999),
            tail_ratio,
            pareto_index: pareto_of(&sorted),
            estimated_r: estimate_r_from_ratio(tail_ratio),
            is_gaussian: tail_ratio < 3.0,
            is_power_law: tail_ratio > 10.0,
        }
    }
}

impl Default for TailTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn percentile_of(sorted: &[Duration], p: f64) -> Duration {
    let k = sorted.len();
    if k == 0 {
        return Duration::ZERO;
    }
    let index = ((k - 1) as f64 * p) as usize;
    sorted[index.min(k - 1)]
}

fn ratio_of(sorted: &[Duration]) -> f64 {
    let p50 = percentile_of(sorted, 0.50);
    let p99 = percentile_of(sorted, 0.99);
    if p50.is_zero() {
        return 1.0;
    }
    p99.as_secs_f64() / p50.as_secs_f64()
}

fn pareto_of(sorted: &[Duration]) -> f64 {
    let p50 = percentile_of(sorted, 0.50);
    let p99 = percentile_of(sorted, 0.99);
    if p50.is_zero() || p99.is_zero() {
        return 0.0;
    }
    let ratio = p99.as_secs_f64() / p50.as_secs_f64();
    if ratio <= 1.0 {
        return 0.0;
    }
    (0.99f64 / 0.50).ln() / ratio.ln()
}

/// Piecewise-linear map from tail ratio to an r-estimate.
///
/// Continuous at the 3/10/100 seams by construction; the expressions
/// are pinned and must not be "simplified".
fn estimate_r_from_ratio(ratio: f64) -> f64 {
    if ratio < 3.0 {
        1.5 + (ratio / 3.0) * 0.5
    } else if ratio < 10.0 {
        2.0 + ((ratio - 3.0) / 7.0) * 1.0
    } else if ratio < 100.0 {
        3.0 + ((ratio - 10.0) / 90.0) * 1.0
    } else {
        4.0 + ((ratio - 100.0) / 100.0).min(1.0)
    }
}
