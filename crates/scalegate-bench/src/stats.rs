//! Latency statistics over a measurement window.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::LevelResult;

/// Percentile latency summary for one concurrency level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStatistics {
    pub mean: Duration,
    pub stddev: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl LatencyStatistics {
    /// Summarize a level's latencies. All-zero when no operations
    /// completed.
    pub fn from_result(result: &LevelResult) -> Self {
        Self::from_latencies(&result.latencies)
    }

    pub fn from_latencies(latencies: &[Duration]) -> Self {
        if latencies.is_empty() {
            return Self {
                mean: Duration::ZERO,
                stddev: Duration::ZERO,
                p50: Duration::ZERO,
                p95: Duration::ZERO,
                p99: Duration::ZERO,
            };
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_unstable();

        let sum: Duration = sorted.iter().sum();
        let mean = sum / sorted.len() as u32;

        let mean_secs = mean.as_secs_f64();
        let variance = sorted
            .iter()
            .map(|d| {
                let diff = d.as_secs_f64() - mean_secs;
                diff * diff
            })
            .sum::<f64>()
            / sorted.len() as f64;
        let stddev = Duration::from_secs_f64(variance.sqrt());

        let len = sorted.len();
        let pick = |fraction: usize| sorted[(len * fraction / 100).min(len - 1)];

        Self {
            mean,
            stddev,
            p50: pick(50),
            p95: pick(95),
            p99: pick(99),
        }
    }
}
