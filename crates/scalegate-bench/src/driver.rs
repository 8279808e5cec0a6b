//! Concurrency-sweep execution.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use scalegate_usl::UslSample;

type BoxFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// The operation under test. Implementations should be stateless and
/// safe for concurrent execution; each call is timed individually.
pub type Operation = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

/// Controls a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Measurement window per concurrency level.
    pub duration: Duration,
    /// Untimed warmup before each measurement window.
    pub warmup: Duration,
    /// Concurrency levels to sweep.
    pub levels: Vec<u32>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            warmup: Duration::from_secs(1),
            levels: vec![1, 2, 4, 8, 16],
        }
    }
}

/// Measurements from one concurrency level.
#[derive(Debug, Clone)]
pub struct LevelResult {
    /// Number of concurrent workers.
    pub n: u32,
    /// Wall-clock duration of the measurement window.
    pub duration: Duration,
    /// Operations completed successfully.
    pub operations: u64,
    /// Completed operations per second.
    pub throughput: f64,
    /// Individual operation latencies, for percentile analysis.
    pub latencies: Vec<Duration>,
    /// Failed operations (not counted toward throughput).
    pub errors: u64,
}

impl LevelResult {
    /// Bridge to the USL fitter's input type.
    pub fn to_sample(&self) -> UslSample {
        UslSample::new(self.n, self.throughput)
    }
}

/// Convert a result set to fitter samples.
pub fn to_samples(results: &[LevelResult]) -> Vec<UslSample> {
    results.iter().map(LevelResult::to_sample).collect()
}

/// Run the operation at every configured concurrency level.
pub async fn run(op: Operation, cfg: &BenchConfig) -> Vec<LevelResult> {
    let mut results = Vec::with_capacity(cfg.levels.len());

    for &n in &cfg.levels {
        if !cfg.warmup.is_zero() {
            let _ = run_level(op.clone(), n, cfg.warmup).await;
        }
        let result = run_level(op.clone(), n, cfg.duration).await;
        info!(
            n,
            operations = result.operations,
            throughput = result.throughput,
            errors = result.errors,
            "level complete"
        );
        results.push(result);
    }

    results
}

/// Execute one measurement window with `n` concurrent workers.
///
/// Each worker loops the operation until the deadline, keeping its own
/// latency vector; the vectors are merged after join so the hot loop
/// shares nothing but the error counter.
async fn run_level(op: Operation, n: u32, duration: Duration) -> LevelResult {
    let errors = Arc::new(AtomicU64::new(0));
    let start = Instant::now();
    let deadline = start + duration;

    let mut handles = Vec::with_capacity(n as usize);
    for worker in 0..n {
        let op = op.clone();
        let errors = errors.clone();
        handles.push(tokio::spawn(async move {
            let mut latencies: Vec<Duration> = Vec::with_capacity(1024);
            while Instant::now() < deadline {
                let op_start = Instant::now();
                match op().await {
                    Ok(()) => latencies.push(op_start.elapsed()),
                    Err(e) => {
                        errors.fetch_add(1, Ordering::Relaxed);
                        debug!(worker, error = %e, "operation failed");
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for handle in handles {
        if let Ok(worker_latencies) = handle.await {
            all_latencies.extend(worker_latencies);
        }
    }

    let elapsed = start.elapsed();
    let operations = all_latencies.len() as u64;
    let throughput = operations as f64 / elapsed.as_secs_f64();

    LevelResult {
        n,
        duration: elapsed,
        operations,
        throughput,
        latencies: all_latencies,
        errors: errors.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_operation() -> Operation {
        Arc::new(|| Box::pin(async { Ok(()) }))
    }

    fn failing_operation() -> Operation {
        Arc::new(|| Box::pin(async { Err(anyhow::anyhow!("boom")) }))
    }

    fn fast_config(levels: &[u32]) -> BenchConfig {
        BenchConfig {
            duration: Duration::from_millis(50),
            warmup: Duration::ZERO,
            levels: levels.to_vec(),
        }
    }

    #[tokio::test]
    async fn sweep_covers_all_levels() {
        let results = run(noop_operation(), &fast_config(&[1, 2, 4])).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].n, 1);
        assert_eq!(results[2].n, 4);
        for r in &results {
            assert!(r.operations > 0);
            assert!(r.throughput > 0.0);
            assert_eq!(r.errors, 0);
            assert_eq!(r.operations as usize, r.latencies.len());
        }
    }

    #[tokio::test]
    async fn errors_are_counted_not_measured() {
        let results = run(failing_operation(), &fast_config(&[2])).await;
        let r = &results[0];
        assert!(r.errors > 0);
        assert_eq!(r.operations, 0);
        assert_eq!(r.throughput, 0.0);
        assert!(r.latencies.is_empty());
    }

    #[tokio::test]
    async fn samples_bridge_to_fitter() {
        let results = run(noop_operation(), &fast_config(&[1, 2, 4])).await;
        let samples = to_samples(&results);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].n, 2);
        assert!(samples[1].throughput > 0.0);
    }
}
