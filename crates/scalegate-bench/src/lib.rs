//! scalegate-bench — the load-test driver that feeds the USL fitter.
//!
//! Traditional benchmarks answer "fast or slow". This driver answers
//! "does it scale": it runs an operation at several concurrency levels,
//! measures throughput at each, and hands the samples to
//! `scalegate-usl` to recover (λ, α, β). The assertion helpers turn
//! those coefficients into pass/fail scalability properties a test can
//! demand: zero contention, zero coordination, linear scaling, no
//! retrograde.
//!
//! Worker count versus available parallelism matters: with more
//! workers than cores you measure scheduler context switching, not
//! application contention. Keep the top concurrency level at or below
//! the host's core count for honest α.

pub mod assertions;
pub mod bifurcation;
pub mod driver;
pub mod stats;

pub use assertions::{AssertionConfig, AssertionError, assert_scalability};
pub use driver::{BenchConfig, LevelResult, Operation, run, to_samples};
pub use stats::LatencyStatistics;
