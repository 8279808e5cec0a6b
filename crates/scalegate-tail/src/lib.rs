//! scalegate-tail — tail-divergence tracking over a latency ring buffer.
//!
//! Stable systems have Gaussian-ish latency: P99 sits within a small
//! multiple of P50 and the mean is meaningful. Saturated systems shift
//! to power-law tails where outliers dominate every average. The ratio
//! P99/P50 is the signature of that shift, and [`TailTracker`] turns it
//! into an r-estimate the governor can consume.

pub mod tracker;

pub use tracker::{TailStats, TailTracker};
