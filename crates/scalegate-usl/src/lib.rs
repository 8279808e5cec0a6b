//! scalegate-usl — Universal Scalability Law fitting and capacity queries.
//!
//! The USL models throughput at concurrency N as
//!
//! ```text
//! C(N) = λN / (1 + α(N−1) + βN(N−1))
//! ```
//!
//! where λ is serial throughput, α the contention coefficient, and β
//! the coherency coefficient. [`fit_usl`] regresses (N, C) samples into
//! coefficients; [`peak_capacity`] and [`is_retrograde`] answer the
//! question an autoscaler actually cares about: whether adding workers
//! still buys throughput.

pub mod fit;
pub mod sample;

pub use fit::{FitError, fit_usl};
pub use sample::{UslCoefficients, UslSample, is_retrograde, peak_capacity};
