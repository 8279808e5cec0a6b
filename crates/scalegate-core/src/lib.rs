//! scalegate-core — shared constants, value types, and the coupling model.
//!
//! Everything in this crate is a leaf: the fitter, tracker, autoscaler,
//! governor, and host wiring all depend on it, and it depends on nothing
//! but serde. The constants here are physical, not tunable; see
//! [`constants`] for why δ carries exactly four decimals.

pub mod constants;
pub mod criticality;
pub mod metrics;
pub mod registry;

pub use constants::{
    CRITICALITY_SCALING_RATIO, FEIGENBAUM_DELTA, STABLE_COUPLING_MAX, STABLE_COUPLING_MIN,
    in_stable_range,
};
pub use criticality::{CriticalityConstraint, RatioViolation, check_deployment_ratio};
pub use metrics::SystemIntegrityMetrics;
pub use registry::{Registry, RegistryError, VerifiedType};
