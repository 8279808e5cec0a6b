//! Deployment constraint checking against the Feigenbaum ratio bound.
//!
//! The bound has two equivalent readings and the workspace uses both:
//! as "features per unit of core" the limit is δ ≈ 4.6692 (the
//! governor's deploy gate compares ΔComplexity/ΔCore > δ), and as
//! "core change per feature unit" the limit is 1/δ ≈ 0.2142 (the
//! scaling-penalty model divides a ratio by 1/δ). Keep the expressions
//! as written; they are not interchangeable under rounding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{CRITICALITY_SCALING_RATIO, FEIGENBAUM_DELTA};

/// A deployment whose complexity growth exceeds the ratio bound.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("complexity growth ratio {ratio:.2} exceeds limit {limit:.2}")]
pub struct RatioViolation {
    /// Observed ΔComplexity / ΔCore. Infinite when ΔCore is zero.
    pub ratio: f64,
    /// The bound, always δ.
    pub limit: f64,
}

/// Check a proposed deployment's complexity-to-core ratio against δ.
///
/// A change with no core work but positive complexity is pure debt: the
/// ratio is infinite and the check fails unconditionally.
pub fn check_deployment_ratio(
    delta_complexity: f64,
    delta_critical_core: f64,
) -> Result<(), RatioViolation> {
    let ratio = if delta_critical_core == 0.0 {
        f64::INFINITY
    } else {
        delta_complexity / delta_critical_core
    };

    if ratio > FEIGENBAUM_DELTA {
        return Err(RatioViolation {
            ratio,
            limit: FEIGENBAUM_DELTA,
        });
    }
    Ok(())
}

/// Deployment deltas with derived constraint queries.
///
/// The free function [`check_deployment_ratio`] is the hot-path form;
/// this struct exists for callers that want to reason about a change
/// before proposing it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalityConstraint {
    /// Change in extensible layers (lines, dependencies).
    pub delta_complexity: f64,
    /// Change in the critical core (lines, API surface).
    pub delta_critical_core: f64,
}

impl CriticalityConstraint {
    pub fn new(delta_complexity: f64, delta_critical_core: f64) -> Self {
        Self {
            delta_complexity,
            delta_critical_core,
        }
    }

    /// ΔComplexity / ΔCore; +∞ when the core delta is zero.
    pub fn ratio(&self) -> f64 {
        if self.delta_critical_core == 0.0 {
            return f64::INFINITY;
        }
        self.delta_complexity / self.delta_critical_core
    }

    /// Validate against the δ bound.
    pub fn validate(&self) -> Result<(), RatioViolation> {
        check_deployment_ratio(self.delta_complexity, self.delta_critical_core)
    }

    /// Complexity budget remaining before the δ bound is hit.
    /// Negative when the change is already in violation.
    pub fn headroom(&self) -> f64 {
        self.delta_critical_core * FEIGENBAUM_DELTA - self.delta_complexity
    }

    /// True when a standing scaling ratio respects the inverse bound
    /// 1/δ, the framing used by the coupling model's scaling penalty.
    pub fn scaling_ratio_within_bound(ratio: f64) -> bool {
        ratio <= CRITICALITY_SCALING_RATIO
    }
}
