//! Runtime integrity metrics and the coupling model.
//!
//! `SystemIntegrityMetrics` is the input bundle every governor
//! evaluation consumes. Callers fill the raw counts and deltas;
//! `estimated_coupling` is derived by the governor and carried along so
//! action snapshots are self-describing.

use serde::{Deserialize, Serialize};

use crate::constants::CRITICALITY_SCALING_RATIO;

/// Snapshot of the runtime signals the coupling model reads.
///
/// All counts are non-negative; zero deltas mean "no deployment event".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemIntegrityMetrics {
    /// Operations proven immutable (isolation compliance).
    pub immutable_ops_verified: u64,
    /// Shared mutable state violations detected.
    pub mutable_shared_state: u64,
    /// Processes under a supervision tree.
    pub supervised_processes: u64,
    /// Processes running without supervision.
    pub unsupervised_processes: u64,
    /// Extensible-to-core complexity ratio of a hypothetical change.
    pub scaling_ratio: f64,
    /// Core change of a proposed deployment (zero = no deployment).
    pub delta_critical_core: f64,
    /// Extensible-layer change of a proposed deployment.
    pub delta_complexity: f64,
    /// Coupling parameter derived by the governor, not by the caller.
    pub estimated_coupling: f64,
}

impl SystemIntegrityMetrics {
    /// Derive the coupling parameter r from the raw signals.
    ///
    /// ```text
    /// isolation_penalty   = mutable_shared_state / max(immutable_ops_verified, 1)
    /// supervision_penalty = unsupervised_processes / max(supervised_processes, 1)
    /// scaling_penalty     = scaling_ratio / (1/δ)
    /// r                   = 1.0 + isolation + supervision + scaling
    /// ```
    ///
    /// Each penalty contributes up to ~1.0 in a badly coupled system, so
    /// the worst case sits around r ≈ 4.0. The expressions are pinned:
    /// zone-transition tests depend on reproducing them bit for bit.
    pub fn coupling(&self) -> f64 {
        let isolation_penalty =
            self.mutable_shared_state as f64 / self.immutable_ops_verified.max(1) as f64;
        let supervision_penalty =
            self.unsupervised_processes as f64 / self.supervised_processes.max(1) as f64;
        let scaling_penalty = self.scaling_ratio / CRITICALITY_SCALING_RATIO;

        1.0 + isolation_penalty + supervision_penalty + scaling_penalty
    }

    /// True when the metrics describe a deployment proposal rather than
    /// a pure runtime observation.
    pub fn is_deployment(&self) -> bool {
        self.delta_critical_core > 0.0 || self.delta_complexity > 0.0
    }

    /// Copy of these metrics with the derived coupling filled in.
    pub fn with_coupling(&self, r: f64) -> Self {
        let mut snapshot = self.clone();
        snapshot.estimated_coupling = r;
        snapshot
    }
}
