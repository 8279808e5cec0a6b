//! The hysteretic admission state machine.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scalegate_core::{CRITICALITY_SCALING_RATIO, FEIGENBAUM_DELTA, SystemIntegrityMetrics};

use crate::dynamics::RDynamics;

// Zone thresholds. Hard constants of the model, not configuration.
const WARNING_THRESHOLD: f64 = 2.8;
const DANGER_THRESHOLD: f64 = 2.9;
const SATURATION_THRESHOLD: f64 = 3.0;

// Hysteresis: once throttling, stay for at least a minute and until r
// has dropped well below the saturation boundary, not merely under it.
const THROTTLE_EXIT_THRESHOLD: f64 = 2.0;
const THROTTLE_MIN_DWELL_SECS: u64 = 60;

const MAX_RECOVERY_ITERATIONS: usize = 20;

/// What the governor decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// System healthy, no action.
    Stable,
    /// Approaching saturation; watch closely.
    Warning,
    /// Small correction: shed ~20% of traffic.
    Pacing,
    /// Emergency correction: shed 50-70% of traffic.
    Throttle,
    /// Reject the proposed change; it violates the ratio bound.
    BlockDeploy,
    /// Recovery failed; restarting is the only option left.
    Restart,
}

/// A decision together with its reasoning and the metrics it saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub reason: String,
    pub mitigation: String,
    /// The evaluated metrics with `estimated_coupling` filled in.
    pub metrics: SystemIntegrityMetrics,
    /// Unix timestamp (seconds) of the evaluation.
    pub timestamp: u64,
}

/// Operational counters exposed over the monitoring surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernorStatistics {
    pub current_r: f64,
    pub initial_r: f64,
    pub in_saturation: bool,
    pub warnings: u64,
    pub throttles: u64,
    pub blocked_deploys: u64,
    pub recovery_events: u64,
    pub history_len: usize,
}

/// Adaptive load controller driven by the coupling parameter.
///
/// The control loop on every evaluation: gate deployments against the
/// ratio bound, derive r from the offered metrics, then pick a zone,
/// with sticky throttling so the system cannot flap between admitting
/// and shedding.
pub struct Governor {
    dynamics: RDynamics,
    last_check: Instant,
    in_throttle_mode: bool,
    throttle_entered_at: Option<Instant>,
    warnings: u64,
    throttle_events: u64,
    deploys_blocked: u64,
}

impl Governor {
    /// Create a governor with the given starting r (1.5 is the
    /// conventional healthy default).
    pub fn new(initial_r: f64) -> Self {
        Self {
            dynamics: RDynamics::new(initial_r),
            last_check: Instant::now(),
            in_throttle_mode: false,
            throttle_entered_at: None,
            warnings: 0,
            throttle_events: 0,
            deploys_blocked: 0,
        }
    }

    /// The main decision function, called on every request completion,
    /// deployment proposal, or periodic check.
    ///
    /// Never fails: every input, however malformed, resolves to a
    /// concrete [`Action`].
    pub fn evaluate(&mut self, metrics: &SystemIntegrityMetrics) -> Action {
        self.evaluate_at(metrics, Instant::now())
    }

    /// Evaluation against an explicit monotonic instant. Split out so
    /// the dwell-time hysteresis is testable without sleeping.
    pub(crate) fn evaluate_at(&mut self, metrics: &SystemIntegrityMetrics, now: Instant) -> Action {
        // Phase I: deployment gate. Runs before any state is touched;
        // a blocked deploy is a verdict on the change, not a new
        // observation of the runtime.
        if metrics.is_deployment()
            && let Some(action) = self.gate_deployment(metrics)
        {
            return action;
        }

        // Phase II: derive r and update the dynamics.
        let r = metrics.coupling();
        self.dynamics.observe(r);

        let dt = now.duration_since(self.last_check).as_secs_f64();
        let velocity = if dt > 0.0 {
            (self.dynamics.current_r() - self.dynamics.previous_r()) / dt
        } else {
            0.0
        };
        self.last_check = now;

        // Phase III: hysteretic throttle exit. Both conditions must
        // hold: the minimum dwell has elapsed AND r has fallen below
        // the exit threshold. A dip below 3.0 alone changes nothing.
        if self.in_throttle_mode {
            let entered = self.throttle_entered_at.unwrap_or(now);
            let dwell = now.duration_since(entered);
            let dwell_met = dwell.as_secs() >= THROTTLE_MIN_DWELL_SECS;

            if dwell_met && r < THROTTLE_EXIT_THRESHOLD {
                self.in_throttle_mode = false;
                self.throttle_entered_at = None;
                debug!(r, dwell_secs = dwell.as_secs(), "throttle mode cleared");
                // Fall through to zone selection.
            } else {
                let remaining =
                    THROTTLE_MIN_DWELL_SECS.saturating_sub(dwell.as_secs());
                return Action {
                    kind: ActionKind::Throttle,
                    reason: format!(
                        "throttle hysteresis: r = {r:.4}, throttled for {}s; exit needs \
                         {}s more elapsed and r < {THROTTLE_EXIT_THRESHOLD:.1}",
                        dwell.as_secs(),
                        remaining,
                    ),
                    mitigation: "maintain 50-70% load shed until the system stabilizes"
                        .to_string(),
                    metrics: metrics.with_coupling(r),
                    timestamp: epoch_secs(),
                };
            }
        }

        // Phase IV: zone selection.
        if r >= SATURATION_THRESHOLD {
            self.in_throttle_mode = true;
            self.throttle_entered_at = Some(now);
            self.throttle_events += 1;

            let depth = r - SATURATION_THRESHOLD;
            warn!(r, depth, "saturation detected, entering throttle mode");

            return Action {
                kind: ActionKind::Throttle,
                reason: format!(
                    "saturation detected: r = {r:.4} ≥ {SATURATION_THRESHOLD:.1} \
                     (depth {depth:.4}); throughput will collapse if uncorrected. \
                     Estimated recovery: {} iterations",
                    estimate_recovery_iterations(depth),
                ),
                mitigation: format!(
                    "shed 50-70% of traffic immediately, apply recovery, and monitor \
                     r(t) until r < {SATURATION_THRESHOLD:.1}; restart if recovery \
                     fails after {MAX_RECOVERY_ITERATIONS} iterations"
                ),
                metrics: metrics.with_coupling(r),
                timestamp: epoch_secs(),
            };
        }

        if r >= DANGER_THRESHOLD {
            let margin = SATURATION_THRESHOLD - r;
            debug!(r, velocity, margin, "danger zone, pacing");
            return Action {
                kind: ActionKind::Pacing,
                reason: format!(
                    "r = {r:.4} approaching the saturation boundary (margin {margin:.4}, \
                     velocity {velocity:.6}/s)"
                ),
                mitigation: "shed ~20% of traffic and increase monitoring frequency"
                    .to_string(),
                metrics: metrics.with_coupling(r),
                timestamp: epoch_secs(),
            };
        }

        if r >= WARNING_THRESHOLD {
            self.warnings += 1;
            debug!(r, velocity, "warning zone");
            return Action {
                kind: ActionKind::Warning,
                reason: format!(
                    "r = {r:.4} above the optimal operating point \
                     ({WARNING_THRESHOLD:.1}); margin to saturation {:.4}",
                    SATURATION_THRESHOLD - r
                ),
                mitigation: "watch Δr/Δt, identify coupling sources, review recent \
                             deployments"
                    .to_string(),
                metrics: metrics.with_coupling(r),
                timestamp: epoch_secs(),
            };
        }

        Action {
            kind: ActionKind::Stable,
            reason: format!(
                "r = {r:.4}: stable equilibrium (velocity {velocity:.6}/s, margin {:.4})",
                SATURATION_THRESHOLD - r
            ),
            mitigation: "no action required".to_string(),
            metrics: metrics.with_coupling(r),
            timestamp: epoch_secs(),
        }
    }

    /// Check a deployment proposal against the ratio bound. `None`
    /// means the change passes and evaluation proceeds to the runtime
    /// zones.
    fn gate_deployment(&mut self, metrics: &SystemIntegrityMetrics) -> Option<Action> {
        let r = metrics.coupling();

        // No core work but positive complexity: the ratio is undefined
        // (∞) and the change is pure debt.
        if metrics.delta_critical_core == 0.0 && metrics.delta_complexity > 0.0 {
            self.deploys_blocked += 1;
            warn!(
                delta_complexity = metrics.delta_complexity,
                "deployment blocked: pure technical debt"
            );
            return Some(Action {
                kind: ActionKind::BlockDeploy,
                reason: format!(
                    "pure technical debt: ΔComplexity {:.0} against ΔCore 0, ratio \
                     undefined (∞); current r = {r:.4}",
                    metrics.delta_complexity,
                ),
                mitigation: "strengthen the critical core before adding extensible \
                             complexity"
                    .to_string(),
                metrics: metrics.with_coupling(r),
                timestamp: epoch_secs(),
            });
        }

        let ratio = metrics.delta_complexity / metrics.delta_critical_core;
        if ratio > FEIGENBAUM_DELTA {
            self.deploys_blocked += 1;
            warn!(
                ratio,
                limit = FEIGENBAUM_DELTA,
                "deployment blocked: complexity growth ratio over limit"
            );
            return Some(Action {
                kind: ActionKind::BlockDeploy,
                reason: format!(
                    "complexity growth ratio {ratio:.2} exceeds the limit \
                     {FEIGENBAUM_DELTA:.2} (ΔComplexity {:.0} / ΔCore {:.0}); \
                     current r = {r:.4}",
                    metrics.delta_complexity, metrics.delta_critical_core,
                ),
                mitigation: "refactor the critical core, reduce extensible complexity, \
                             or split the change into separate systems"
                    .to_string(),
                metrics: metrics.with_coupling(r),
                timestamp: epoch_secs(),
            });
        }

        None
    }

    /// Run the iterative recovery loop against the current r.
    ///
    /// Returns true iff r fell below the saturation threshold within
    /// the iteration cap. A false return means throttling cannot save
    /// the process; the caller should escalate to a restart.
    pub fn apply_recovery(&mut self, metrics: &SystemIntegrityMetrics) -> bool {
        let (final_r, iterations) = self
            .dynamics
            .recover_until_stable(metrics, MAX_RECOVERY_ITERATIONS);

        if final_r >= SATURATION_THRESHOLD {
            warn!(final_r, iterations, "recovery exhausted, restart required");
            return false;
        }

        debug!(final_r, iterations, "recovery complete");
        true
    }

    /// Operational counters for the monitoring surface.
    pub fn statistics(&self) -> GovernorStatistics {
        GovernorStatistics {
            current_r: self.dynamics.current_r(),
            initial_r: self.dynamics.initial_r(),
            in_saturation: self.dynamics.in_saturation(),
            warnings: self.warnings,
            throttles: self.throttle_events,
            blocked_deploys: self.deploys_blocked,
            recovery_events: self.dynamics.recovery_events(),
            history_len: self.dynamics.history_len(),
        }
    }

    /// Current coupling parameter.
    pub fn current_r(&self) -> f64 {
        self.dynamics.current_r()
    }
}

/// Iterations a recovery will need at the given saturation depth: each
/// pulse corrects at most 1/δ, at ~50% efficiency.
fn estimate_recovery_iterations(depth: f64) -> usize {
    let per_iteration = CRITICALITY_SCALING_RATIO * 0.5;
    ((depth / per_iteration) as usize).max(1)
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Metrics that produce an exact, chosen coupling value through the
    /// r-model (scaling_ratio left at zero keeps the arithmetic exact).
    fn metrics_for(
        mutable: u64,
        immutable: u64,
        unsupervised: u64,
        supervised: u64,
        scaling_ratio: f64,
    ) -> SystemIntegrityMetrics {
        SystemIntegrityMetrics {
            immutable_ops_verified: immutable,
            mutable_shared_state: mutable,
            supervised_processes: supervised,
            unsupervised_processes: unsupervised,
            scaling_ratio,
            ..Default::default()
        }
    }

    fn healthy() -> SystemIntegrityMetrics {
        // r = 1 + 0 + 0 + 0.20·δ ≈ 1.93.
        SystemIntegrityMetrics {
            immutable_ops_verified: 100,
            supervised_processes: 50,
            scaling_ratio: 0.20,
            ..Default::default()
        }
    }

    #[test]
    fn stable_zone() {
        let mut g = Governor::new(1.5);
        let action = g.evaluate(&healthy());
        assert_eq!(action.kind, ActionKind::Stable);
        assert!(action.metrics.estimated_coupling < 2.8);

        let stats = g.statistics();
        assert_eq!(stats.warnings, 0);
        assert_eq!(stats.throttles, 0);
        assert!(!stats.in_saturation);
    }

    #[test]
    fn warning_zone_counts() {
        let mut g = Governor::new(1.5);
        // r = 1 + 0.65 + 0.28 + 0.19·δ ≈ 2.817.
        let m = metrics_for(65, 100, 14, 50, 0.19);
        let action = g.evaluate(&m);
        assert_eq!(action.kind, ActionKind::Warning);
        assert_eq!(g.statistics().warnings, 1);
    }

    #[test]
    fn pacing_zone() {
        let mut g = Governor::new(1.5);
        // r = 1 + 0.68 + 0.32 + 0.21·δ ≈ 2.98.
        let m = metrics_for(68, 100, 16, 50, 0.21);
        let action = g.evaluate(&m);
        assert_eq!(action.kind, ActionKind::Pacing);
        assert!(action.mitigation.contains("20%"));
    }

    #[test]
    fn throttle_zone_enters_throttle_mode() {
        let mut g = Governor::new(1.5);
        // r = 1 + 0.5 + 0.4 + 0.30·δ ≈ 3.30.
        let m = metrics_for(50, 100, 20, 50, 0.30);
        let action = g.evaluate(&m);
        assert_eq!(action.kind, ActionKind::Throttle);
        assert!(action.mitigation.contains("50-70%"));

        let stats = g.statistics();
        assert_eq!(stats.throttles, 1);
        assert!(stats.in_saturation);
    }

    #[test]
    fn deploy_blocked_on_ratio() {
        let mut g = Governor::new(1.5);
        let mut m = healthy();
        m.delta_critical_core = 50.0;
        m.delta_complexity = 470.0; // ratio 9.4 > δ

        let action = g.evaluate(&m);
        assert_eq!(action.kind, ActionKind::BlockDeploy);
        assert!(action.reason.contains("9.40"));
        assert!(action.reason.contains("4.67"));
        assert_eq!(g.statistics().blocked_deploys, 1);
    }

    #[test]
    fn deploy_blocked_on_pure_debt() {
        let mut g = Governor::new(1.5);
        let mut m = healthy();
        m.delta_critical_core = 0.0;
        m.delta_complexity = 100.0;

        let action = g.evaluate(&m);
        assert_eq!(action.kind, ActionKind::BlockDeploy);
        assert!(action.reason.contains("∞") || action.reason.contains("undefined"));
    }

    #[test]
    fn deploy_within_ratio_falls_through_to_runtime() {
        let mut g = Governor::new(1.5);
        let mut m = healthy();
        m.delta_critical_core = 100.0;
        m.delta_complexity = 400.0; // ratio 4.0 < δ

        let action = g.evaluate(&m);
        assert_eq!(action.kind, ActionKind::Stable);
        assert_eq!(g.statistics().blocked_deploys, 0);
    }

    #[test]
    fn deploy_gate_runs_before_runtime_state() {
        let mut g = Governor::new(1.5);
        // Saturated runtime AND an in-violation deploy: the gate wins.
        let mut m = metrics_for(50, 100, 20, 50, 0.30);
        m.delta_critical_core = 10.0;
        m.delta_complexity = 470.0;

        let action = g.evaluate(&m);
        assert_eq!(action.kind, ActionKind::BlockDeploy);
        // The gate did not record a runtime observation.
        assert_eq!(g.statistics().throttles, 0);
    }

    #[test]
    fn hysteresis_keeps_throttle_sticky() {
        let mut g = Governor::new(2.0);
        let t0 = Instant::now();

        // r ≈ 3.30 → throttle entered.
        let saturated = metrics_for(50, 100, 20, 50, 0.30);
        assert_eq!(g.evaluate_at(&saturated, t0).kind, ActionKind::Throttle);

        // r = 2.7 ten seconds later: below saturation but above the
        // exit threshold, and the dwell has not elapsed → still
        // throttled.
        let easing = metrics_for(100, 100, 35, 50, 0.0);
        let action = g.evaluate_at(&easing, t0 + Duration::from_secs(10));
        assert_eq!(action.kind, ActionKind::Throttle);

        // r = 1.9 within the dwell: still throttled (both exit
        // conditions are required).
        let calm = metrics_for(45, 100, 45, 100, 0.0);
        let action = g.evaluate_at(&calm, t0 + Duration::from_secs(30));
        assert_eq!(action.kind, ActionKind::Throttle);

        // r = 1.9 after the dwell: exit and land in the stable zone.
        let action = g.evaluate_at(&calm, t0 + Duration::from_secs(61));
        assert_eq!(action.kind, ActionKind::Stable);
    }

    #[test]
    fn hysteresis_high_r_after_dwell_stays_throttled() {
        let mut g = Governor::new(2.0);
        let t0 = Instant::now();

        let saturated = metrics_for(50, 100, 20, 50, 0.30);
        g.evaluate_at(&saturated, t0);

        // Dwell elapsed but r = 2.7 ≥ exit threshold → still throttled.
        let easing = metrics_for(100, 100, 35, 50, 0.0);
        let action = g.evaluate_at(&easing, t0 + Duration::from_secs(120));
        assert_eq!(action.kind, ActionKind::Throttle);
    }

    #[test]
    fn throttle_not_recounted_while_sticky() {
        let mut g = Governor::new(2.0);
        let t0 = Instant::now();
        let saturated = metrics_for(50, 100, 20, 50, 0.30);

        g.evaluate_at(&saturated, t0);
        g.evaluate_at(&saturated, t0 + Duration::from_secs(5));
        g.evaluate_at(&saturated, t0 + Duration::from_secs(10));

        // Sticky evaluations return Throttle without re-entering.
        assert_eq!(g.statistics().throttles, 1);
    }

    #[test]
    fn recovery_succeeds_for_shallow_saturation() {
        let mut g = Governor::new(3.2);
        assert!(g.apply_recovery(&healthy()));
        assert!(g.current_r() < 3.0);
        assert!(g.statistics().recovery_events > 0);
    }

    #[test]
    fn recovery_fails_when_coupling_resists() {
        // Terrible isolation: correction factor ≈ 1/101, so each pulse
        // is far too small to cross back under 3.0 in 20 iterations.
        let mut g = Governor::new(3.9);
        let coupled = metrics_for(10_000, 100, 0, 1, 0.0);
        assert!(!g.apply_recovery(&coupled));
        assert!(g.current_r() >= 3.0);
    }

    #[test]
    fn recovery_noop_when_already_stable() {
        let mut g = Governor::new(2.0);
        assert!(g.apply_recovery(&healthy()));
        assert_eq!(g.statistics().recovery_events, 0);
    }

    #[test]
    fn statistics_history_grows_per_runtime_evaluation() {
        let mut g = Governor::new(1.5);
        let before = g.statistics().history_len;
        g.evaluate(&healthy());
        g.evaluate(&healthy());
        assert_eq!(g.statistics().history_len, before + 2);
    }

    #[test]
    fn never_panics_on_degenerate_metrics() {
        let mut g = Governor::new(1.5);
        let zeroed = SystemIntegrityMetrics::default();
        let action = g.evaluate(&zeroed);
        // All-zero counts: r = 1.0, stable.
        assert_eq!(action.kind, ActionKind::Stable);
        assert_eq!(action.metrics.estimated_coupling, 1.0);
    }
}
