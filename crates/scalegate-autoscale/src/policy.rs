//! The scaling decision table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use scalegate_usl::peak_capacity;

/// Target r used when the caller leaves `target_r` at zero.
const DEFAULT_TARGET_R: f64 = 2.0;

/// Fraction of peak capacity treated as the safe ceiling.
const PEAK_SAFETY_MARGIN: f64 = 0.8;

/// The autoscaler's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScalingDecision {
    /// r < 1.5: fleet is bored, reclaim cost.
    ScaleDown,
    /// 1.5 ≤ r < 2.5: the optimal pocket, do nothing.
    Maintain,
    /// Stress with headroom: add capacity toward the target r.
    ScaleUp,
    /// Saturation or retrograde: drop traffic, never add nodes.
    ShedLoad,
    /// r ≥ 4.0: full saturation, freeze all resizing.
    EmergencyStop,
}

/// How risky the current operating point is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Inputs to the scaling decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoscalerMetrics {
    /// Current coupling parameter.
    pub r: f64,
    /// Current number of nodes/workers.
    pub current_n: u32,
    /// USL contention coefficient.
    pub alpha: f64,
    /// USL coherency coefficient.
    pub beta: f64,
    /// Serial throughput (ops/sec at N=1). Informational.
    pub lambda: f64,
    /// Desired r. Zero selects the default of 2.0.
    pub target_r: f64,
}

/// The autoscaler's output: a decision plus the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRecommendation {
    pub decision: ScalingDecision,
    /// Recommended node count.
    pub target_n: u32,
    /// Human-readable explanation.
    pub reason: String,
    /// Theoretical peak capacity N_peak (may be +∞).
    pub peak_n: f64,
    /// True when current N sits at or past the peak.
    pub in_retrograde: bool,
    /// Estimated cost savings in percent when scaling down.
    pub cost_savings: f64,
    pub risk_level: RiskLevel,
}

/// Decide whether and how to scale, given r and the fitted USL shape.
///
/// Total over all finite inputs: never fails, never panics. Band
/// edges: r = 2.5 belongs to the stress band, r = 3.0 to the
/// saturation band, and N = N_peak counts as retrograde.
pub fn should_scale(m: &AutoscalerMetrics) -> ScalingRecommendation {
    let peak_n = peak_capacity(m.alpha, m.beta);
    let in_retrograde = !peak_n.is_infinite() && m.current_n as f64 >= peak_n;

    let target_r = if m.target_r == 0.0 {
        DEFAULT_TARGET_R
    } else {
        m.target_r
    };

    let rec = if m.r >= 4.0 {
        ScalingRecommendation {
            decision: ScalingDecision::EmergencyStop,
            target_n: m.current_n,
            reason: format!(
                "r = {:.2} ≥ 4.0: full saturation. Do not resize; investigate root cause \
                 and consider circuit-breaker activation",
                m.r
            ),
            peak_n,
            in_retrograde,
            cost_savings: 0.0,
            risk_level: RiskLevel::Critical,
        }
    } else if m.r >= 3.0 {
        if in_retrograde {
            ScalingRecommendation {
                decision: ScalingDecision::ShedLoad,
                target_n: (peak_n * PEAK_SAFETY_MARGIN).floor() as u32,
                reason: format!(
                    "r = {:.2} ≥ 3.0 and N = {} ≥ N_peak = {:.1}: adding nodes increases \
                     coherency overhead. Shed load and fall back to 80% of peak",
                    m.r, m.current_n, peak_n
                ),
                peak_n,
                in_retrograde,
                cost_savings: 0.0,
                risk_level: RiskLevel::High,
            }
        } else {
            ScalingRecommendation {
                decision: ScalingDecision::ShedLoad,
                target_n: m.current_n,
                reason: format!(
                    "r = {:.2} ≥ 3.0: saturation. Shed load to stabilize; scaling up can \
                     be reconsidered once r drops below 2.5",
                    m.r
                ),
                peak_n,
                in_retrograde,
                cost_savings: 0.0,
                risk_level: RiskLevel::High,
            }
        }
    } else if m.r >= 2.5 {
        if in_retrograde {
            ScalingRecommendation {
                decision: ScalingDecision::ShedLoad,
                target_n: m.current_n,
                reason: format!(
                    "N = {} ≥ N_peak = {:.1}: coherency dominates. More nodes add \
                     overhead, not capacity. Shed traffic instead",
                    m.current_n, peak_n
                ),
                peak_n,
                in_retrograde,
                cost_savings: 0.0,
                risk_level: RiskLevel::Medium,
            }
        } else {
            // Bring r back toward the target, but never provision past
            // 80% of peak capacity.
            let scale_factor = m.r / target_r;
            let desired = (m.current_n as f64 * scale_factor).ceil() as u32;
            let target_n = if peak_n.is_finite() {
                desired.min((peak_n * PEAK_SAFETY_MARGIN).floor() as u32)
            } else {
                desired
            };
            ScalingRecommendation {
                decision: ScalingDecision::ScaleUp,
                target_n,
                reason: format!(
                    "r = {:.2} approaching the saturation boundary with headroom \
                     (N = {} < N_peak = {:.1}): scale up toward r = {:.1}",
                    m.r, m.current_n, peak_n, target_r
                ),
                peak_n,
                in_retrograde,
                cost_savings: 0.0,
                risk_level: RiskLevel::Medium,
            }
        }
    } else if m.r >= 1.5 {
        ScalingRecommendation {
            decision: ScalingDecision::Maintain,
            target_n: m.current_n,
            reason: format!("r = {:.2} in the optimal band [1.5, 2.5): no action", m.r),
            peak_n,
            in_retrograde,
            cost_savings: 0.0,
            risk_level: RiskLevel::Low,
        }
    } else {
        let scale_factor = m.r / target_r;
        let target_n = ((m.current_n as f64 * scale_factor).floor() as u32).max(1);
        let reduction = m.current_n.saturating_sub(target_n);
        let cost_savings = if m.current_n > 0 {
            reduction as f64 / m.current_n as f64 * 100.0
        } else {
            0.0
        };
        ScalingRecommendation {
            decision: ScalingDecision::ScaleDown,
            target_n,
            reason: format!(
                "r = {:.2} < 1.5: system underutilized. Scale down for an estimated \
                 {:.0}% cost saving",
                m.r, cost_savings
            ),
            peak_n,
            in_retrograde,
            cost_savings,
            risk_level: RiskLevel::Low,
        }
    };

    debug!(
        r = m.r,
        current_n = m.current_n,
        target_n = rec.target_n,
        decision = ?rec.decision,
        in_retrograde = rec.in_retrograde,
        "scaling recommendation"
    );

    rec
}

/// Adapter for Kubernetes-style horizontal autoscalers that want a
/// plain replica count: feed the current r as an external metric and
/// return [`ScalingRecommendation::target_n`] directly.
pub fn hpa_target_replicas(
    current_replicas: u32,
    current_r: f64,
    target_r: f64,
    alpha: f64,
    beta: f64,
) -> u32 {
    should_scale(&AutoscalerMetrics {
        r: current_r,
        current_n: current_replicas,
        alpha,
        beta,
        lambda: 0.0,
        target_r,
    })
    .target_n
}
