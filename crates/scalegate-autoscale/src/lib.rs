//! scalegate-autoscale — r-driven scaling recommendations.
//!
//! Threshold-triggered autoscalers share a fatal assumption: that
//! adding nodes always lowers per-node load. Past the USL peak the
//! opposite holds: coherency overhead grows with N², so every node
//! added increases interference and pushes r further into saturation.
//! [`should_scale`] refuses to scale into that retrograde region and
//! recommends shedding load instead.
//!
//! # Decision bands
//!
//! ```text
//! r ≥ 4.0                  EMERGENCY_STOP (never resize mid-saturation)
//! 3.0 ≤ r < 4.0            SHED_LOAD (retrograde: fall back to 80% of peak)
//! 2.5 ≤ r < 3.0, N < peak  SCALE_UP toward target r, capped at 80% of peak
//! 2.5 ≤ r < 3.0, N ≥ peak  SHED_LOAD (adding nodes would make it worse)
//! 1.5 ≤ r < 2.5            MAINTAIN (the optimal pocket)
//! r < 1.5                  SCALE_DOWN (bored fleet, reclaim cost)
//! ```

pub mod policy;

pub use policy::{
    AutoscalerMetrics, RiskLevel, ScalingDecision, ScalingRecommendation, hpa_target_replicas,
    should_scale,
};
