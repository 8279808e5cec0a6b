//! scalegate-governor — adaptive load control from the coupling parameter.
//!
//! The governor watches r(t) and applies corrective pressure before the
//! system crosses into saturation:
//!
//! - below 2.8 the system is stable and nothing happens;
//! - small corrections as r approaches saturation (warning, pacing);
//! - aggressive shedding at the saturation point (throttle, with
//!   hysteresis so admission does not oscillate);
//! - outright rejection of deployments whose complexity growth violates
//!   the Feigenbaum ratio bound.
//!
//! One governor instance protects one service. Evaluations mutate only
//! the instance's own state and are totally ordered per instance; hosts
//! that share an instance across request handlers wrap it in a coarse
//! mutex.

pub mod dynamics;
pub mod governor;

pub use dynamics::RDynamics;
pub use governor::{Action, ActionKind, Governor, GovernorStatistics};
