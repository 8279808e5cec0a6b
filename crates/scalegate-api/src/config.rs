//! Host wiring configuration.
//!
//! Only wiring lives here: where to mount the status route, how big
//! the latency window is, what r a fresh replica assumes. The control
//! thresholds themselves are physical constants and deliberately have
//! no configuration surface.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Path prefix for the monitoring routes.
    pub status_prefix: String,
    /// Ring capacity for the host's latency tracker.
    pub tail_capacity: usize,
    /// Coupling parameter a fresh replica starts from.
    pub initial_r: f64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            status_prefix: "scalegate".to_string(),
            tail_capacity: 1000,
            initial_r: 1.5,
        }
    }
}

impl HostConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = HostConfig::default();
        assert_eq!(cfg.status_prefix, "scalegate");
        assert_eq!(cfg.tail_capacity, 1000);
        assert_eq!(cfg.initial_r, 1.5);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = HostConfig::from_toml("status_prefix = \"admission\"").unwrap();
        assert_eq!(cfg.status_prefix, "admission");
        assert_eq!(cfg.tail_capacity, 1000);
        assert_eq!(cfg.initial_r, 1.5);
    }

    #[test]
    fn full_toml() {
        let cfg = HostConfig::from_toml(
            "status_prefix = \"ops\"\ntail_capacity = 5000\ninitial_r = 2.0\n",
        )
        .unwrap();
        assert_eq!(cfg.status_prefix, "ops");
        assert_eq!(cfg.tail_capacity, 5000);
        assert_eq!(cfg.initial_r, 2.0);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(HostConfig::from_toml("status_prefix = [nope").is_err());
    }
}
