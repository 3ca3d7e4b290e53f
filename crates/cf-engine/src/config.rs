//! Engine configuration

use std::time::Duration;

use cf_core::{CfError, CfResult};
use serde::{Deserialize, Serialize};

use crate::recorder::SimplifierConfig;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Automations a single track may own
    pub max_automations_per_track: usize,
    /// Keyframe slots allocated for a new automation; grows by doubling
    pub initial_keyframe_capacity: usize,
    /// Longest wait for the curve lock on render and record paths
    pub render_lock_budget_us: u64,
    pub simplifier: SimplifierConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_automations_per_track: 8,
            initial_keyframe_capacity: 4,
            render_lock_budget_us: 250,
            simplifier: SimplifierConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> CfResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CfError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CfResult<()> {
        if self.max_automations_per_track == 0 {
            return Err(CfError::Config(
                "max_automations_per_track must be at least 1".into(),
            ));
        }
        if self.initial_keyframe_capacity == 0 {
            return Err(CfError::Config(
                "initial_keyframe_capacity must be at least 1".into(),
            ));
        }
        let s = &self.simplifier;
        let epsilon_ok = s.change_epsilon >= 0.0;
        let threshold_ok = s.commit_threshold > 0.0;
        if !epsilon_ok || !threshold_ok {
            return Err(CfError::Config(format!(
                "simplifier thresholds out of range: epsilon {}, threshold {}",
                s.change_epsilon, s.commit_threshold
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn lock_budget(&self) -> Duration {
        Duration::from_micros(self.render_lock_budget_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_automations_per_track, 8);
        assert_eq!(config.initial_keyframe_capacity, 4);
        assert_eq!(config.lock_budget(), Duration::from_micros(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config =
            EngineConfig::from_json(r#"{ "simplifier": { "commit_threshold": 0.05 } }"#).unwrap();
        assert_eq!(config.max_automations_per_track, 8);
        assert!((config.simplifier.commit_threshold - 0.05).abs() < 1e-12);
        assert_eq!(config.simplifier.record_reserve, 256);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "max_automations_per_track": 0 }"#),
            Err(CfError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(CfError::Config(_))
        ));
    }
}
