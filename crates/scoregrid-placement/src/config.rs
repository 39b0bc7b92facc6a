//! Balancer configuration.
//!
//! [`EngineSettings`] is the serializable part (TOML), [`BalancerConfig`]
//! is the in-process snapshot the balancer reads once per attempt, with the
//! scoring policies already built.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PlacementResult;
use crate::policy::ScoringPolicy;
use crate::throttle::ThrottleSettings;

/// Engine switches as written in a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// When false every request goes straight to the fallback balancer.
    pub enabled: bool,
    /// Log computed scores for every chunk. Noisy.
    pub report_scores: bool,
    pub throttle: ThrottleSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            report_scores: false,
            throttle: ThrottleSettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_file(path: &Path) -> PlacementResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PlacementResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> PlacementResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Combine with built policies into a runnable config.
    pub fn into_config(self, policies: Vec<Arc<dyn ScoringPolicy>>) -> BalancerConfig {
        BalancerConfig {
            enabled: self.enabled,
            report_scores: self.report_scores,
            throttle: self.throttle,
            policies,
        }
    }
}

/// Read-only snapshot consumed by one scheduling attempt.
#[derive(Clone)]
pub struct BalancerConfig {
    pub enabled: bool,
    pub report_scores: bool,
    pub throttle: ThrottleSettings,
    /// Invoked in this order for every chunk.
    pub policies: Vec<Arc<dyn ScoringPolicy>>,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        EngineSettings::default().into_config(Vec::new())
    }
}

impl fmt::Debug for BalancerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.policies.iter().map(|p| p.name()).collect();
        f.debug_struct("BalancerConfig")
            .field("enabled", &self.enabled)
            .field("report_scores", &self.report_scores)
            .field("throttle", &self.throttle)
            .field("policies", &names)
            .finish()
    }
}

impl BalancerConfig {
    pub fn with_policies(mut self, policies: Vec<Arc<dyn ScoringPolicy>>) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_throttle(mut self, throttle: ThrottleSettings) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn report_scores(mut self, report: bool) -> Self {
        self.report_scores = report;
        self
    }
}
