//! Balancer settings file.
//!
//! ```toml
//! enabled = true
//! report_scores = false
//!
//! [throttle]
//! enabled = true
//! min_interval_ms = 1000
//!
//! [[policies]]
//! kind = "node_load"
//! scale = 10
//!
//! [[policies]]
//! kind = "build_result"
//! number_of_builds = 5
//! ```
//!
//! Policies run in the order they are listed.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use scoregrid_placement::{BalancerConfig, EngineSettings, PlacementError, ScoringPolicy};

use crate::build_result::{BuildResultRule, BuildResultSettings};
use crate::error::{RuleError, RuleResult};
use crate::history::BuildHistory;
use crate::node_load::NodeLoadRule;
use crate::node_preference::NodePreferenceRule;

/// One configured policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicySpec {
    NodeLoad(NodeLoadRule),
    NodePreference(NodePreferenceRule),
    BuildResult(BuildResultSettings),
}

impl PolicySpec {
    pub fn kind(&self) -> &'static str {
        match self {
            PolicySpec::NodeLoad(_) => "node_load",
            PolicySpec::NodePreference(_) => "node_preference",
            PolicySpec::BuildResult(_) => "build_result",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerSettings {
    #[serde(flatten)]
    pub engine: EngineSettings,
    pub policies: Vec<PolicySpec>,
}

impl BalancerSettings {
    pub fn from_file(path: &Path) -> RuleResult<Self> {
        let content = std::fs::read_to_string(path).map_err(PlacementError::from)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> RuleResult<Self> {
        toml::from_str(content).map_err(|e| RuleError::Placement(PlacementError::from(e)))
    }

    pub fn to_toml_string(&self) -> RuleResult<String> {
        toml::to_string_pretty(self).map_err(|e| RuleError::Placement(PlacementError::from(e)))
    }

    /// Build the policies in order.
    ///
    /// `history` is required only when a `build_result` policy is listed.
    pub fn build_policies(
        &self,
        history: Option<&Arc<dyn BuildHistory>>,
    ) -> RuleResult<Vec<Arc<dyn ScoringPolicy>>> {
        self.policies
            .iter()
            .map(|spec| -> RuleResult<Arc<dyn ScoringPolicy>> {
                let policy: Arc<dyn ScoringPolicy> = match spec {
                    PolicySpec::NodeLoad(rule) => Arc::new(rule.clone()),
                    PolicySpec::NodePreference(rule) => Arc::new(rule.clone()),
                    PolicySpec::BuildResult(settings) => {
                        let history = history.ok_or(RuleError::MissingHistory)?;
                        Arc::new(BuildResultRule::new(settings.clone(), history.clone())?)
                    }
                };
                Ok(policy)
            })
            .collect()
    }

    /// Build a runnable balancer config.
    pub fn build(&self, history: Option<&Arc<dyn BuildHistory>>) -> RuleResult<BalancerConfig> {
        let policies = self.build_policies(history)?;
        Ok(self.engine.clone().into_config(policies))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::history::StaticBuildHistory;

    const SAMPLE: &str = r#"
enabled = true
report_scores = true

[throttle]
enabled = true
min_interval_ms = 750

[[policies]]
kind = "node_preference"
nodes_preference_scale = 3

[policies.node_preferences]
fast-1 = 2

[[policies]]
kind = "node_load"
scale = 5

[[policies]]
kind = "build_result"
number_of_builds = 4
"#;

    #[test]
    fn parses_policies_in_order() {
        let settings = BalancerSettings::from_toml_str(SAMPLE).unwrap();
        let kinds: Vec<&str> = settings.policies.iter().map(PolicySpec::kind).collect();
        assert_eq!(kinds, vec!["node_preference", "node_load", "build_result"]);
        assert!(settings.engine.throttle.enabled);
        assert_eq!(settings.engine.throttle.min_interval_ms, 750);

        match &settings.policies[1] {
            PolicySpec::NodeLoad(rule) => {
                assert_eq!(rule.scale, 5);
                assert_eq!(rule.score_for_idle_executor, 1);
            }
            other => panic!("unexpected policy {other:?}"),
        }
    }

    #[test]
    fn build_requires_history_for_build_result() {
        let settings = BalancerSettings::from_toml_str(SAMPLE).unwrap();
        let err = settings.build(None).unwrap_err();
        assert!(matches!(err, RuleError::MissingHistory));

        let history: Arc<dyn BuildHistory> = Arc::new(StaticBuildHistory::new());
        let config = settings.build(Some(&history)).unwrap();
        let names: Vec<&str> = config.policies.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["node_preference", "node_load", "build_result"]);
        assert!(config.report_scores);
    }

    #[test]
    fn build_validates_rule_parameters() {
        let settings = BalancerSettings::from_toml_str(
            r#"
[[policies]]
kind = "build_result"
number_of_builds = 0
"#,
        )
        .unwrap();
        let history: Arc<dyn BuildHistory> = Arc::new(StaticBuildHistory::new());
        assert!(matches!(
            settings.build(Some(&history)).unwrap_err(),
            RuleError::InvalidParameter { .. }
        ));
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        let err = BalancerSettings::from_toml_str(
            r#"
[[policies]]
kind = "label_expression"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::Placement(PlacementError::Parse(_))));
    }

    #[test]
    fn engine_settings_read_from_the_top_level() {
        let settings = BalancerSettings::from_toml_str(SAMPLE).unwrap();
        let engine = EngineSettings::from_toml_str(
            "enabled = true\nreport_scores = true\n\n[throttle]\nenabled = true\nmin_interval_ms = 750\n",
        )
        .unwrap();
        assert_eq!(settings.engine, engine);
    }

    #[test]
    fn empty_file_uses_engine_defaults() {
        let settings = BalancerSettings::from_toml_str("").unwrap();
        assert_eq!(settings.engine, EngineSettings::default());
        assert!(settings.policies.is_empty());
    }

    #[test]
    fn toml_round_trip() {
        let settings = BalancerSettings::from_toml_str(SAMPLE).unwrap();
        let text = settings.to_toml_string().unwrap();
        assert_eq!(BalancerSettings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let settings = BalancerSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.policies.len(), 3);
    }
}
