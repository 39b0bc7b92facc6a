//! Build history source for history-based scoring.
//!
//! The balancer does not store build results. Hosts expose their own
//! history through [`BuildHistory`]; [`StaticBuildHistory`] is an in-memory
//! implementation for tests and offline planning.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    Success,
    Unstable,
    Failure,
    Aborted,
    NotBuilt,
}

/// Where a past build ran and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub node: String,
    pub outcome: BuildOutcome,
}

pub trait BuildHistory: Send + Sync {
    /// Up to `limit` most recent builds of `project`, newest first.
    fn recent_builds(&self, project: &str, limit: usize) -> anyhow::Result<Vec<BuildRecord>>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticBuildHistory {
    /// Oldest first.
    builds: HashMap<String, Vec<BuildRecord>>,
}

impl StaticBuildHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a build as the newest for `project`.
    pub fn record(&mut self, project: impl Into<String>, node: impl Into<String>, outcome: BuildOutcome) {
        self.builds.entry(project.into()).or_default().push(BuildRecord {
            node: node.into(),
            outcome,
        });
    }

    pub fn with_build(
        mut self,
        project: impl Into<String>,
        node: impl Into<String>,
        outcome: BuildOutcome,
    ) -> Self {
        self.record(project, node, outcome);
        self
    }
}

impl BuildHistory for StaticBuildHistory {
    fn recent_builds(&self, project: &str, limit: usize) -> anyhow::Result<Vec<BuildRecord>> {
        Ok(self
            .builds
            .get(project)
            .map(|builds| builds.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
