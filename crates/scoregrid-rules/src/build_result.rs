//! History-based scoring.
//!
//! For every subtask that builds a project, walks the project's most recent
//! builds (newest first). The first build seen on each candidate node
//! contributes `score_for_<outcome> * (scale + scale_adjust_for_older * age)`,
//! where `age` is the build's position in the walk. Older builds on an
//! already scored node are ignored, as are aborted and not-built results.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use scoregrid_placement::{Mapping, PolicyVerdict, ScoreBoard, ScoringPolicy, Task, WorkChunk};

use crate::error::{RuleError, RuleResult};
use crate::history::{BuildHistory, BuildOutcome};

/// Tunables for [`BuildResultRule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildResultSettings {
    pub number_of_builds: usize,
    pub scale: i64,
    pub scale_adjust_for_older: i64,
    pub score_for_success: i64,
    pub score_for_unstable: i64,
    pub score_for_failure: i64,
}

impl Default for BuildResultSettings {
    fn default() -> Self {
        Self {
            number_of_builds: 10,
            scale: 10,
            scale_adjust_for_older: -1,
            score_for_success: 1,
            score_for_unstable: -1,
            score_for_failure: -1,
        }
    }
}

impl BuildResultSettings {
    pub fn validate(&self) -> RuleResult<()> {
        if self.number_of_builds == 0 {
            return Err(RuleError::InvalidParameter {
                rule: "build_result",
                field: "number_of_builds",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn score_for(&self, outcome: BuildOutcome) -> Option<i64> {
        match outcome {
            BuildOutcome::Success => Some(self.score_for_success),
            BuildOutcome::Unstable => Some(self.score_for_unstable),
            BuildOutcome::Failure => Some(self.score_for_failure),
            BuildOutcome::Aborted | BuildOutcome::NotBuilt => None,
        }
    }
}

pub struct BuildResultRule {
    settings: BuildResultSettings,
    history: Arc<dyn BuildHistory>,
}

impl BuildResultRule {
    pub fn new(settings: BuildResultSettings, history: Arc<dyn BuildHistory>) -> RuleResult<Self> {
        settings.validate()?;
        Ok(Self { settings, history })
    }

    pub fn settings(&self) -> &BuildResultSettings {
        &self.settings
    }
}

impl ScoringPolicy for BuildResultRule {
    fn name(&self) -> &str {
        "build_result"
    }

    fn update_scores(
        &self,
        _task: &Task,
        chunk: &WorkChunk,
        _mapping: &Mapping<'_>,
        board: &mut ScoreBoard,
    ) -> anyhow::Result<PolicyVerdict> {
        for subtask in &chunk.subtasks {
            let Some(project) = subtask.project.as_deref() else { continue };

            let builds = self
                .history
                .recent_builds(project, self.settings.number_of_builds)
                .with_context(|| format!("reading build history of {project}"))?;

            let mut unscored: HashSet<String> =
                board.nodes().into_iter().map(str::to_string).collect();

            for (age, build) in builds.iter().take(self.settings.number_of_builds).enumerate() {
                if !unscored.contains(&build.node) {
                    continue;
                }
                let Some(score) = self.settings.score_for(build.outcome) else { continue };
                let age = i64::try_from(age).unwrap_or(i64::MAX);
                let scale = self.settings.scale + self.settings.scale_adjust_for_older * age;
                board.add_score_to_node(&build.node, score * scale);
                unscored.remove(&build.node);
            }
        }
        Ok(PolicyVerdict::Continue)
    }
}
