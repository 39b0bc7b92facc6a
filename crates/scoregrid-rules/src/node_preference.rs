//! Static node preferences.
//!
//! Two sources, each with its own scale:
//! - per-node preference, applied to every chunk;
//! - per-project preference for named nodes, applied once for every subtask
//!   of the chunk that builds that project.
//!
//! Nodes are matched by exact name; a node listed twice in one entry counts once.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use scoregrid_placement::{Mapping, PolicyVerdict, ScoreBoard, ScoringPolicy, Task, WorkChunk};

/// A project's preference for a set of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPreference {
    pub nodes: Vec<String>,
    pub preference: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePreferenceRule {
    pub nodes_preference_scale: i64,
    pub project_preference_scale: i64,
    /// Node name → preference.
    pub node_preferences: HashMap<String, i64>,
    /// Project name → preferences.
    pub project_preferences: HashMap<String, Vec<ProjectPreference>>,
}

impl Default for NodePreferenceRule {
    fn default() -> Self {
        Self {
            nodes_preference_scale: 10,
            project_preference_scale: 10,
            node_preferences: HashMap::new(),
            project_preferences: HashMap::new(),
        }
    }
}

impl NodePreferenceRule {
    pub fn with_node(mut self, node: impl Into<String>, preference: i64) -> Self {
        self.node_preferences.insert(node.into(), preference);
        self
    }

    pub fn with_project(
        mut self,
        project: impl Into<String>,
        nodes: &[&str],
        preference: i64,
    ) -> Self {
        self.project_preferences
            .entry(project.into())
            .or_default()
            .push(ProjectPreference {
                nodes: nodes.iter().map(|n| n.to_string()).collect(),
                preference,
            });
        self
    }
}

impl ScoringPolicy for NodePreferenceRule {
    fn name(&self) -> &str {
        "node_preference"
    }

    fn update_scores(
        &self,
        _task: &Task,
        chunk: &WorkChunk,
        _mapping: &Mapping<'_>,
        board: &mut ScoreBoard,
    ) -> anyhow::Result<PolicyVerdict> {
        let nodes: Vec<String> = board.nodes().into_iter().map(str::to_string).collect();
        for node in &nodes {
            if let Some(preference) = self.node_preferences.get(node) {
                board.add_score_to_node(node, preference * self.nodes_preference_scale);
            }
        }

        for subtask in &chunk.subtasks {
            let Some(project) = subtask.project.as_deref() else { continue };
            let Some(prefs) = self.project_preferences.get(project) else { continue };
            for pref in prefs {
                if pref.nodes.is_empty() {
                    warn!(project, "skipped node preference that lists no nodes");
                    continue;
                }
                let mut scored = HashSet::new();
                for node in pref.nodes.iter().filter(|n| scored.insert(n.as_str())) {
                    let matched =
                        board.add_score_to_node(node, pref.preference * self.project_preference_scale);
                    if matched == 0 {
                        trace!(project, node = %node, "preferred node is not a candidate");
                    }
                }
            }
        }

        Ok(PolicyVerdict::Continue)
    }
}
