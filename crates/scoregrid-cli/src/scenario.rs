//! Scenario files for offline planning.
//!
//! ```toml
//! [task]
//! id = "build-42"
//! name = "monorepo-ci"
//!
//! [[slots]]
//! id = "agent-a/0"
//! node = "agent-a"
//! capacity = 2
//! occupancy = 1
//!
//! [[chunks]]
//! subtasks = [{ name = "lint", project = "monorepo" }]
//! applicable = ["agent-a/0"]
//! same_node = "checkout"
//!
//! [[history]]
//! project = "monorepo"
//! node = "agent-a"
//! outcome = "success"
//! ```
//!
//! History entries are listed oldest first.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;

use scoregrid_placement::{ExecutionSlot, Occupancy, SlotId, SubTask, Task, Worksheet};
use scoregrid_rules::{BuildOutcome, StaticBuildHistory};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub task: TaskSpec,
    #[serde(default)]
    pub slots: Vec<SlotSpec>,
    #[serde(default)]
    pub chunks: Vec<ChunkSpec>,
    #[serde(default)]
    pub history: Vec<HistorySpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotSpec {
    pub id: String,
    pub node: String,
    pub capacity: u32,
    #[serde(default)]
    pub occupancy: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubTaskSpec {
    pub name: String,
    pub project: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkSpec {
    pub subtasks: Vec<SubTaskSpec>,
    /// Slot ids; all slots when omitted.
    pub applicable: Option<Vec<String>>,
    pub same_node: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySpec {
    pub project: String,
    pub node: String,
    pub outcome: BuildOutcome,
}

impl Scenario {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn task(&self) -> Task {
        let name = self.task.name.as_deref().unwrap_or(&self.task.id);
        Task::new(self.task.id.clone(), name)
    }

    pub fn worksheet(&self) -> anyhow::Result<Worksheet> {
        let mut seen = HashSet::new();
        let slots = self
            .slots
            .iter()
            .map(|spec| {
                if !seen.insert(spec.id.as_str()) {
                    bail!("duplicate slot id {:?}", spec.id);
                }
                Ok(ExecutionSlot::new(spec.id.clone(), spec.node.clone(), spec.capacity)
                    .with_occupancy(Occupancy::new(spec.occupancy)))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut worksheet = Worksheet::new(slots);
        for (index, chunk) in self.chunks.iter().enumerate() {
            let applicable = match &chunk.applicable {
                Some(ids) => ids
                    .iter()
                    .map(|id| {
                        worksheet
                            .slot_id(id)
                            .with_context(|| format!("chunk {index} names unknown slot {id:?}"))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?,
                None => (0..worksheet.slots().len()).map(SlotId).collect(),
            };
            let subtasks = chunk
                .subtasks
                .iter()
                .map(|s| match &s.project {
                    Some(project) => SubTask::for_project(s.name.clone(), project.clone()),
                    None => SubTask::new(s.name.clone()),
                })
                .collect();
            worksheet.add_chunk(subtasks, applicable, chunk.same_node.clone())?;
        }
        Ok(worksheet)
    }

    pub fn build_history(&self) -> StaticBuildHistory {
        let mut history = StaticBuildHistory::new();
        for entry in &self.history {
            history.record(entry.project.clone(), entry.node.clone(), entry.outcome);
        }
        history
    }
}
