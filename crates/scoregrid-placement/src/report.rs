//! Score diagnostics.
//!
//! When score reporting is enabled the assigner emits one [`ScoreReport`]
//! per scored chunk: logged as a table at `info` level and handed to an
//! optional [`ReportSink`]. Reports are verbose; keep them off in production.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::score_board::ScoreBoard;
use crate::worksheet::{SlotId, Task, WorkChunk, Worksheet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub slot: SlotId,
    pub slot_name: String,
    pub node: String,
    pub score: i64,
    pub invalid: bool,
}

/// Scores of one chunk, in the order candidates will be tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub task_id: String,
    pub chunk: usize,
    pub subtasks: Vec<String>,
    pub entries: Vec<ScoreEntry>,
}

impl ScoreReport {
    pub fn collect(
        task: &Task,
        worksheet: &Worksheet,
        chunk: &WorkChunk,
        ordered: &[SlotId],
        board: &ScoreBoard,
    ) -> Self {
        let entries = ordered
            .iter()
            .filter_map(|&id| {
                let slot = worksheet.slot(id)?;
                Some(ScoreEntry {
                    slot: id,
                    slot_name: slot.id.clone(),
                    node: slot.node.clone(),
                    score: board.score(id),
                    invalid: board.is_invalid(id),
                })
            })
            .collect();
        Self {
            task_id: task.id.clone(),
            chunk: chunk.index,
            subtasks: chunk.subtask_names(),
            entries,
        }
    }

    /// Human-readable table, one slot per line.
    pub fn render(&self) -> String {
        let mut lines = vec![format!("Scoring for {}:", self.subtasks.join(","))];
        for entry in &self.entries {
            let mark = if entry.invalid { " (invalid)" } else { "" };
            lines.push(format!("  {:>20}: {:>4}{mark}", entry.slot_name, entry.score));
        }
        lines.join("\n")
    }

    pub(crate) fn emit(&self, sink: Option<&dyn ReportSink>) {
        info!(task = %self.task_id, chunk = self.chunk, "{}", self.render());
        if let Some(sink) = sink {
            sink.record(self);
        }
    }
}

/// Receives score reports as they are produced.
pub trait ReportSink: Send + Sync {
    fn record(&self, report: &ScoreReport);
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<ScoreReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ScoreReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<ScoreReport> {
        std::mem::take(&mut *self.reports.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ReportSink for MemorySink {
    fn record(&self, report: &ScoreReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
    }
}
