//! Load-aware scoring.
//!
//! Scores every candidate slot from its idle and busy executors. Executors
//! already promised to earlier chunks of the same task count as busy, since
//! the host's own counters do not see them yet.

use serde::{Deserialize, Serialize};

use scoregrid_placement::{Mapping, PolicyVerdict, ScoreBoard, ScoringPolicy, Task, WorkChunk};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeLoadRule {
    pub scale: i64,
    pub score_for_idle_executor: i64,
    pub score_for_busy_executor: i64,
}

impl Default for NodeLoadRule {
    fn default() -> Self {
        Self {
            scale: 10,
            score_for_idle_executor: 1,
            score_for_busy_executor: -1,
        }
    }
}

impl ScoringPolicy for NodeLoadRule {
    fn name(&self) -> &str {
        "node_load"
    }

    fn update_scores(
        &self,
        _task: &Task,
        _chunk: &WorkChunk,
        mapping: &Mapping<'_>,
        board: &mut ScoreBoard,
    ) -> anyhow::Result<PolicyVerdict> {
        let worksheet = mapping.worksheet();
        for slot_id in board.slots().to_vec() {
            let Some(slot) = worksheet.slot(slot_id) else { continue };
            let idle = i64::from(slot.available()) - i64::from(mapping.pending_units(slot_id));
            let busy = i64::from(slot.capacity) - idle;
            let score = busy * self.score_for_busy_executor + idle * self.score_for_idle_executor;
            board.add_score(slot_id, score * self.scale);
        }
        Ok(PolicyVerdict::Continue)
    }
}
