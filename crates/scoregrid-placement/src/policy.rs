//! Scoring policy contract.
//!
//! Policies are the pluggable half of the balancer: each one inspects the
//! task, the chunk being placed and the assignments made so far, and
//! adjusts the chunk's [`ScoreBoard`]. The engine knows nothing else about
//! them.

use crate::mapping::Mapping;
use crate::score_board::ScoreBoard;
use crate::worksheet::{Task, WorkChunk};

/// Whether later policies in the chain should run for this chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyVerdict {
    Continue,
    /// Skip the remaining policies. Effects already applied stand.
    Stop,
}

impl PolicyVerdict {
    pub fn from_continue(keep_going: bool) -> Self {
        if keep_going { Self::Continue } else { Self::Stop }
    }
}

/// A unit of scoring logic.
///
/// Implementations may keep their own configuration but must only touch
/// the board through its scoring and invalidation methods. An error aborts
/// the whole scheduling attempt and hands the task to the fallback balancer.
pub trait ScoringPolicy: Send + Sync {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    fn update_scores(
        &self,
        task: &Task,
        chunk: &WorkChunk,
        mapping: &Mapping<'_>,
        board: &mut ScoreBoard,
    ) -> anyhow::Result<PolicyVerdict>;
}
