//! Score-driven backtracking search.
//!
//! Chunks are visited in worksheet order. For each chunk the policy chain
//! scores a fresh [`ScoreBoard`]; candidates are shuffled and then
//! stable-sorted by descending score, so strictly better slots always win
//! while equally scored slots take turns across attempts. The first
//! complete, valid mapping found is returned.
//!
//! ```text
//! search(i):
//!   i == chunks        → mapping.is_completely_valid()
//!   board = chain(chunk i)
//!   for slot in shuffle-then-sort(board), skipping invalid:
//!       assign(i, slot)
//!       if partially valid and search(i + 1) → true
//!   unassign(i) → false
//! ```

use std::cmp::Reverse;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, trace};

use crate::chain::PolicyChain;
use crate::error::PlacementResult;
use crate::mapping::{Mapping, PlacementPlan};
use crate::report::{ReportSink, ScoreReport};
use crate::score_board::ScoreBoard;
use crate::worksheet::{SlotId, Task, Worksheet};

/// Order candidates for trying: random among ties, best score first.
pub fn order_candidates<R: Rng + ?Sized>(board: &ScoreBoard, rng: &mut R) -> Vec<SlotId> {
    let mut slots = board.slots().to_vec();
    slots.shuffle(rng);
    // Stable: ties keep their shuffled relative order.
    slots.sort_by_key(|slot| Reverse(board.score(*slot)));
    slots
}

/// One search over one worksheet. Not shared between attempts.
pub struct Assigner<'a, R: Rng + ?Sized> {
    task: &'a Task,
    worksheet: &'a Worksheet,
    chain: PolicyChain<'a>,
    rng: &'a mut R,
    report_scores: bool,
    sink: Option<&'a dyn ReportSink>,
}

impl<'a, R: Rng + ?Sized> Assigner<'a, R> {
    pub fn new(
        task: &'a Task,
        worksheet: &'a Worksheet,
        chain: PolicyChain<'a>,
        rng: &'a mut R,
    ) -> Self {
        Self {
            task,
            worksheet,
            chain,
            rng,
            report_scores: false,
            sink: None,
        }
    }

    /// Emit a [`ScoreReport`] for every scored chunk.
    pub fn with_reports(mut self, enabled: bool, sink: Option<&'a dyn ReportSink>) -> Self {
        self.report_scores = enabled;
        self.sink = sink;
        self
    }

    /// Run the search.
    ///
    /// `Ok(None)` means every branch was exhausted without a valid mapping.
    /// A policy error aborts immediately.
    pub fn assign(&mut self) -> PlacementResult<Option<PlacementPlan>> {
        let mut mapping = Mapping::new(self.worksheet);
        if self.search(&mut mapping, 0)? {
            Ok(mapping.to_plan(self.task))
        } else {
            Ok(None)
        }
    }

    fn search(&mut self, mapping: &mut Mapping<'a>, index: usize) -> PlacementResult<bool> {
        let worksheet = self.worksheet;
        let Some(chunk) = worksheet.chunk(index) else {
            return Ok(mapping.is_completely_valid());
        };

        let mut board = ScoreBoard::for_chunk(worksheet, chunk);
        self.chain.run(self.task, chunk, mapping, &mut board)?;

        let ordered = order_candidates(&board, &mut *self.rng);

        if self.report_scores {
            ScoreReport::collect(self.task, worksheet, chunk, &ordered, &board).emit(self.sink);
        }

        for slot in ordered {
            if board.is_invalid(slot) {
                continue;
            }
            mapping.assign(index, Some(slot));
            if !mapping.is_partially_valid() {
                trace!(chunk = index, %slot, "constraint violated, trying next slot");
                continue;
            }
            debug!(
                task = %self.task.id,
                chunk = index,
                %slot,
                score = board.score(slot),
                "tentatively assigned chunk"
            );
            if self.search(mapping, index + 1)? {
                return Ok(true);
            }
        }

        mapping.assign(index, None);
        Ok(false)
    }
}
