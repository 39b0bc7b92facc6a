//! Ordered, short-circuiting policy invocation.

use std::sync::Arc;

use tracing::trace;

use crate::error::{PlacementError, PlacementResult};
use crate::mapping::Mapping;
use crate::policy::{PolicyVerdict, ScoringPolicy};
use crate::score_board::ScoreBoard;
use crate::worksheet::{Task, WorkChunk};

/// How far a chain run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainOutcome {
    /// Policies actually invoked.
    pub invoked: usize,
    /// Whether a policy stopped the chain early.
    pub stopped: bool,
}

/// The configured policies, run in order for each chunk.
pub struct PolicyChain<'a> {
    policies: &'a [Arc<dyn ScoringPolicy>],
}

impl<'a> PolicyChain<'a> {
    pub fn new(policies: &'a [Arc<dyn ScoringPolicy>]) -> Self {
        Self { policies }
    }

    /// Score `chunk` into `board`.
    ///
    /// A policy returning [`PolicyVerdict::Stop`] ends the run. A policy
    /// error is returned as [`PlacementError::PolicyFailure`] and must abort
    /// the whole attempt.
    pub fn run(
        &self,
        task: &Task,
        chunk: &WorkChunk,
        mapping: &Mapping<'_>,
        board: &mut ScoreBoard,
    ) -> PlacementResult<ChainOutcome> {
        let mut invoked = 0;
        for policy in self.policies {
            invoked += 1;
            let verdict = policy
                .update_scores(task, chunk, mapping, board)
                .map_err(|source| PlacementError::PolicyFailure {
                    policy: policy.name().to_string(),
                    source,
                })?;
            if verdict == PolicyVerdict::Stop {
                trace!(policy = policy.name(), chunk = chunk.index, "policy stopped the chain");
                return Ok(ChainOutcome {
                    invoked,
                    stopped: true,
                });
            }
        }
        Ok(ChainOutcome {
            invoked,
            stopped: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::worksheet::{ExecutionSlot, SlotId, SubTask, Worksheet};

    /// Adds a fixed score to slot 0 and records that it ran.
    struct Recording {
        name: String,
        delta: i64,
        verdict: PolicyVerdict,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScoringPolicy for Recording {
        fn name(&self) -> &str {
            &self.name
        }

        fn update_scores(
            &self,
            _task: &Task,
            _chunk: &WorkChunk,
            _mapping: &Mapping<'_>,
            board: &mut ScoreBoard,
        ) -> anyhow::Result<PolicyVerdict> {
            self.calls.lock().unwrap().push(self.name.clone());
            board.add_score(SlotId(0), self.delta);
            Ok(self.verdict)
        }
    }

    struct Failing;

    impl ScoringPolicy for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn update_scores(
            &self,
            _task: &Task,
            _chunk: &WorkChunk,
            _mapping: &Mapping<'_>,
            _board: &mut ScoreBoard,
        ) -> anyhow::Result<PolicyVerdict> {
            anyhow::bail!("history backend unavailable")
        }
    }

    fn setup() -> (Task, Worksheet) {
        let mut ws = Worksheet::new(vec![ExecutionSlot::new("a", "a", 1)]);
        ws.add_chunk(vec![SubTask::new("x")], vec![SlotId(0)], None).unwrap();
        (Task::new("t", "t"), ws)
    }

    fn recording(
        name: &str,
        delta: i64,
        verdict: PolicyVerdict,
        calls: &Arc<Mutex<Vec<String>>>,
    ) -> Arc<dyn ScoringPolicy> {
        Arc::new(Recording {
            name: name.to_string(),
            delta,
            verdict,
            calls: calls.clone(),
        })
    }

    #[test]
    fn runs_every_policy_in_order() {
        let (task, ws) = setup();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let policies = vec![
            recording("first", 1, PolicyVerdict::Continue, &calls),
            recording("second", 10, PolicyVerdict::Continue, &calls),
        ];
        let mapping = Mapping::new(&ws);
        let chunk = &ws.chunks()[0];
        let mut board = ScoreBoard::for_chunk(&ws, chunk);

        let outcome = PolicyChain::new(&policies)
            .run(&task, chunk, &mapping, &mut board)
            .unwrap();

        assert_eq!(outcome, ChainOutcome { invoked: 2, stopped: false });
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(board.score(SlotId(0)), 11);
    }

    #[test]
    fn stop_skips_later_policies_but_keeps_effects() {
        let (task, ws) = setup();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let policies = vec![
            recording("first", 1, PolicyVerdict::Continue, &calls),
            recording("veto", 5, PolicyVerdict::Stop, &calls),
            recording("never", 100, PolicyVerdict::Continue, &calls),
        ];
        let mapping = Mapping::new(&ws);
        let chunk = &ws.chunks()[0];
        let mut board = ScoreBoard::for_chunk(&ws, chunk);

        let outcome = PolicyChain::new(&policies)
            .run(&task, chunk, &mapping, &mut board)
            .unwrap();

        assert_eq!(outcome, ChainOutcome { invoked: 2, stopped: true });
        assert_eq!(*calls.lock().unwrap(), vec!["first", "veto"]);
        assert_eq!(board.score(SlotId(0)), 6);
    }

    #[test]
    fn policy_error_becomes_policy_failure() {
        let (task, ws) = setup();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let policies: Vec<Arc<dyn ScoringPolicy>> = vec![
            Arc::new(Failing),
            recording("after", 1, PolicyVerdict::Continue, &calls),
        ];
        let mapping = Mapping::new(&ws);
        let chunk = &ws.chunks()[0];
        let mut board = ScoreBoard::for_chunk(&ws, chunk);

        let err = PolicyChain::new(&policies)
            .run(&task, chunk, &mapping, &mut board)
            .unwrap_err();

        match err {
            PlacementError::PolicyFailure { policy, source } => {
                assert_eq!(policy, "failing");
                assert!(source.to_string().contains("history backend"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_chain_leaves_board_untouched() {
        let (task, ws) = setup();
        let mapping = Mapping::new(&ws);
        let chunk = &ws.chunks()[0];
        let mut board = ScoreBoard::for_chunk(&ws, chunk);

        let outcome = PolicyChain::new(&[]).run(&task, chunk, &mapping, &mut board).unwrap();
        assert_eq!(outcome.invoked, 0);
        assert_eq!(board.score(SlotId(0)), 0);
    }
}
