//! Per-chunk score ledger.
//!
//! A [`ScoreBoard`] is created fresh for every work chunk in every
//! scheduling attempt. Policies accumulate integer scores into it and may
//! mark slots invalid; the assigner then reads it to order candidates.
//! Higher scores are preferred. Scores are not clamped and wrap on overflow.

use std::collections::{HashMap, HashSet};

use crate::worksheet::{SlotId, WorkChunk, Worksheet};

#[derive(Debug, Clone)]
pub struct ScoreBoard {
    /// Candidate slots in the order they were supplied.
    slots: Vec<SlotId>,
    nodes: HashMap<SlotId, String>,
    scores: HashMap<SlotId, i64>,
    invalid: HashSet<SlotId>,
}

impl ScoreBoard {
    /// Create a board with every candidate at score 0 and eligible.
    ///
    /// Duplicate slot ids keep their first occurrence.
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = (SlotId, S)>,
        S: Into<String>,
    {
        let mut board = Self {
            slots: Vec::new(),
            nodes: HashMap::new(),
            scores: HashMap::new(),
            invalid: HashSet::new(),
        };
        for (slot, node) in candidates {
            if board.scores.contains_key(&slot) {
                continue;
            }
            board.slots.push(slot);
            board.nodes.insert(slot, node.into());
            board.scores.insert(slot, 0);
        }
        board
    }

    /// Board over a chunk's applicable slots.
    pub fn for_chunk(worksheet: &Worksheet, chunk: &WorkChunk) -> Self {
        Self::new(chunk.applicable.iter().filter_map(|&id| {
            worksheet.slot(id).map(|slot| (id, slot.node.clone()))
        }))
    }

    pub fn slots(&self) -> &[SlotId] {
        &self.slots
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.scores.contains_key(&slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Node hosting `slot`, if it is on this board.
    pub fn node_of(&self, slot: SlotId) -> Option<&str> {
        self.nodes.get(&slot).map(String::as_str)
    }

    /// Distinct nodes on this board, in candidate order.
    pub fn nodes(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.slots
            .iter()
            .filter_map(|slot| self.node_of(*slot))
            .filter(|node| seen.insert(*node))
            .collect()
    }

    pub fn add_score(&mut self, slot: SlotId, delta: i64) {
        if let Some(score) = self.scores.get_mut(&slot) {
            *score = score.wrapping_add(delta);
        }
    }

    pub fn reset_score(&mut self, slot: SlotId) {
        if let Some(score) = self.scores.get_mut(&slot) {
            *score = 0;
        }
    }

    /// Score of `slot`; 0 for slots not on this board.
    pub fn score(&self, slot: SlotId) -> i64 {
        self.scores.get(&slot).copied().unwrap_or(0)
    }

    pub fn mark_invalid(&mut self, slot: SlotId) {
        if self.contains(slot) {
            self.invalid.insert(slot);
        }
    }

    pub fn mark_all_invalid(&mut self) {
        self.invalid.extend(self.slots.iter().copied());
    }

    pub fn reset_invalid(&mut self) {
        self.invalid.clear();
    }

    pub fn is_invalid(&self, slot: SlotId) -> bool {
        self.invalid.contains(&slot)
    }

    /// Add `delta` to every slot hosted on `node`. Returns how many slots matched.
    pub fn add_score_to_node(&mut self, node: &str, delta: i64) -> usize {
        let slots = self.slots_on(node);
        for slot in &slots {
            self.add_score(*slot, delta);
        }
        slots.len()
    }

    pub fn reset_node_score(&mut self, node: &str) {
        for slot in self.slots_on(node) {
            self.reset_score(slot);
        }
    }

    pub fn mark_node_invalid(&mut self, node: &str) {
        for slot in self.slots_on(node) {
            self.invalid.insert(slot);
        }
    }

    fn slots_on(&self, node: &str) -> Vec<SlotId> {
        self.slots
            .iter()
            .copied()
            .filter(|slot| self.node_of(*slot) == Some(node))
            .collect()
    }
}
