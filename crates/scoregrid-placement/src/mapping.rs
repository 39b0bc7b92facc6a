//! Chunk → slot assignments under construction.
//!
//! A [`Mapping`] borrows its worksheet and is owned by a single search.
//! Only a completely valid mapping is ever turned into a [`PlacementPlan`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::worksheet::{SlotId, Task, Worksheet};

#[derive(Debug, Clone)]
pub struct Mapping<'w> {
    worksheet: &'w Worksheet,
    assigned: Vec<Option<SlotId>>,
}

impl<'w> Mapping<'w> {
    /// An empty mapping: no chunk assigned.
    pub fn new(worksheet: &'w Worksheet) -> Self {
        Self {
            worksheet,
            assigned: vec![None; worksheet.chunks().len()],
        }
    }

    pub fn worksheet(&self) -> &'w Worksheet {
        self.worksheet
    }

    /// Number of chunks (assigned or not).
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Assign `chunk` to `slot`, or clear it with `None`.
    pub fn assign(&mut self, chunk: usize, slot: Option<SlotId>) {
        if let Some(entry) = self.assigned.get_mut(chunk) {
            *entry = slot;
        }
    }

    pub fn assigned(&self, chunk: usize) -> Option<SlotId> {
        self.assigned.get(chunk).copied().flatten()
    }

    /// Units about to be consumed on `slot` by chunks assigned so far.
    pub fn pending_units(&self, slot: SlotId) -> u32 {
        self.assigned
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Some(slot))
            .filter_map(|(i, _)| self.worksheet.chunk(i))
            .map(|chunk| chunk.size())
            .fold(0u32, u32::saturating_add)
    }

    /// No constraint is violated by the assignments made so far.
    ///
    /// Checks slot capacity against live occupancy and same-node grouping.
    pub fn is_partially_valid(&self) -> bool {
        let mut load: HashMap<SlotId, u32> = HashMap::new();
        let mut group_nodes: HashMap<&str, &str> = HashMap::new();

        for (index, slot_id) in self.assigned.iter().enumerate() {
            let Some(slot_id) = slot_id else { continue };
            let (Some(chunk), Some(slot)) = (self.worksheet.chunk(index), self.worksheet.slot(*slot_id))
            else {
                return false;
            };

            let used = load.entry(*slot_id).or_insert(0);
            *used = used.saturating_add(chunk.size());
            if *used > slot.available() {
                return false;
            }

            if let Some(group) = chunk.same_node_group.as_deref() {
                let node = group_nodes.entry(group).or_insert(slot.node.as_str());
                if *node != slot.node {
                    return false;
                }
            }
        }
        true
    }

    /// Every chunk is assigned and all constraints hold.
    pub fn is_completely_valid(&self) -> bool {
        self.assigned.iter().all(Option::is_some) && self.is_partially_valid()
    }

    /// Freeze into a plan. Returns `None` unless completely valid.
    pub fn to_plan(&self, task: &Task) -> Option<PlacementPlan> {
        if !self.is_completely_valid() {
            return None;
        }
        let placements = self
            .assigned
            .iter()
            .enumerate()
            .filter_map(|(chunk, slot_id)| {
                let slot_id = (*slot_id)?;
                let slot = self.worksheet.slot(slot_id)?;
                let subtasks = self.worksheet.chunk(chunk)?.subtask_names();
                Some(Placement {
                    chunk,
                    subtasks,
                    slot: slot_id,
                    slot_name: slot.id.clone(),
                    node: slot.node.clone(),
                })
            })
            .collect();
        Some(PlacementPlan {
            task_id: task.id.clone(),
            placements,
        })
    }
}

/// Where one chunk runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub chunk: usize,
    pub subtasks: Vec<String>,
    pub slot: SlotId,
    pub slot_name: String,
    pub node: String,
}

/// A complete placement decision for a task: one entry per chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementPlan {
    pub task_id: String,
    pub placements: Vec<Placement>,
}

impl PlacementPlan {
    pub fn slot_for(&self, chunk: usize) -> Option<SlotId> {
        self.placements.iter().find(|p| p.chunk == chunk).map(|p| p.slot)
    }

    pub fn node_for(&self, chunk: usize) -> Option<&str> {
        self.placements
            .iter()
            .find(|p| p.chunk == chunk)
            .map(|p| p.node.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worksheet::{ExecutionSlot, Occupancy, SubTask};

    fn worksheet(slots: Vec<ExecutionSlot>, chunks: &[(usize, Option<&str>)]) -> Worksheet {
        let all: Vec<SlotId> = (0..slots.len()).map(SlotId).collect();
        let mut ws = Worksheet::new(slots);
        for (i, (size, group)) in chunks.iter().enumerate() {
            let subtasks = (0..*size).map(|j| SubTask::new(format!("c{i}-{j}"))).collect();
            ws.add_chunk(subtasks, all.clone(), group.map(str::to_string)).unwrap();
        }
        ws
    }

    #[test]
    fn empty_mapping_is_partial_but_not_complete() {
        let ws = worksheet(vec![ExecutionSlot::new("a", "a", 1)], &[(1, None)]);
        let m = Mapping::new(&ws);
        assert!(m.is_partially_valid());
        assert!(!m.is_completely_valid());
        assert!(m.to_plan(&Task::new("t", "t")).is_none());
    }

    #[test]
    fn capacity_is_enforced_against_live_occupancy() {
        let occupancy = Occupancy::new(0);
        let ws = worksheet(
            vec![ExecutionSlot::new("a", "a", 2).with_occupancy(occupancy.clone())],
            &[(1, None), (1, None)],
        );
        let mut m = Mapping::new(&ws);
        m.assign(0, Some(SlotId(0)));
        m.assign(1, Some(SlotId(0)));
        assert!(m.is_completely_valid());
        assert_eq!(m.pending_units(SlotId(0)), 2);

        occupancy.acquire(1);
        assert!(!m.is_partially_valid());
    }

    #[test]
    fn same_node_group_must_share_a_node() {
        let ws = worksheet(
            vec![
                ExecutionSlot::new("a1", "a", 1),
                ExecutionSlot::new("a2", "a", 1),
                ExecutionSlot::new("b", "b", 1),
            ],
            &[(1, Some("g")), (1, Some("g"))],
        );
        let mut m = Mapping::new(&ws);
        m.assign(0, Some(SlotId(0)));
        m.assign(1, Some(SlotId(2)));
        assert!(!m.is_partially_valid());

        m.assign(1, Some(SlotId(1)));
        assert!(m.is_completely_valid());
    }

    #[test]
    fn unassign_clears_chunk() {
        let ws = worksheet(vec![ExecutionSlot::new("a", "a", 1)], &[(1, None)]);
        let mut m = Mapping::new(&ws);
        m.assign(0, Some(SlotId(0)));
        assert_eq!(m.assigned(0), Some(SlotId(0)));
        m.assign(0, None);
        assert_eq!(m.assigned(0), None);
        assert_eq!(m.pending_units(SlotId(0)), 0);
    }

    #[test]
    fn plan_lists_every_chunk() {
        let ws = worksheet(
            vec![ExecutionSlot::new("a", "node-a", 1), ExecutionSlot::new("b", "node-b", 1)],
            &[(1, None), (1, None)],
        );
        let mut m = Mapping::new(&ws);
        m.assign(0, Some(SlotId(1)));
        m.assign(1, Some(SlotId(0)));

        let plan = m.to_plan(&Task::new("t-1", "build")).unwrap();
        assert_eq!(plan.task_id, "t-1");
        assert_eq!(plan.placements.len(), 2);
        assert_eq!(plan.node_for(0), Some("node-b"));
        assert_eq!(plan.slot_for(1), Some(SlotId(0)));
        assert_eq!(plan.placements[0].subtasks, vec!["c0-0".to_string()]);
    }
}
