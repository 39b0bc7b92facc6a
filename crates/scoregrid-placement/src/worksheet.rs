//! Scheduling inputs: tasks, work chunks and execution slots.
//!
//! A [`Worksheet`] is what the host queue hands the balancer for one task:
//! the candidate [`ExecutionSlot`]s and the ordered [`WorkChunk`]s that must
//! each land on one of them. The balancer never mutates a worksheet.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, PlacementResult};

/// Index of a slot within its [`Worksheet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The root unit of work submitted for scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One sub-unit of a task. Occupies a single executor when placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub name: String,
    /// Project the subtask builds, if any. History-based rules key on this.
    pub project: Option<String>,
}

impl SubTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: None,
        }
    }

    pub fn for_project(name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: Some(project.into()),
        }
    }
}

impl fmt::Display for SubTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Busy-executor counter for a slot.
///
/// Owned and updated by the host platform; cloning shares the same counter,
/// so the balancer always reads the live value.
#[derive(Debug, Clone, Default)]
pub struct Occupancy(Arc<AtomicU32>);

impl Occupancy {
    pub fn new(busy: u32) -> Self {
        Self(Arc::new(AtomicU32::new(busy)))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, busy: u32) {
        self.0.store(busy, Ordering::Release);
    }

    pub fn acquire(&self, units: u32) {
        self.0.fetch_add(units, Ordering::AcqRel);
    }

    pub fn release(&self, units: u32) {
        // Saturate at zero rather than wrap.
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |busy| {
                Some(busy.saturating_sub(units))
            });
    }
}

/// A node's executor group: a candidate placement target.
#[derive(Debug, Clone)]
pub struct ExecutionSlot {
    pub id: String,
    pub node: String,
    /// Total executors on this slot.
    pub capacity: u32,
    occupancy: Occupancy,
}

impl ExecutionSlot {
    pub fn new(id: impl Into<String>, node: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            node: node.into(),
            capacity,
            occupancy: Occupancy::default(),
        }
    }

    /// Attach a host-owned occupancy counter.
    pub fn with_occupancy(mut self, occupancy: Occupancy) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    pub fn busy(&self) -> u32 {
        self.occupancy.get()
    }

    /// Executors currently free to accept work.
    pub fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.busy())
    }
}

/// Subtasks that must all run on the same execution slot.
#[derive(Debug, Clone)]
pub struct WorkChunk {
    pub index: usize,
    pub subtasks: Vec<SubTask>,
    /// Pre-filtered candidate slots, in host order.
    pub applicable: Vec<SlotId>,
    /// Chunks sharing a group key must be placed on the same node.
    pub same_node_group: Option<String>,
}

impl WorkChunk {
    /// Units this chunk consumes on its slot.
    pub fn size(&self) -> u32 {
        u32::try_from(self.subtasks.len()).unwrap_or(u32::MAX)
    }

    pub fn subtask_names(&self) -> Vec<String> {
        self.subtasks.iter().map(|s| s.name.clone()).collect()
    }
}

/// Slots and ordered chunks for one task.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    slots: Vec<ExecutionSlot>,
    chunks: Vec<WorkChunk>,
}

impl Worksheet {
    pub fn new(slots: Vec<ExecutionSlot>) -> Self {
        Self {
            slots,
            chunks: Vec::new(),
        }
    }

    /// Append a chunk; returns its index.
    ///
    /// Every applicable slot must exist in this worksheet.
    pub fn add_chunk(
        &mut self,
        subtasks: Vec<SubTask>,
        applicable: Vec<SlotId>,
        same_node_group: Option<String>,
    ) -> PlacementResult<usize> {
        let index = self.chunks.len();
        if let Some(missing) = applicable.iter().find(|id| id.0 >= self.slots.len()) {
            return Err(PlacementError::UnknownSlot {
                chunk: index,
                slot: *missing,
            });
        }
        self.chunks.push(WorkChunk {
            index,
            subtasks,
            applicable,
            same_node_group,
        });
        Ok(index)
    }

    pub fn slots(&self) -> &[ExecutionSlot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&ExecutionSlot> {
        self.slots.get(id.0)
    }

    /// Look a slot up by its host identity.
    pub fn slot_id(&self, id: &str) -> Option<SlotId> {
        self.slots.iter().position(|s| s.id == id).map(SlotId)
    }

    pub fn chunks(&self) -> &[WorkChunk] {
        &self.chunks
    }

    pub fn chunk(&self, index: usize) -> Option<&WorkChunk> {
        self.chunks.get(index)
    }
}
