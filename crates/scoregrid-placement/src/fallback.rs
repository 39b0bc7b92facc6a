//! Delegation to the previously installed load balancer.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{PlacementError, PlacementResult};
use crate::mapping::{Mapping, PlacementPlan};
use crate::worksheet::{Task, Worksheet};

/// A placement strategy the host can install.
///
/// `None` means "no decision": the host leaves the task queued.
pub trait LoadBalancer: Send + Sync {
    fn map(&self, task: &Task, worksheet: &Worksheet) -> Option<PlacementPlan>;
}

/// Holds whatever strategy was in effect before the scoring balancer.
#[derive(Clone, Default)]
pub struct FallbackDispatcher {
    fallback: Option<Arc<dyn LoadBalancer>>,
}

impl FallbackDispatcher {
    pub fn new(fallback: Option<Arc<dyn LoadBalancer>>) -> Self {
        Self { fallback }
    }

    pub fn is_configured(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn fallback(&self) -> Option<&Arc<dyn LoadBalancer>> {
        self.fallback.as_ref()
    }

    /// Pass the request through unchanged. The fallback's answer is not
    /// re-validated.
    pub fn dispatch(
        &self,
        task: &Task,
        worksheet: &Worksheet,
    ) -> PlacementResult<Option<PlacementPlan>> {
        match &self.fallback {
            Some(balancer) => Ok(balancer.map(task, worksheet)),
            None => {
                error!(
                    task = %task.id,
                    "no load balancer to fall back to is installed: tasks are never launched"
                );
                Err(PlacementError::NoFallbackAvailable)
            }
        }
    }
}

/// Unscored strategy: each chunk takes the first applicable slot that keeps
/// the mapping valid, backtracking when a later chunk cannot fit.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFitBalancer;

impl FirstFitBalancer {
    fn search(mapping: &mut Mapping<'_>, worksheet: &Worksheet, index: usize) -> bool {
        let Some(chunk) = worksheet.chunk(index) else {
            return mapping.is_completely_valid();
        };
        for slot in &chunk.applicable {
            mapping.assign(index, Some(*slot));
            if mapping.is_partially_valid() && Self::search(mapping, worksheet, index + 1) {
                return true;
            }
        }
        mapping.assign(index, None);
        false
    }
}

impl LoadBalancer for FirstFitBalancer {
    fn map(&self, task: &Task, worksheet: &Worksheet) -> Option<PlacementPlan> {
        let mut mapping = Mapping::new(worksheet);
        if Self::search(&mut mapping, worksheet, 0) {
            mapping.to_plan(task)
        } else {
            debug!(task = %task.id, "first-fit found no placement");
            None
        }
    }
}
