//! The scoring load balancer.
//!
//! Entry point for the host queue. Each call to [`ScoringBalancer::decide`]:
//!
//! 1. Snapshots the current [`BalancerConfig`].
//! 2. Asks the [`ThrottleGate`] for a permit; a refusal is returned as
//!    [`Decision::Deferred`] without touching the fallback.
//! 3. Runs the [`Assigner`] if the balancer is enabled.
//! 4. Hands the unchanged request to the [`FallbackDispatcher`] when
//!    disabled, when a policy fails, or when no assignment exists.
//!
//! `decide` takes `&self` and never blocks; concurrent calls only meet at
//! the throttle timestamp and the config handle.

use std::sync::{Arc, PoisonError, RwLock};

use rand::Rng;
use tracing::{debug, error, info};

use crate::assigner::Assigner;
use crate::chain::PolicyChain;
use crate::config::BalancerConfig;
use crate::error::PlacementError;
use crate::fallback::{FallbackDispatcher, LoadBalancer};
use crate::mapping::PlacementPlan;
use crate::report::ReportSink;
use crate::throttle::{Clock, MonotonicClock, ThrottleGate};
use crate::worksheet::{Task, Worksheet};

/// Why the scoring engine did not place the task itself.
#[derive(Debug)]
pub enum FallbackReason {
    Disabled,
    PolicyFailure(PlacementError),
    NoAssignmentFound,
}

/// Outcome of one scheduling request.
#[derive(Debug)]
pub enum Decision {
    /// The scoring engine found a complete, valid placement.
    Placed(PlacementPlan),
    /// The fallback balancer was consulted; `plan` is its answer.
    Delegated {
        reason: FallbackReason,
        plan: Option<PlacementPlan>,
    },
    /// Throttled. The host should retry later.
    Deferred,
    /// A fallback was needed but none is installed.
    Undecided { reason: FallbackReason },
}

impl Decision {
    pub fn plan(&self) -> Option<&PlacementPlan> {
        match self {
            Decision::Placed(plan) => Some(plan),
            Decision::Delegated { plan, .. } => plan.as_ref(),
            Decision::Deferred | Decision::Undecided { .. } => None,
        }
    }

    pub fn into_plan(self) -> Option<PlacementPlan> {
        match self {
            Decision::Placed(plan) => Some(plan),
            Decision::Delegated { plan, .. } => plan,
            Decision::Deferred | Decision::Undecided { .. } => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Decision::Deferred)
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Decision::Delegated { reason, .. } | Decision::Undecided { reason } => Some(reason),
            Decision::Placed(_) | Decision::Deferred => None,
        }
    }
}

pub struct ScoringBalancer {
    config: RwLock<Arc<BalancerConfig>>,
    fallback: FallbackDispatcher,
    gate: ThrottleGate,
    sink: Option<Arc<dyn ReportSink>>,
}

impl ScoringBalancer {
    pub fn new(config: BalancerConfig, fallback: Option<Arc<dyn LoadBalancer>>) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            fallback: FallbackDispatcher::new(fallback),
            gate: ThrottleGate::new(Arc::new(MonotonicClock::new())),
            sink: None,
        }
    }

    /// Replace the host's current balancer, keeping it as the fallback.
    pub fn install(previous: Option<Arc<dyn LoadBalancer>>, config: BalancerConfig) -> Arc<Self> {
        info!(
            has_fallback = previous.is_some(),
            policies = config.policies.len(),
            "installing scoring load balancer"
        );
        Arc::new(Self::new(config, previous))
    }

    /// Use a different time source for the throttle gate.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.gate = ThrottleGate::new(clock);
        self
    }

    /// Also deliver score reports to `sink` when reporting is enabled.
    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<BalancerConfig> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap the configuration. Attempts already running keep their snapshot.
    pub fn reconfigure(&self, config: BalancerConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
        debug!("scoring load balancer reconfigured");
    }

    pub fn fallback(&self) -> &FallbackDispatcher {
        &self.fallback
    }

    pub fn gate(&self) -> &ThrottleGate {
        &self.gate
    }

    /// Decide where `task` runs, using the thread-local RNG for tie-breaks.
    pub fn decide(&self, task: &Task, worksheet: &Worksheet) -> Decision {
        self.decide_with_rng(task, worksheet, &mut rand::rng())
    }

    pub fn decide_with_rng<R: Rng + ?Sized>(
        &self,
        task: &Task,
        worksheet: &Worksheet,
        rng: &mut R,
    ) -> Decision {
        let config = self.config();

        let Some(_permit) = self.gate.admit(&config.throttle) else {
            debug!(
                task = %task.id,
                interval_ms = config.throttle.min_interval_ms,
                "previous decision too recent, deferring"
            );
            return Decision::Deferred;
        };

        let reason = if config.enabled {
            let chain = PolicyChain::new(&config.policies);
            let result = Assigner::new(task, worksheet, chain, rng)
                .with_reports(config.report_scores, self.sink.as_deref())
                .assign();
            match result {
                Ok(Some(plan)) => {
                    debug!(task = %task.id, chunks = plan.placements.len(), "placed by score");
                    return Decision::Placed(plan);
                }
                Ok(None) => {
                    debug!(task = %task.id, "no valid assignment found");
                    FallbackReason::NoAssignmentFound
                }
                Err(err) => {
                    error!(
                        task = %task.id,
                        error = %err,
                        "failed to load balance with scores, falling back"
                    );
                    FallbackReason::PolicyFailure(err)
                }
            }
        } else {
            FallbackReason::Disabled
        };

        match self.fallback.dispatch(task, worksheet) {
            Ok(plan) => {
                info!(
                    task = %task.id,
                    reason = ?reason,
                    placed = plan.is_some(),
                    "delegated to fallback load balancer"
                );
                Decision::Delegated { reason, plan }
            }
            Err(_) => Decision::Undecided { reason },
        }
    }
}

impl LoadBalancer for ScoringBalancer {
    fn map(&self, task: &Task, worksheet: &Worksheet) -> Option<PlacementPlan> {
        self.decide(task, worksheet).into_plan()
    }
}
