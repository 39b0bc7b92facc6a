//! Minimum-interval gate between scheduling decisions.
//!
//! When many tasks are queued at once the host's own bookkeeping of which
//! executors are about to be consumed may lag behind, and two decisions made
//! back to back can both pick the same slot. With throttling enabled, a
//! request that arrives sooner than `min_interval_ms` after the previous
//! decision is deferred and left for the host queue to retry.
//!
//! Lock-free: the last-decision timestamp is an `AtomicU64`. Admission
//! reserves the window with a compare-and-swap, so two overlapping requests
//! can never both be admitted inside one interval; finishing a decision
//! moves the timestamp forward to the completion time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// No decision has been made yet.
const NEVER: u64 = u64::MAX;

/// Source of milliseconds for the gate.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Milliseconds since the clock was created, from a monotonic source.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(NEVER - 1)
    }
}

/// Hand-driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Throttle configuration, read once per scheduling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    pub enabled: bool,
    pub min_interval_ms: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            min_interval_ms: 1000,
        }
    }
}

/// Shared gate. One per balancer.
pub struct ThrottleGate {
    last_decision: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl ThrottleGate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            last_decision: AtomicU64::new(NEVER),
            clock,
        }
    }

    /// Try to start a decision.
    ///
    /// Returns `None` when throttling is enabled and the previous decision
    /// is less than `min_interval_ms` old. A disabled gate always admits.
    pub fn admit(&self, settings: &ThrottleSettings) -> Option<ThrottlePermit<'_>> {
        if !settings.enabled {
            return Some(ThrottlePermit { gate: self });
        }

        let now = self.clock.now_millis();
        let mut last = self.last_decision.load(Ordering::Acquire);
        loop {
            if last != NEVER && now.saturating_sub(last) < settings.min_interval_ms {
                return None;
            }
            match self.last_decision.compare_exchange_weak(
                last,
                now,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(ThrottlePermit { gate: self }),
                Err(current) => last = current,
            }
        }
    }

    /// Timestamp of the most recent decision, if any.
    pub fn last_decision_millis(&self) -> Option<u64> {
        match self.last_decision.load(Ordering::Acquire) {
            NEVER => None,
            millis => Some(millis),
        }
    }

    fn record_completion(&self) {
        let now = self.clock.now_millis();
        let _ = self
            .last_decision
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                if last == NEVER || now > last { Some(now) } else { None }
            });
    }
}

/// Held for the duration of one decision; records its completion on drop.
#[must_use = "dropping the permit immediately records the decision"]
pub struct ThrottlePermit<'g> {
    gate: &'g ThrottleGate,
}

impl Drop for ThrottlePermit<'_> {
    fn drop(&mut self) {
        self.gate.record_completion();
    }
}
