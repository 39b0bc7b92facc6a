//! scoregrid-placement — score-driven placement of work chunks onto
//! execution slots.
//!
//! The host queue hands a [`Task`] and its [`Worksheet`] to a
//! [`ScoringBalancer`]. Pluggable [`ScoringPolicy`] implementations score
//! each chunk's candidate slots, and a backtracking search turns those
//! scores into a complete placement, or hands the request to whatever
//! balancer was installed before.
//!
//! # Components
//!
//! - **`score_board`** — per-chunk score and invalidity ledger
//! - **`policy`** / **`chain`** — policy contract and short-circuiting chain
//! - **`mapping`** — chunk → slot assignments and constraint checks
//! - **`assigner`** — shuffle-then-sort backtracking search
//! - **`throttle`** — minimum interval between decisions
//! - **`fallback`** — delegation to the previous balancer
//! - **`balancer`** — the entry point tying it together
//! - **`report`** — optional score diagnostics
//! - **`config`** — settings file and per-attempt snapshot
//!
//! ```text
//! ScoringBalancer::decide(task, worksheet)
//!   ├── ThrottleGate::admit ──────────── refused → Deferred
//!   ├── Assigner (if enabled)
//!   │     └── per chunk: PolicyChain → ScoreBoard → order → try slots
//!   └── FallbackDispatcher (disabled / policy error / nothing fits)
//! ```

pub mod assigner;
pub mod balancer;
pub mod chain;
pub mod config;
pub mod error;
pub mod fallback;
pub mod mapping;
pub mod policy;
pub mod report;
pub mod score_board;
pub mod throttle;
pub mod worksheet;

pub use assigner::{Assigner, order_candidates};
pub use balancer::{Decision, FallbackReason, ScoringBalancer};
pub use chain::{ChainOutcome, PolicyChain};
pub use config::{BalancerConfig, EngineSettings};
pub use error::{PlacementError, PlacementResult};
pub use fallback::{FallbackDispatcher, FirstFitBalancer, LoadBalancer};
pub use mapping::{Mapping, Placement, PlacementPlan};
pub use policy::{PolicyVerdict, ScoringPolicy};
pub use report::{MemorySink, ReportSink, ScoreEntry, ScoreReport};
pub use score_board::ScoreBoard;
pub use throttle::{Clock, ManualClock, MonotonicClock, ThrottleGate, ThrottlePermit, ThrottleSettings};
pub use worksheet::{ExecutionSlot, Occupancy, SlotId, SubTask, Task, WorkChunk, Worksheet};
