//! scoregrid-rules — built-in scoring policies for the scoring balancer.
//!
//! - **`node_load`** — prefer slots with idle executors
//! - **`node_preference`** — static per-node and per-project preferences
//! - **`build_result`** — prefer nodes where the project recently built well
//! - **`settings`** — TOML settings that assemble a `BalancerConfig`

pub mod build_result;
pub mod error;
pub mod history;
pub mod node_load;
pub mod node_preference;
pub mod settings;

pub use build_result::{BuildResultRule, BuildResultSettings};
pub use error::{RuleError, RuleResult};
pub use history::{BuildHistory, BuildOutcome, BuildRecord, StaticBuildHistory};
pub use node_load::NodeLoadRule;
pub use node_preference::{NodePreferenceRule, ProjectPreference};
pub use settings::{BalancerSettings, PolicySpec};
