//! Placement error types.

use thiserror::Error;

use crate::worksheet::SlotId;

/// Errors that can occur while computing a placement.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// A scoring policy failed mid-chain. Aborts the whole attempt.
    #[error("scoring policy `{policy}` failed: {source}")]
    PolicyFailure {
        policy: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("chunk {chunk} references unknown slot {slot}")]
    UnknownSlot { chunk: usize, slot: SlotId },

    #[error("no fallback load balancer is installed")]
    NoFallbackAvailable,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type PlacementResult<T> = Result<T, PlacementError>;
