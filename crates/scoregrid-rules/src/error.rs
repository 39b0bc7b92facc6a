//! Rule configuration errors.

use thiserror::Error;

use scoregrid_placement::PlacementError;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid `{field}` for {rule} rule: {message}")]
    InvalidParameter {
        rule: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("build_result rule configured but no build history source was provided")]
    MissingHistory,

    #[error(transparent)]
    Placement(#[from] PlacementError),
}

pub type RuleResult<T> = Result<T, RuleError>;
