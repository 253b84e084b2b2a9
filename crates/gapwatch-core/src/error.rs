// Error taxonomy for the transform-and-rank pipeline.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// One or more required columns are absent from the input table.
    #[error("missing required fields: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Zero records where at least one is required.
    #[error("no records available: {context}")]
    EmptyInput { context: String },

    /// A numeric field is absent, non-numeric, or outside its permitted range.
    #[error("invalid value for `{field}` at row {row}: {reason}")]
    DataType {
        row: usize,
        field: &'static str,
        reason: String,
    },

    #[error("rolling window size must be at least 1")]
    InvalidWindow,

    #[error("leaderboard size must be at least 1")]
    InvalidLeaderboardSize,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
