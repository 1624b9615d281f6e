use thiserror::Error;

pub type Result<T> = std::result::Result<T, AxisError>;

#[derive(Debug, Error)]
pub enum AxisError {
    #[error("invalid cue argument: {reason}")]
    InvalidArgument { reason: String },
    #[error("interval error: {0}")]
    Interval(#[from] cue_types::IntervalError),
    #[error("invariant violated: {detail}")]
    InvariantViolation { detail: String },
}

impl AxisError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        AxisError::InvariantViolation {
            detail: detail.into(),
        }
    }
}
