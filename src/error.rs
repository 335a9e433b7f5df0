//! Error types for the delegator library and CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//!
//! Failures inside a delegated job never surface as `DelegatorError`: they are
//! normalized into the job's `status`/`error` fields so that sibling jobs keep
//! running. This type covers the cases that prevent a run from starting at all
//! (bad input, unusable home directory, artifact persistence failures).

use crate::exit_codes;
use thiserror::Error;

/// Main error type for delegator operations.
#[derive(Error, Debug)]
pub enum DelegatorError {
    /// User provided invalid arguments or the environment is unusable.
    #[error("{0}")]
    UserError(String),

    /// A persisted artifact could not be serialized.
    #[error("failed to serialize {artifact}: {message}")]
    Serialization { artifact: String, message: String },
}

impl DelegatorError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DelegatorError::UserError(_) => exit_codes::USER_ERROR,
            DelegatorError::Serialization { .. } => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for delegator operations.
pub type Result<T> = std::result::Result<T, DelegatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = DelegatorError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = DelegatorError::UserError("task must not be empty".to_string());
        assert_eq!(err.to_string(), "task must not be empty");

        let err = DelegatorError::Serialization {
            artifact: "autopilot_plan.json".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to serialize autopilot_plan.json: boom"
        );
    }
}
