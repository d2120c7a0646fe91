//! Error types for the fuzzing core.
//!
//! Most variants are invariant violations: a builder or mutator defect that
//! must abort the current mutation attempt (see
//! [`Error::is_invariant_violation`]). The rest report failures around the
//! core, such as bad configuration, serialization or program execution. A
//! mutator declining to mutate is not an error and is reported as `Ok(None)`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An input variable is not defined or not visible at this point.
    #[error("Invalid reference to v{variable} at instruction {index}")]
    InvalidReference { variable: u32, index: usize },

    #[error("Builder used after finalize")]
    UseAfterFinalize,

    #[error("Malformed block nesting: {0}")]
    MalformedNesting(String),

    #[error("Arity mismatch for {operation}: expected {expected} inputs, got {actual}")]
    ArityMismatch {
        operation: String,
        expected: usize,
        actual: usize,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    /// The post-mutation validity check rejected a mutator's output.
    #[error("Mutator {mutator} produced an invalid program: {reason}")]
    MutatorDefect { mutator: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The lifter or the execution backend failed to run a program.
    #[error("Execution error: {0}")]
    Execution(String),
}

impl Error {
    /// Structural errors that can only come from a bug in the builder or a mutator.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::InvalidReference { .. }
                | Error::UseAfterFinalize
                | Error::MalformedNesting(_)
                | Error::ArityMismatch { .. }
                | Error::Validation(_)
                | Error::MutatorDefect { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidReference { variable: 7, index: 3 };
        assert_eq!(err.to_string(), "Invalid reference to v7 at instruction 3");
        assert!(err.is_invariant_violation());

        let err = Error::Serialization("bad".to_string());
        assert!(!err.is_invariant_violation());
    }

    #[test]
    fn test_ambient_errors_are_not_invariant_violations() {
        assert!(!Error::Config("weights".to_string()).is_invariant_violation());
        assert!(!Error::Execution("timeout".to_string()).is_invariant_violation());
        assert!(Error::UseAfterFinalize.is_invariant_violation());
        assert!(Error::MutatorDefect {
            mutator: "InputMutator".to_string(),
            reason: "bad".to_string(),
        }
        .is_invariant_violation());
    }
}
