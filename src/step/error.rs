//! Error types for STEP entity graph operations.

use thiserror::Error;

/// Result type for STEP operations.
pub type StepResult<T> = Result<T, StepError>;

/// Errors that can occur while parsing or assembling a STEP entity graph.
#[derive(Debug, Error)]
pub enum StepError {
    /// Malformed Part 21 text.
    #[error("STEP syntax error at line {line}: {message}")]
    Syntax {
        /// Line number (1-indexed) where the offending statement starts.
        line: usize,
        /// Description of what's wrong.
        message: String,
    },

    /// The text is not an ISO-10303-21 exchange file.
    #[error("Not an ISO-10303-21 file: {message}")]
    NotStep {
        /// Description of what's wrong.
        message: String,
    },

    /// The DATA section holds no entities.
    #[error("STEP file contains no entities")]
    Empty,

    /// An id was placed twice into the same repository.
    #[error("Entity id #{0} is already occupied")]
    OccupiedId(u64),

    /// Entity ids start at 1.
    #[error("Entity id #{0} is not a valid id")]
    InvalidId(u64),

    /// A typed reference did not resolve.
    #[error("Missing entity reference: #{0}")]
    MissingEntity(u64),
}

impl StepError {
    /// Creates a syntax error.
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Creates a not-a-STEP-file error.
    pub fn not_step(message: impl Into<String>) -> Self {
        Self::NotStep {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = StepError::syntax(12, "missing '='");
        assert_eq!(err.to_string(), "STEP syntax error at line 12: missing '='");
    }

    #[test]
    fn occupied_id_display() {
        let err = StepError::OccupiedId(42);
        assert_eq!(err.to_string(), "Entity id #42 is already occupied");
    }
}
