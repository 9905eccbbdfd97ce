//! Error types for external model merging.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::step::StepError;

/// Failure to read the bytes of a model reference.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Reading a local file failed.
    #[error("Failed to read model file: {path}")]
    FileRead {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An HTTP request failed.
    #[error("Failed to download {url}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// Transport or status description.
        message: String,
    },

    /// The content is not valid UTF-8 text.
    #[error("Model content is not text: {reference}")]
    NotText {
        /// Model reference.
        reference: String,
    },
}

impl FetchError {
    /// Creates a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates an HTTP error.
    pub fn http(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Failure to merge one external model. Recovered as a warning.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The fetch did not finish in time.
    #[error("Timed out after {timeout:?} fetching {reference}")]
    Timeout {
        /// Model reference.
        reference: String,
        /// Configured limit.
        timeout: Duration,
    },

    /// The model content is empty.
    #[error("Model is empty: {reference}")]
    Empty {
        /// Model reference.
        reference: String,
    },

    /// The model is not valid STEP text.
    #[error("Failed to parse model: {0}")]
    Parse(#[source] StepError),

    /// Splicing into the target failed.
    #[error("Failed to merge model: {0}")]
    Merge(#[source] StepError),

    /// Nothing solid was left after filtering.
    #[error("Model contains no solids after filtering")]
    NoSolids,

    /// A background task panicked or was cancelled.
    #[error("Model task failed: {message}")]
    Task {
        /// Join error description.
        message: String,
    },
}

impl ModelError {
    /// Creates an empty-model error.
    pub fn empty(reference: impl Into<String>) -> Self {
        Self::Empty {
            reference: reference.into(),
        }
    }

    /// Creates a task failure error.
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_reference() {
        let err = ModelError::Timeout {
            reference: "https://example.com/part.step".to_string(),
            timeout: Duration::from_secs(2),
        };
        assert!(err.to_string().contains("part.step"));

        let err = ModelError::from(FetchError::http("https://x/y.step", "status 404"));
        assert_eq!(err.to_string(), "Failed to download https://x/y.step: status 404");
    }
}
