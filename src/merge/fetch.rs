//! Fetching model text from URLs and paths.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::error::{FetchError, ModelError};

/// Upper bound on a downloaded model body.
const MAX_MODEL_BYTES: u64 = 256 * 1024 * 1024;

/// Reads the text behind a model reference.
///
/// Implementations are blocking; [`fetch_with_timeout`] moves them off the
/// async runtime.
pub trait FetchModel: Send + Sync {
    /// Returns the text of the model at `reference` (URL or path).
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the content cannot be read.
    fn fetch(&self, reference: &str) -> Result<String, FetchError>;
}

/// Fetches `http(s)://` references over the network and everything else
/// from the filesystem.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    agent: ureq::Agent,
}

impl DefaultFetcher {
    /// Creates a fetcher whose HTTP requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn fetch_url(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(url, "Downloading model");
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| FetchError::http(url, e.to_string()))?;
        response
            .into_body()
            .with_config()
            .limit(MAX_MODEL_BYTES)
            .read_to_string()
            .map_err(|e| FetchError::http(url, e.to_string()))
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(30)))
    }
}

impl FetchModel for DefaultFetcher {
    fn fetch(&self, reference: &str) -> Result<String, FetchError> {
        if is_url(reference) {
            return self.fetch_url(reference);
        }
        let path = Path::new(reference.strip_prefix("file://").unwrap_or(reference));
        let bytes = std::fs::read(path).map_err(|e| FetchError::file_read(path, e))?;
        String::from_utf8(bytes).map_err(|_| FetchError::NotText {
            reference: reference.to_string(),
        })
    }
}

fn is_url(reference: &str) -> bool {
    let lower = reference.get(..8).unwrap_or(reference).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Runs a blocking fetch on the blocking pool, bounded by `timeout`.
///
/// # Errors
///
/// Returns [`ModelError::Timeout`] when the limit elapses,
/// [`ModelError::Fetch`] when the fetcher fails and [`ModelError::Task`]
/// when the blocking task panics.
pub async fn fetch_with_timeout(
    fetcher: Arc<dyn FetchModel>,
    reference: String,
    timeout: Option<Duration>,
) -> Result<String, ModelError> {
    let task_reference = reference.clone();
    let task = tokio::task::spawn_blocking(move || fetcher.fetch(&task_reference));

    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| ModelError::Timeout {
                reference: reference.clone(),
                timeout: limit,
            })?,
        None => task.await,
    };

    Ok(joined.map_err(|e| ModelError::task(e.to_string()))??)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    struct SlowFetcher;

    impl FetchModel for SlowFetcher {
        fn fetch(&self, _reference: &str) -> Result<String, FetchError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(String::new())
        }
    }

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/a.step"));
        assert!(is_url("HTTP://example.com/a.step"));
        assert!(!is_url("models/a.step"));
        assert!(!is_url("file:///tmp/a.step"));
    }

    #[test]
    fn reads_local_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ISO-10303-21;").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let fetcher = DefaultFetcher::default();
        assert_eq!(fetcher.fetch(&path).unwrap(), "ISO-10303-21;");
        assert_eq!(
            fetcher.fetch(&format!("file://{path}")).unwrap(),
            "ISO-10303-21;"
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.step");
        let err = DefaultFetcher::default()
            .fetch(&missing.to_string_lossy())
            .unwrap_err();
        assert!(matches!(err, FetchError::FileRead { .. }));
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let result = fetch_with_timeout(
            Arc::new(SlowFetcher),
            "slow.step".to_string(),
            Some(Duration::from_millis(20)),
        )
        .await;
        assert!(matches!(result, Err(ModelError::Timeout { .. })));
    }
}
