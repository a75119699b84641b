//! The network-reader adapter.

use std::fmt;

/// A source of version-qualified distribution artifacts (manifests, full
/// payloads, delta payloads).
pub trait Reader: fmt::Debug + Send + Sync {
    /// Fetch `name` (already carrying any codec extension) from `version`.
    fn get(&self, version: &str, name: &str) -> Result<Vec<u8>, ReaderError>;
}

/// The requested artifact was not available.
#[derive(Debug, thiserror::Error)]
#[error("reader error: {0}")]
pub struct ReaderError(pub String);

/// The default [`Reader`]: every request fails. Useful when the caller only
/// ever builds distributions and never plans/applies patches.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingReader;

impl Reader for FailingReader {
    fn get(&self, version: &str, name: &str) -> Result<Vec<u8>, ReaderError> {
        Err(ReaderError(format!(
            "no reader configured (requested {name} at version {version})"
        )))
    }
}

/// A [`Reader`] that fetches `<prefix><version>/<name>` over HTTP(S).
#[cfg(feature = "url-reader")]
#[derive(Debug)]
pub struct UrlReader {
    prefix: String,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "url-reader")]
impl UrlReader {
    /// Build a reader that composes URLs as `prefix + version + "/" + name`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

#[cfg(feature = "url-reader")]
impl Reader for UrlReader {
    fn get(&self, version: &str, name: &str) -> Result<Vec<u8>, ReaderError> {
        let url = format!("{}{}/{}", self.prefix, version, name);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ReaderError(e.to_string()))?
            .error_for_status()
            .map_err(|e| ReaderError(e.to_string()))?;
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ReaderError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_reader_always_errors() {
        assert!(FailingReader.get("1", "manifest").is_err());
    }
}
