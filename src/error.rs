//! Error types for SpeedShare
//!
//! All agent-level failures are classified into a small taxonomy so the
//! arbiter loop can decide what to do without string matching:
//!
//! - [`SpeedShareError::Connection`] — agent unreachable or auth failed;
//!   recovered by the supervisor's lazy reconnect on the next tick.
//! - [`SpeedShareError::Protocol`] — unexpected response shape; the agent is
//!   treated as inactive for the tick.
//! - [`SpeedShareError::Apply`] — a speed-limit call failed; logged and
//!   retried naturally on the next differing tick.
//!
//! None of these is ever fatal to the loop. Uses `thiserror` for ergonomic
//! `Display`/`Error` derives.

use thiserror::Error;

/// The primary error type for SpeedShare operations.
#[derive(Error, Debug)]
pub enum SpeedShareError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Agent unreachable, timed out, or rejected credentials.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Agent responded, but not in the shape its protocol promises.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A speed-limit apply call failed.
    #[error("Apply error: {0}")]
    Apply(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpeedShareError {
    /// Returns `true` if this error means the agent's session is gone and the
    /// supervisor should mark it disconnected.
    pub fn is_connection(&self) -> bool {
        matches!(self, SpeedShareError::Connection(_))
    }
}

/// Classify a `reqwest` failure into the taxonomy.
///
/// Transport-level failures (refused, DNS, timeout) mean the agent is
/// unreachable; anything after a response arrived (status, body decode) is a
/// protocol problem.
impl From<reqwest::Error> for SpeedShareError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            SpeedShareError::Connection(err.to_string())
        } else {
            SpeedShareError::Protocol(err.to_string())
        }
    }
}

/// A specialized `Result` type for SpeedShare operations.
pub type Result<T> = std::result::Result<T, SpeedShareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpeedShareError::Config("missing SABnzbd API key".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: missing SABnzbd API key"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SpeedShareError = io_err.into();
        assert!(matches!(err, SpeedShareError::Io(_)));
    }

    #[test]
    fn test_is_connection() {
        assert!(SpeedShareError::Connection("refused".into()).is_connection());
        assert!(!SpeedShareError::Protocol("bad json".into()).is_connection());
        assert!(!SpeedShareError::Apply("denied".into()).is_connection());
    }
}
