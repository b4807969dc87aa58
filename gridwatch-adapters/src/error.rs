//! Error types for adapters.

use std::io;

use thiserror::Error;

/// Errors that can occur while querying the clock daemon or capturing frames.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The external tool is not installed or cannot be started.
    #[error("Tool unavailable: {0}")]
    Unavailable(String),

    /// Insufficient privileges (raw capture and the pmc socket need root).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The capture could not be opened (unknown interface, bad filter).
    #[error("Capture failed: {0}")]
    Capture(String),

    /// I/O failure talking to the external tool.
    #[error("I/O error: {0}")]
    Io(String),

    /// The clock daemon did not answer the management query.
    #[error("No response from clock daemon")]
    NoResponse,

    /// Timeout waiting for the external tool.
    #[error("Request timed out")]
    Timeout,

    /// Failed to parse captured data.
    #[error("Failed to parse capture: {0}")]
    Parse(String),

    /// A recorded input exists but cannot be used.
    #[error("Unusable recording: {0}")]
    Recording(String),
}

impl AdapterError {
    /// Whether this error makes the whole run impossible.
    ///
    /// Setup errors are reported once and end the run; the rest only cost
    /// the current query cycle.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            AdapterError::Unavailable(_)
                | AdapterError::PermissionDenied(_)
                | AdapterError::Capture(_)
                | AdapterError::Io(_)
                | AdapterError::Recording(_)
        )
    }

    /// Map a failure to spawn `program` to the matching variant.
    pub fn from_spawn(program: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => {
                AdapterError::Unavailable(format!("{} not found in PATH", program))
            }
            io::ErrorKind::PermissionDenied => {
                AdapterError::PermissionDenied(format!("cannot execute {}", program))
            }
            _ => AdapterError::Io(format!("{}: {}", program, err)),
        }
    }
}

impl From<io::Error> for AdapterError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => AdapterError::PermissionDenied(err.to_string()),
            io::ErrorKind::TimedOut => AdapterError::Timeout,
            _ => AdapterError::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_classification() {
        assert!(AdapterError::Unavailable("pmc".into()).is_setup());
        assert!(AdapterError::PermissionDenied("eth0".into()).is_setup());
        assert!(AdapterError::Capture("no such device".into()).is_setup());
        assert!(!AdapterError::Timeout.is_setup());
        assert!(!AdapterError::NoResponse.is_setup());
        assert!(!AdapterError::Parse("truncated".into()).is_setup());
        assert!(AdapterError::Recording("status.log: bad block time".into()).is_setup());
    }

    #[test]
    fn spawn_not_found_is_unavailable() {
        let err = AdapterError::from_spawn("pmc", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, AdapterError::Unavailable(ref m) if m.contains("pmc")));
    }

    #[test]
    fn io_error_mapping() {
        let err: AdapterError = io::Error::from(io::ErrorKind::TimedOut).into();
        assert!(matches!(err, AdapterError::Timeout));
        let err: AdapterError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, AdapterError::PermissionDenied(_)));
    }
}
