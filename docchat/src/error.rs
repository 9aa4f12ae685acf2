//! Unified error types for docchat.
//!
//! Rejections raised by the session store, failures normalised by the
//! transport gateway and configuration problems all live here. Every
//! concern-specific error converts into the top-level [`Error`].

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for docchat operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A session command was rejected.
    #[error("session: {0}")]
    Session(#[from] SessionError),

    /// A remote call failed.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Create a config error from a string.
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(ConfigError::Invalid(msg.into()))
    }
}

/// Result type alias for docchat operations.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Session Rejections
// ============================================================================

/// A command the session store refused to run.
///
/// Rejections never touch the session state: no message is appended, the
/// busy flag is unchanged and the gateway is not called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Another upload or question is still in flight.
    #[error("another request is in flight")]
    Busy,

    /// A question was asked before any document was uploaded.
    #[error("no document has been uploaded")]
    NoActiveDocument,

    /// The question was empty after trimming.
    #[error("question is empty")]
    EmptyInput,

    /// An upload was requested without a file.
    #[error("no file selected")]
    MissingFile,
}

// ============================================================================
// Transport Errors
// ============================================================================

/// A normalised failure of one of the two remote calls.
///
/// The `Display` output is the human-readable description placed into the
/// conversation log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request never reached the server.
    #[error("could not reach the server ({0})")]
    NetworkUnreachable(String),

    /// The server answered with a non-success status.
    #[error("{}", rejected_text(.status, .message.as_deref()))]
    ServerRejected {
        /// HTTP status code.
        status: u16,
        /// Error text reported by the server, if any.
        message: Option<String>,
    },

    /// The server answered with success but the payload was unusable.
    #[error("unexpected response from server: {0}")]
    MalformedResponse(String),
}

impl TransportError {
    /// Create a server rejection without a message.
    #[inline]
    #[must_use]
    pub const fn rejected(status: u16) -> Self {
        Self::ServerRejected {
            status,
            message: None,
        }
    }

    /// Create a server rejection carrying the server's explanation.
    #[inline]
    pub fn rejected_with(status: u16, message: impl Into<String>) -> Self {
        Self::ServerRejected {
            status,
            message: Some(message.into()),
        }
    }

    /// Create a malformed response error.
    #[inline]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[allow(clippy::trivially_copy_pass_by_ref)]
fn rejected_text(status: &u16, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("server rejected the request (HTTP {status}): {message}"),
        None => format!("server rejected the request (HTTP {status})"),
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid value.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create an invalid value error.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: Error = SessionError::Busy.into();
        assert!(matches!(err, Error::Session(SessionError::Busy)));

        let err: Error = TransportError::rejected(500).into();
        assert!(matches!(err, Error::Transport(_)));

        let err = Error::config("bad url");
        assert!(matches!(err, Error::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejected_display() {
        assert_eq!(
            TransportError::rejected(503).to_string(),
            "server rejected the request (HTTP 503)"
        );
        assert_eq!(
            TransportError::rejected_with(404, "Vector store not found").to_string(),
            "server rejected the request (HTTP 404): Vector store not found"
        );
    }

    #[test]
    fn test_transport_display_is_readable() {
        let err = TransportError::NetworkUnreachable("connection refused".into());
        assert_eq!(
            err.to_string(),
            "could not reach the server (connection refused)"
        );

        let err = TransportError::malformed("missing field `answer`");
        assert!(err.to_string().starts_with("unexpected response from server"));
    }
}
