//! Error taxonomy for the engine.

use {crate::resolve::ResolveError, std::io, thiserror::Error};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error types for engine operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Caller-contract violation: an invalid length argument or an
    /// operation invoked in the wrong connection state. No transport
    /// operation was attempted.
    #[error("usage error: {0}")]
    Usage(String),

    /// Name/service lookup failed; no candidates remain to try.
    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// A send, receive, shutdown, or close on the transport failed.
    #[error("transport error: {context}")]
    Transport {
        /// What was being attempted, including outstanding byte counts.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Every resolved candidate failed to connect.
    #[error("could not connect to any resolved address for {host}:{port}")]
    Exhausted {
        /// Host the connection was for.
        host: String,
        /// Port the connection was for.
        port: String,
        /// Last system error observed while trying candidates, if any.
        #[source]
        last: Option<io::Error>,
    },
}

impl EngineError {
    pub(crate) fn transport(context: impl Into<String>, source: io::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// True for caller-contract violations.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// True for failures of the underlying transport.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = EngineError::transport(
            "unable to send 5 bytes",
            io::Error::from(io::ErrorKind::BrokenPipe),
        );
        assert_eq!(err.to_string(), "transport error: unable to send 5 bytes");
        assert!(err.is_transport());
    }

    #[test]
    fn exhausted_names_the_remote() {
        let err = EngineError::Exhausted {
            host: "example.com".to_string(),
            port: "80".to_string(),
            last: Some(io::Error::from(io::ErrorKind::ConnectionRefused)),
        };
        assert_eq!(
            err.to_string(),
            "could not connect to any resolved address for example.com:80"
        );
    }

    #[test]
    fn usage_errors_are_classified() {
        let err = EngineError::Usage("bytes count to send is 0".to_string());
        assert!(err.is_usage());
        assert!(!err.is_transport());
    }

    #[test]
    fn resolve_errors_convert() {
        let err: EngineError = ResolveError::Lookup("no such host".to_string()).into();
        assert_eq!(err.to_string(), "resolution failed: no such host");
    }

    #[test]
    fn exhausted_source_is_the_last_system_error() {
        use std::error::Error as _;

        let err = EngineError::Exhausted {
            host: "h".to_string(),
            port: "1".to_string(),
            last: Some(io::Error::from(io::ErrorKind::ConnectionRefused)),
        };
        assert!(err.source().is_some());

        let err = EngineError::Exhausted {
            host: "h".to_string(),
            port: "1".to_string(),
            last: None,
        };
        assert!(err.source().is_none());
    }
}
