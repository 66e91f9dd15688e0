//! Error taxonomy shared by the registry, the transports and the dispatcher.
//!
//! Three families matter to the operator:
//!
//! - **precondition**: [`Error::NoDeviceSelected`], raised before any bus I/O;
//! - **transport**: connect failures, timeouts, lost connections, resource
//!   strings that cannot be opened;
//! - **response**: [`Error::MalformedResponse`], the instrument answered but
//!   the reply could not be interpreted.
//!
//! None of them is retried. The registry keeps whatever session it held
//! before the failing command.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no device selected; use 'deviceselect' first")]
    NoDeviceSelected,

    #[error("invalid resource string {resource:?}: {reason}")]
    InvalidResource { resource: String, reason: String },

    #[error("{interface} resources need the `{feature}` feature, which this build lacks ({resource})")]
    UnsupportedInterface {
        interface: &'static str,
        feature: &'static str,
        resource: String,
    },

    #[error("could not connect to {resource}: {cause:#}")]
    Connect {
        resource: String,
        cause: anyhow::Error,
    },

    #[error("timed out after {}ms during {operation}", .timeout.as_millis())]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("connection to {resource} was closed by the instrument")]
    Disconnected { resource: String },

    #[error("transport failure during {operation}: {cause:#}")]
    Transport {
        operation: String,
        cause: anyhow::Error,
    },

    #[error("malformed response to {command:?}: {reason}")]
    MalformedResponse { command: String, reason: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write waveform data: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn transport(operation: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Error::Transport {
            operation: operation.into(),
            cause: cause.into(),
        }
    }

    pub(crate) fn malformed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedResponse {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }

    /// True for failures of the bus itself rather than of the operator's
    /// input or the instrument's reply.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::InvalidResource { .. }
                | Error::UnsupportedInterface { .. }
                | Error::Connect { .. }
                | Error::Timeout { .. }
                | Error::Disconnected { .. }
                | Error::Transport { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(!Error::NoDeviceSelected.is_transport());
        assert!(!Error::malformed("*IDN?", "empty").is_transport());
        assert!(
            Error::Timeout {
                operation: "read".into(),
                timeout: Duration::from_millis(10),
            }
            .is_transport()
        );
        assert!(Error::transport("write", anyhow::anyhow!("broken pipe")).is_transport());
    }

    #[test]
    fn messages_name_the_failing_piece() {
        let err = Error::Timeout {
            operation: "query \":MEAS:VOLT?\"".into(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 250ms during query \":MEAS:VOLT?\""
        );

        let err = Error::transport("write", anyhow::anyhow!("broken pipe"));
        assert_eq!(err.to_string(), "transport failure during write: broken pipe");
    }
}
