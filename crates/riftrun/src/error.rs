//! The client-facing error taxonomy.

use riftrpc::Fault;

use crate::transport;

/// Everything a remote operation can fail with, from the caller's side.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown or stale module id, symbol, or resource identity.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invoked module code failed. Carries the host's diagnostic text
    /// verbatim — opaque, never parsed, only surfaced.
    #[error("remote execution failed: {0}")]
    Remote(String),

    /// Malformed or unrecognized frames and payloads, on either side.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The channel failed or the configured timeout elapsed.
    #[error("connection error: {0}")]
    Connection(#[from] transport::Error),
}

impl Error {
    /// The raw diagnostic of a remote execution failure, if that is what
    /// this error is.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Remote(text) => Some(text),
            _ => None,
        }
    }
}

impl From<riftrpc::Error> for Error {
    fn from(e: riftrpc::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::NotFound(msg) => Self::NotFound(msg),
            Fault::Protocol(msg) => Self::Protocol(msg),
            Fault::Execution(msg) => Self::Remote(msg),
        }
    }
}

/// Specialized `Result` for remote operations.
pub type Result<T> = std::result::Result<T, Error>;
