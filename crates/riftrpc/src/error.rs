//! Protocol-level errors and the wire fault taxonomy.
//!
//! `Error` is for *this* process failing to read or write bytes.
//! `Fault` is the *remote* host declining an operation; it travels inside
//! a reply frame and is distinct from a failure of the invoked module
//! code, which arrives as an `error`-tagged [`crate::WireValue`].

use riftpack::Error as PackError;

/// Failures encoding or decoding protocol frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The underlying riftpack layer failed.
    Pack(PackError),
    /// The structure of a frame was malformed (missing field, wrong payload).
    Malformed(String),
    /// An unrecognized variant name was encountered.
    UnknownVariant(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pack(e) => write!(f, "serialization error: {}", e),
            Self::Malformed(msg) => write!(f, "malformed frame: {}", msg),
            Self::UnknownVariant(name) => write!(f, "unknown variant: {}", name),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pack(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PackError> for Error {
    fn from(e: PackError) -> Self {
        Self::Pack(e)
    }
}

/// Specialized `Result` for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An operation-level refusal reported by the host.
///
/// Faults cover the host declining to perform an operation at all. A module
/// procedure that *ran and failed* is not a fault; its diagnostic comes back
/// as an `error`-tagged wire value so the caller can tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Unknown or stale module id, symbol, or resource identity.
    NotFound(String),
    /// The request payload was malformed or carried an unexpected tag.
    Protocol(String),
    /// The operation ran and failed host-side; carries the diagnostic text.
    Execution(String),
}

impl Fault {
    pub(crate) fn tag(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::Protocol(_) => "protocol",
            Self::Execution(_) => "execution",
        }
    }

    pub(crate) fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) | Self::Protocol(msg) | Self::Execution(msg) => msg,
        }
    }

    pub(crate) fn from_parts(tag: &str, message: String) -> Result<Self> {
        match tag {
            "not-found" => Ok(Self::NotFound(message)),
            "protocol" => Ok(Self::Protocol(message)),
            "execution" => Ok(Self::Execution(message)),
            _ => Err(Error::UnknownVariant(format!("fault: {}", tag))),
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "not found: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol violation: {}", msg),
            Self::Execution(msg) => write!(f, "host-side failure: {}", msg),
        }
    }
}

impl std::error::Error for Fault {}
