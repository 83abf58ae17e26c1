//! # Transport Abstraction
//!
//! A minimal interface for moving request and reply bytes between the
//! control process and the engine host.
//!
//! ## Philosophy
//!
//! - **Byte-oriented**: transports know nothing about frames, values, or
//!   identities. They move opaque buffers.
//! - **Request-response**: the client's fundamental interaction is "send
//!   bytes, await bytes". The host's is "receive bytes, answer bytes".
//!   Process spawning and endpoint rendezvous live with the embedder.

use std::fmt;

/// Errors at the channel layer.
#[derive(Debug, Clone)]
pub enum Error {
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
    /// No response arrived before the configured deadline.
    Timeout,
    /// Generic I/O or internal transport failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "connection lost: {}", msg),
            Self::Timeout => write!(f, "request timed out"),
            Self::Io(msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// The client's side of a channel: send a request, await the reply.
///
/// Object-safe (`Arc<dyn Transport>`).
///
/// # Invariants
/// - Returns the raw reply bytes on success.
/// - Never interprets payload content.
/// - Concurrent callers must each observe their own reply; an
///   implementation may serialize them internally.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn call(&self, payload: &[u8]) -> Result<Vec<u8>>;
}

/// The host's side of a channel: receive requests, answer them in order.
///
/// `recv` resolving to `Ok(None)` means the peer is gone and the serving
/// loop should end.
#[async_trait::async_trait]
pub trait Endpoint: Send + Sync + 'static {
    async fn recv(&self) -> Result<Option<Vec<u8>>>;
    async fn send(&self, payload: &[u8]) -> Result<()>;
}
