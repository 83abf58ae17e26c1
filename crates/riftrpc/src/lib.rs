//! # Riftrpc
//!
//! The wire protocol between a control process and the engine host.
//!
//! Three layers, bottom up:
//!
//! - [`Value`]: plain data — scalars, strings, lists, maps. Nested
//!   structure is untagged; only top-level call arguments and results
//!   carry tags.
//! - [`WireValue`]: the tagged union every argument and result travels
//!   as — `value` (plain data), `reference` (a resource identity), or
//!   `error` (an opaque diagnostic).
//! - [`Frame`]: the request/reply envelope carrying the operations of
//!   the bridge surface, correlated by sequence number.
//!
//! ## Invariants
//!
//! - All decoding paths return `Result`, never panicking on foreign bytes.
//! - Unknown map fields are skipped, not rejected.

mod error;
mod frame;
mod value;

#[cfg(test)]
mod tests;

pub use error::Error;
pub use error::Fault;
pub use error::Result;
pub use frame::Frame;
pub use frame::ReplyFrame;
pub use frame::Request;
pub use frame::RequestFrame;
pub use value::ModuleId;
pub use value::ResourceId;
pub use value::Value;
pub use value::WireValue;
