//! # Riftrun
//!
//! The runtime of the engine bridge: a heavyweight, stateful rendering
//! engine served from its own process, driven by a lightweight control
//! process through addressable resource handles.
//!
//! Server side, an [`server::EngineHost`] owns the module registry, the
//! resource directory, the active resource set, and the single lock that
//! totally orders module calls and GC sweeps. Client side, a
//! [`client::Client`] marshals calls, caches one proxy per remote
//! identity, and releases identities when their proxies die.

pub mod client;
pub mod directory;
pub mod engine;
pub mod error;
pub mod gc;
pub mod loopback;
pub mod mock_engine;
pub mod procedure;
pub mod proxy;
pub mod registry;
pub mod server;
pub mod transport;


pub use client::Client;
pub use client::ClientConfig;
pub use client::Datum;
pub use client::ModuleHandle;
pub use directory::ResourceHandle;
pub use engine::Engine;
pub use engine::Resource;
pub use error::Error;
pub use procedure::Operand;
pub use procedure::ProcedureSet;
pub use procedure::ProcedureTable;
pub use proxy::Proxy;
pub use proxy::ProxyKinds;
pub use server::EngineHost;
pub use server::HostConfig;

pub use riftrpc::ModuleId;
pub use riftrpc::ResourceId;
pub use riftrpc::Value;
