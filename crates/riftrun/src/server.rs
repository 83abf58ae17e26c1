//! # Engine Host
//!
//! The server side of the bridge: one owned object holding the module
//! registry, the resource directory's engine root, the active resource
//! set, and the global invocation lock. Constructed once at process start
//! and handed to a serving loop — never ambient global state.
//!
//! ## Ordering guarantee
//!
//! The engine tolerates one logical thread mutating its state at a time.
//! Every state-mutating operation — module calls and GC sweeps alike —
//! serializes through the single `state` mutex. Two calls never
//! interleave in their effect; the second observes the complete effect of
//! the first. Callers needing atomic multi-step sequences express them as
//! one procedure.
//!
//! ## Containment
//!
//! Invoked procedure failures (errors *and* panics) are caught at the
//! call boundary and answered as `error`-tagged results. The host
//! survives caller mistakes indefinitely.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use riftrpc::Fault;
use riftrpc::Frame;
use riftrpc::ModuleId;
use riftrpc::ReplyFrame;
use riftrpc::Request;
use riftrpc::ResourceId;
use riftrpc::Value;
use riftrpc::WireValue;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::directory;
use crate::engine::Engine;
use crate::gc;
use crate::gc::SweepError;
use crate::gc::SweepStats;
use crate::procedure::Operand;
use crate::procedure::ProcedureTable;
use crate::registry::ManifestError;
use crate::registry::ModuleRegistry;
use crate::transport;
use crate::transport::Endpoint;

/// Host tuning knobs.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Cadence of the background collection loop while enabled.
    pub gc_interval: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            gc_interval: Duration::from_millis(100),
        }
    }
}

/// Everything guarded by the global invocation lock.
struct HostState<E> {
    engine: E,
    modules: ModuleRegistry<E>,
    /// Identities explicitly referenced by at least one live client-held
    /// handle. Grows on every marshalled reference; shrinks on `release`.
    active: HashSet<ResourceId>,
}

struct HostInner<E> {
    state: Mutex<HostState<E>>,
    procedures: ProcedureTable<E>,
    gc_enabled: AtomicBool,
    gc_interval: Duration,
}

/// The server side of the bridge. Cheap to clone; all clones share state.
pub struct EngineHost<E: Engine> {
    inner: Arc<HostInner<E>>,
}

impl<E: Engine> Clone for EngineHost<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Engine> EngineHost<E> {
    pub fn new(engine: E, procedures: ProcedureTable<E>, config: HostConfig) -> Self {
        Self {
            inner: Arc::new(HostInner {
                state: Mutex::new(HostState {
                    engine,
                    modules: ModuleRegistry::new(),
                    active: HashSet::new(),
                }),
                procedures,
                gc_enabled: AtomicBool::new(false),
                gc_interval: config.gc_interval,
            }),
        }
    }

    /// Serves requests from an endpoint until the peer disconnects or a
    /// shutdown request arrives.
    pub async fn serve(&self, endpoint: &dyn Endpoint) -> transport::Result<()> {
        loop {
            let Some(bytes) = endpoint.recv().await? else {
                break;
            };
            let (reply, proceed) = self.handle(&bytes).await;
            match reply.to_bytes() {
                Ok(payload) => endpoint.send(&payload).await?,
                Err(e) => warn!(error = %e, "failed to encode reply; dropping it"),
            }
            if !proceed {
                info!("shutting down");
                break;
            }
        }
        self.disable_gc();
        Ok(())
    }

    /// Decodes one request, dispatches it, and builds the reply.
    ///
    /// The second element is false once the peer asked to shut down.
    async fn handle(&self, bytes: &[u8]) -> (ReplyFrame, bool) {
        let frame = match Frame::decode(bytes) {
            Ok(Frame::Request(frame)) => frame,
            Ok(Frame::Reply(reply)) => {
                return (
                    ReplyFrame::fault(
                        reply.seq,
                        Fault::Protocol("received a reply frame on the request channel".into()),
                    ),
                    true,
                );
            }
            Err(e) => {
                // Unreadable envelope; seq 0 is the best correlation we have.
                return (ReplyFrame::fault(0, Fault::Protocol(e.to_string())), true);
            }
        };

        let proceed = !matches!(frame.request, Request::ShutDown);
        let status = self.dispatch(frame.request).await;
        (ReplyFrame { seq: frame.seq, status }, proceed)
    }

    /// Performs one operation. Exposed to the crate for direct-embedding
    /// tests; the wire surface goes through [`Self::serve`].
    pub(crate) async fn dispatch(&self, request: Request) -> Result<WireValue, Fault> {
        match request {
            Request::AddModule { source } => {
                let mut state = self.inner.state.lock().await;
                let id = state
                    .modules
                    .add(&self.inner.procedures, &source)
                    .map_err(manifest_fault)?;
                Ok(WireValue::Value(Value::Int(id.0 as i64)))
            }
            Request::RemoveModule { module } => {
                let mut state = self.inner.state.lock().await;
                state.modules.remove(module);
                Ok(unit())
            }
            Request::Call {
                module,
                symbol,
                args,
            } => self.call(module, &symbol, args).await,
            Request::Release { resource } => {
                let mut state = self.inner.state.lock().await;
                // Set removal, not a count decrement: releasing an absent
                // identity is a no-op.
                if state.active.remove(&resource) {
                    debug!(%resource, "released");
                }
                Ok(unit())
            }
            Request::EnableGc => {
                self.enable_gc();
                Ok(unit())
            }
            Request::DisableGc => {
                self.disable_gc();
                Ok(unit())
            }
            Request::CollectGarbage => match self.collect().await {
                Ok(_) => Ok(unit()),
                Err(e) => Err(Fault::Execution(e.to_string())),
            },
            Request::ShutDown => {
                self.disable_gc();
                Ok(unit())
            }
        }
    }

    /// Invokes a module symbol under the global invocation lock.
    async fn call(
        &self,
        module: ModuleId,
        symbol: &str,
        args: Vec<WireValue>,
    ) -> Result<WireValue, Fault> {
        let mut state = self.inner.state.lock().await;

        let procedure = state
            .modules
            .get(module)
            .ok_or_else(|| Fault::NotFound(format!("no module {}", module)))?
            .symbol(symbol)
            .ok_or_else(|| Fault::NotFound(format!("{} has no symbol {:?}", module, symbol)))?
            .clone();

        let mut operands = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                WireValue::Value(v) => operands.push(Operand::Value(v)),
                WireValue::Reference(id) => {
                    let handle = directory::resolve(&state.engine, &id)
                        .map_err(|e| Fault::NotFound(e.to_string()))?;
                    operands.push(Operand::Resource(handle));
                }
                WireValue::Error(_) => {
                    return Err(Fault::Protocol(
                        "error-tagged value in call arguments".into(),
                    ));
                }
            }
        }

        debug!(%module, symbol, "invoking");
        let engine = &mut state.engine;
        let outcome = catch_unwind(AssertUnwindSafe(|| (*procedure)(engine, operands)));

        let result = match outcome {
            Ok(Ok(result)) => result,
            // The procedure ran and failed: that is the caller's error,
            // delivered as an error-tagged result, not a fault. Anything
            // it mutated before failing stays mutated.
            Ok(Err(error)) => return Ok(WireValue::Error(format!("{:?}", error))),
            Err(panic) => return Ok(WireValue::Error(panic_diagnostic(panic))),
        };

        match result {
            Operand::Value(v) => Ok(WireValue::Value(v)),
            Operand::Resource(handle) => {
                let id = match state.engine.get(&handle.collection, &handle.name) {
                    Some(resource) => directory::identify(resource),
                    None => {
                        return Ok(WireValue::Error(format!(
                            "procedure returned a resource that no longer exists: {}",
                            handle
                        )));
                    }
                };
                state.active.insert(id.clone());
                Ok(WireValue::Reference(id))
            }
        }
    }

    /// Runs one synchronous sweep to fixed point, regardless of whether
    /// the background loop is enabled.
    pub async fn collect(&self) -> Result<SweepStats, SweepError> {
        let mut state = self.inner.state.lock().await;
        let HostState { engine, active, .. } = &mut *state;
        let outcome = gc::sweep(engine, active);
        match &outcome {
            Ok(stats) => debug!(freed = stats.freed, passes = stats.passes, "sweep complete"),
            Err(e) => warn!(error = %e, "sweep left failures behind"),
        }
        outcome
    }

    /// Starts the background collection loop if it is not already running.
    pub fn enable_gc(&self) {
        if self.inner.gc_enabled.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(interval = ?self.inner.gc_interval, "gc enabled");

        // The loop holds only a weak handle: dropping the host (or
        // disabling gc) lets the task wind down on its next tick.
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.gc_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if !inner.gc_enabled.load(Ordering::SeqCst) {
                    break;
                }
                let mut state = inner.state.lock().await;
                let HostState { engine, active, .. } = &mut *state;
                if let Err(e) = gc::sweep(engine, active) {
                    warn!(error = %e, "background sweep left failures behind");
                }
            }
        });
    }

    /// Stops the background collection loop. A sweep already holding the
    /// lock finishes first.
    pub fn disable_gc(&self) {
        if self.inner.gc_enabled.swap(false, Ordering::SeqCst) {
            info!("gc disabled");
        }
    }
}

fn unit() -> WireValue {
    WireValue::Value(Value::Unit)
}

fn manifest_fault(e: ManifestError) -> Fault {
    match &e {
        ManifestError::Syntax { .. } => Fault::Protocol(e.to_string()),
        ManifestError::UnknownProcedure { .. } => Fault::NotFound(e.to_string()),
    }
}

fn panic_diagnostic(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        format!("procedure panicked: {}", text)
    } else if let Some(text) = panic.downcast_ref::<String>() {
        format!("procedure panicked: {}", text)
    } else {
        "procedure panicked".to_string()
    }
}
