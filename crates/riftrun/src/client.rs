//! # Bridge Client
//!
//! The control process's view of the engine host: submit modules once,
//! then call their symbols with tagged arguments. Reference results come
//! back as cached [`Proxy`] handles; dropping the last handle schedules a
//! best-effort release on the host.
//!
//! Every operation is synchronous request/response with a configurable
//! timeout. The source protocol defined none and could hang forever;
//! here an elapsed deadline surfaces as a connection error.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use riftrpc::Frame;
use riftrpc::ModuleId;
use riftrpc::Request;
use riftrpc::RequestFrame;
use riftrpc::ResourceId;
use riftrpc::Value;
use riftrpc::WireValue;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::Error;
use crate::error::Result;
use crate::proxy::Proxy;
use crate::proxy::ProxyCache;
use crate::proxy::ProxyKinds;
use crate::proxy::ReaperJob;
use crate::transport;
use crate::transport::Transport;

/// Client tuning knobs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for each remote operation.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// One top-level argument or result, from the caller's side.
///
/// Plain data travels by copy; resources travel as proxies. Nested values
/// are plain data only — a proxy cannot be smuggled inside a list.
#[derive(Debug, Clone)]
pub enum Datum {
    Value(Value),
    Resource(Proxy),
}

impl Datum {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Datum::Value(v) => Some(v),
            Datum::Resource(_) => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Datum::Resource(p) => Some(p),
            Datum::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Datum::Value(v) => Some(v),
            Datum::Resource(_) => None,
        }
    }

    pub fn into_proxy(self) -> Option<Proxy> {
        match self {
            Datum::Resource(p) => Some(p),
            Datum::Value(_) => None,
        }
    }
}

impl From<Value> for Datum {
    fn from(v: Value) -> Self {
        Datum::Value(v)
    }
}

impl From<Proxy> for Datum {
    fn from(p: Proxy) -> Self {
        Datum::Resource(p)
    }
}

impl From<i64> for Datum {
    fn from(n: i64) -> Self {
        Datum::Value(Value::Int(n))
    }
}

impl From<f64> for Datum {
    fn from(x: f64) -> Self {
        Datum::Value(Value::Float(x))
    }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Value(Value::Bool(b))
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Value(Value::Str(s.to_string()))
    }
}

/// The request path shared by caller-facing methods and the reaper.
struct Caller {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    seq: AtomicU64,
}

impl Caller {
    async fn perform(&self, request: Request) -> Result<WireValue> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let payload = RequestFrame::new(seq, request).to_bytes()?;

        let response = tokio::time::timeout(self.timeout, self.transport.call(&payload))
            .await
            .map_err(|_| transport::Error::Timeout)??;

        match Frame::decode(&response)? {
            Frame::Reply(reply) => {
                if reply.seq != seq {
                    return Err(Error::Protocol(format!(
                        "sequence mismatch: sent {}, received {}",
                        seq, reply.seq
                    )));
                }
                reply.status.map_err(Error::from)
            }
            Frame::Request(_) => Err(Error::Protocol(
                "received a request frame while awaiting a reply".into(),
            )),
        }
    }
}

struct ClientInner {
    caller: Arc<Caller>,
    cache: Arc<ProxyCache>,
    kinds: ProxyKinds,
    reaper_tx: mpsc::UnboundedSender<ReaperJob>,
}

/// A connected bridge client. Cheap to clone; all clones share the proxy
/// cache and the reaper.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Wraps a connected transport. Spawns the reaper task that performs
    /// deferred releases and module removals.
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        let caller = Arc::new(Caller {
            transport,
            timeout: config.timeout,
            seq: AtomicU64::new(1),
        });
        let cache = Arc::new(ProxyCache::new());
        let (reaper_tx, reaper_rx) = mpsc::unbounded_channel();

        tokio::spawn(reap(caller.clone(), cache.clone(), reaper_rx));

        Self {
            inner: Arc::new(ClientInner {
                caller,
                cache,
                kinds: ProxyKinds::new(),
                reaper_tx,
            }),
        }
    }

    /// The registry of locally known proxy kinds.
    pub fn kinds(&self) -> &ProxyKinds {
        &self.inner.kinds
    }

    /// Submits a module manifest and returns a handle to the new module.
    ///
    /// Dropping the handle schedules a best-effort removal of the module
    /// on the host.
    pub async fn add_module(&self, source: &str) -> Result<ModuleHandle> {
        let reply = self
            .inner
            .caller
            .perform(Request::AddModule {
                source: source.to_string(),
            })
            .await?;
        let id = match reply {
            WireValue::Value(Value::Int(raw)) => u32::try_from(raw)
                .map(ModuleId)
                .map_err(|_| Error::Protocol(format!("module id {} out of range", raw)))?,
            other => {
                return Err(Error::Protocol(format!(
                    "unexpected add-module reply: {:?}",
                    other
                )));
            }
        };
        Ok(ModuleHandle {
            id,
            client: self.clone(),
            detached: AtomicBool::new(false),
        })
    }

    /// Invokes a module symbol with tagged arguments.
    pub async fn call(
        &self,
        module: ModuleId,
        symbol: &str,
        args: Vec<Datum>,
    ) -> Result<Datum> {
        let wire_args = args
            .into_iter()
            .map(|datum| match datum {
                Datum::Value(v) => WireValue::Value(v),
                Datum::Resource(proxy) => WireValue::Reference(proxy.id().clone()),
            })
            .collect();

        let reply = self
            .inner
            .caller
            .perform(Request::Call {
                module,
                symbol: symbol.to_string(),
                args: wire_args,
            })
            .await?;

        match reply {
            WireValue::Value(v) => Ok(Datum::Value(v)),
            WireValue::Reference(id) => Ok(Datum::Resource(self.adopt(id))),
            WireValue::Error(diagnostic) => Err(Error::Remote(diagnostic)),
        }
    }

    fn adopt(&self, id: ResourceId) -> Proxy {
        self.inner
            .cache
            .adopt(id, &self.inner.kinds, &self.inner.reaper_tx)
    }

    /// Removes a module by id. Idempotent: unknown ids succeed.
    pub async fn remove_module(&self, module: ModuleId) -> Result<()> {
        expect_unit(
            self.inner
                .caller
                .perform(Request::RemoveModule { module })
                .await?,
        )
    }

    /// Explicitly releases an identity on the host. Redundant with proxy
    /// drop, but useful for embedders managing identities by hand.
    pub async fn release(&self, id: &ResourceId) -> Result<()> {
        let reply = self
            .inner
            .caller
            .perform(Request::Release {
                resource: id.clone(),
            })
            .await?;
        expect_unit(reply)
    }

    /// Allows the host to free unused resources automatically.
    pub async fn enable_gc(&self) -> Result<()> {
        expect_unit(self.inner.caller.perform(Request::EnableGc).await?)
    }

    /// Prevents the host from freeing unused resources automatically.
    pub async fn disable_gc(&self) -> Result<()> {
        expect_unit(self.inner.caller.perform(Request::DisableGc).await?)
    }

    /// Manually frees unused resources; returns once the sweep reached
    /// its fixed point.
    pub async fn collect_garbage(&self) -> Result<()> {
        expect_unit(self.inner.caller.perform(Request::CollectGarbage).await?)
    }

    /// Asks the host process to terminate after replying.
    pub async fn shut_down(&self) -> Result<()> {
        expect_unit(self.inner.caller.perform(Request::ShutDown).await?)
    }

    /// Waits until every release and removal queued so far has been
    /// performed. Useful before a manual collection, and at teardown.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.reaper_tx.send(ReaperJob::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

/// A handle to one module namespace on the host.
///
/// Symbols are invoked through [`ModuleHandle::call`]. Dropping the
/// handle schedules a best-effort `remove_module`; removal is idempotent
/// host-side, so racing an explicit [`ModuleHandle::remove`] is harmless.
pub struct ModuleHandle {
    id: ModuleId,
    client: Client,
    detached: AtomicBool,
}

impl std::fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("id", &self.id)
            .field("detached", &self.detached)
            .finish_non_exhaustive()
    }
}

impl ModuleHandle {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Invokes one of this module's symbols.
    pub async fn call(&self, symbol: &str, args: Vec<Datum>) -> Result<Datum> {
        self.client.call(self.id, symbol, args).await
    }

    /// Removes the module now, reporting the outcome.
    pub async fn remove(self) -> Result<()> {
        self.detached.store(true, Ordering::SeqCst);
        self.client.remove_module(self.id).await
    }
}

impl Drop for ModuleHandle {
    fn drop(&mut self) {
        if !self.detached.load(Ordering::SeqCst) {
            let _ = self
                .client
                .inner
                .reaper_tx
                .send(ReaperJob::RemoveModule(self.id));
        }
    }
}

/// Drains deferred work: proxy releases, module removals, flushes.
///
/// Failures are swallowed — by the time a proxy dies there is no caller
/// left to report to, and at process teardown the channel may already be
/// closed.
async fn reap(
    caller: Arc<Caller>,
    cache: Arc<ProxyCache>,
    mut rx: mpsc::UnboundedReceiver<ReaperJob>,
) {
    while let Some(job) = rx.recv().await {
        match job {
            ReaperJob::Release(id) => {
                // The identity may have been re-adopted since the old
                // proxy died; its release belongs to the new proxy then.
                if cache.is_live(&id) {
                    continue;
                }
                cache.forget(&id);
                if let Err(e) = caller
                    .perform(Request::Release {
                        resource: id.clone(),
                    })
                    .await
                {
                    debug!(%id, error = %e, "release swallowed");
                }
            }
            ReaperJob::RemoveModule(module) => {
                if let Err(e) = caller.perform(Request::RemoveModule { module }).await {
                    debug!(%module, error = %e, "module removal swallowed");
                }
            }
            ReaperJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

fn expect_unit(reply: WireValue) -> Result<()> {
    match reply {
        WireValue::Value(Value::Unit) => Ok(()),
        other => Err(Error::Protocol(format!(
            "expected a unit reply, got {:?}",
            other
        ))),
    }
}
