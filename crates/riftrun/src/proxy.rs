//! # Resource Proxies
//!
//! Client-side stand-ins for engine-owned resources, one live proxy per
//! identity per process.
//!
//! A proxy does nothing locally: all behavior is defined by module calls
//! parameterized by the proxy's identity. What the proxy *does* carry is
//! its lifetime — when the last clone is dropped, the identity is queued
//! for a best-effort `release` on the host, performed asynchronously by
//! the client's reaper task.
//!
//! ## Invariants
//!
//! - At most one live proxy per identity; identity equality is structural
//!   (`type_tag`, `name`), not call-site-based.
//! - Adoption is attachment, not creation: the remote object already
//!   exists, so constructing a proxy has no side effects.

use std::sync::Arc;
use std::sync::Weak;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use riftrpc::ModuleId;
use riftrpc::ResourceId;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

/// Work the client's reaper task performs off the caller's path.
pub(crate) enum ReaperJob {
    /// A proxy died; release its identity on the host.
    Release(ResourceId),
    /// A module handle died; remove its namespace on the host.
    RemoveModule(ModuleId),
    /// Resolve once every job queued before this one has completed.
    Flush(oneshot::Sender<()>),
}

struct ProxyCore {
    id: ResourceId,
    kind: Option<String>,
    reaper: mpsc::UnboundedSender<ReaperJob>,
}

impl Drop for ProxyCore {
    fn drop(&mut self) {
        // Best effort: at teardown the reaper may already be gone, and
        // there is no caller left to report to.
        let _ = self.reaper.send(ReaperJob::Release(self.id.clone()));
    }
}

/// A handle to one remote resource.
///
/// Cheap to clone; clones are the *same* proxy. Reference equality across
/// independently fetched handles is checked with [`Proxy::same`].
#[derive(Clone)]
pub struct Proxy {
    core: Arc<ProxyCore>,
}

impl Proxy {
    /// The identity this proxy stands for. Also the reverse association
    /// used to re-marshal the proxy into a later call.
    pub fn id(&self) -> &ResourceId {
        &self.core.id
    }

    /// The most specific locally-registered kind matching this proxy's
    /// type tag, or `None` for the generic kind.
    pub fn kind(&self) -> Option<&str> {
        self.core.kind.as_deref()
    }

    /// True if both handles stand for the same live proxy.
    pub fn same(&self, other: &Proxy) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("id", &self.core.id)
            .field("kind", &self.core.kind)
            .finish()
    }
}

/// The locally-registered proxy kinds.
///
/// Specialized client-side wrappers register the type tags they stand
/// for; adoption resolves a resource's tag to the most derived registered
/// kind by trimming `:`-segments from the right. No match means the
/// generic kind.
pub struct ProxyKinds {
    tags: DashMap<String, ()>,
}

impl ProxyKinds {
    pub(crate) fn new() -> Self {
        Self {
            tags: DashMap::new(),
        }
    }

    /// Registers a kind tag, e.g. `"Block:Scene"` or a custom tag minted
    /// by a creation procedure.
    pub fn register(&self, tag: impl Into<String>) {
        self.tags.insert(tag.into(), ());
    }

    fn resolve(&self, type_tag: &str) -> Option<String> {
        let mut tag = type_tag;
        loop {
            if self.tags.contains_key(tag) {
                return Some(tag.to_string());
            }
            match tag.rfind(':') {
                Some(split) => tag = &tag[..split],
                None => return None,
            }
        }
    }
}

/// The identity → proxy weak association.
///
/// Entries disappear once no strong holder remains; adoption of a known
/// identity returns the cached live proxy, preserving reference equality
/// across independent calls.
pub(crate) struct ProxyCache {
    map: DashMap<ResourceId, Weak<ProxyCore>>,
}

impl ProxyCache {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Returns the live proxy for an identity, attaching a new one if
    /// none survives. The entry lock makes at-most-one-per-identity hold
    /// under concurrent callers.
    pub fn adopt(
        &self,
        id: ResourceId,
        kinds: &ProxyKinds,
        reaper: &mpsc::UnboundedSender<ReaperJob>,
    ) -> Proxy {
        let attach = |id: ResourceId| {
            Arc::new(ProxyCore {
                kind: kinds.resolve(&id.type_tag),
                id,
                reaper: reaper.clone(),
            })
        };

        match self.map.entry(id.clone()) {
            Entry::Occupied(mut entry) => match entry.get().upgrade() {
                Some(core) => Proxy { core },
                None => {
                    let core = attach(id);
                    entry.insert(Arc::downgrade(&core));
                    Proxy { core }
                }
            },
            Entry::Vacant(entry) => {
                let core = attach(id);
                entry.insert(Arc::downgrade(&core));
                Proxy { core }
            }
        }
    }

    /// True if a live proxy currently stands for this identity.
    pub fn is_live(&self, id: &ResourceId) -> bool {
        self.map
            .get(id)
            .map_or(false, |entry| entry.value().strong_count() > 0)
    }

    /// Drops a dead cache entry, if the identity still maps to one.
    pub fn forget(&self, id: &ResourceId) {
        self.map.remove_if(id, |_, weak| weak.strong_count() == 0);
    }
}
