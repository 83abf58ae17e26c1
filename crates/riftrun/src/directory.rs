//! # Resource Directory
//!
//! Assigns stable identities to engine-owned objects and resolves
//! identities back to live objects.
//!
//! Identities are `(type_tag, name)` pairs. The tag is derived fresh from
//! the live object every time — a custom marker wins outright, otherwise
//! the class hierarchy is joined with `:` and a polymorphic sub-kind is
//! appended. Because nothing is cached on the object, a rename simply
//! produces a different identity; the old one stops resolving.
//!
//! ## Invariants
//!
//! - An identity is valid only while the resource exists under that name
//!   in that collection.
//! - A stale identity fails cleanly. Resolution re-identifies the object
//!   it finds and rejects it on mismatch rather than silently handing
//!   back a different resource that now occupies the slot.

use riftrpc::ResourceId;

use crate::engine::Engine;
use crate::engine::Resource;

/// A server-local designator for one live resource: the owning native
/// collection plus the resource's current name.
///
/// This is what procedures receive for reference arguments and return for
/// reference results. It is *not* an identity — identities are computed
/// from the live object at the marshalling boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub collection: String,
    pub name: String,
}

impl ResourceHandle {
    pub fn new(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.name)
    }
}

/// Why an identity failed to resolve.
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// The tag's base segment names no managed collection.
    UnknownCollection(ResourceId),
    /// No resource of that name exists in the collection.
    Missing(ResourceId),
    /// A resource of that name exists, but re-identification produced a
    /// different tag — the slot has been reoccupied since the identity
    /// was minted.
    Drifted {
        requested: ResourceId,
        found: ResourceId,
    },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCollection(id) => {
                write!(f, "identity {} names no managed collection", id)
            }
            Self::Missing(id) => write!(f, "identity {} no longer resolves", id),
            Self::Drifted { requested, found } => write!(
                f,
                "identity {} now resolves to a different resource ({})",
                requested, found
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Derives the identity of a live resource.
pub fn identify(resource: &dyn Resource) -> ResourceId {
    if let Some(tag) = resource.custom_tag() {
        return ResourceId::new(tag, resource.name());
    }
    let mut tag = resource.class_path().join(":");
    if let Some(sub) = resource.sub_kind() {
        tag.push(':');
        tag.push_str(sub);
    }
    ResourceId::new(tag, resource.name())
}

/// Resolves an identity back to a live resource handle.
pub fn resolve<E: Engine>(engine: &E, id: &ResourceId) -> Result<ResourceHandle, ResolveError> {
    let base = id.base();
    if !engine.collections().iter().any(|c| *c == base) {
        return Err(ResolveError::UnknownCollection(id.clone()));
    }
    let resource = engine
        .get(base, &id.name)
        .ok_or_else(|| ResolveError::Missing(id.clone()))?;

    // Recompute and compare: the name slot may have been reoccupied by a
    // resource of a different shape since this identity was minted.
    let found = identify(resource);
    if &found != id {
        return Err(ResolveError::Drifted {
            requested: id.clone(),
            found,
        });
    }
    Ok(ResourceHandle::new(base, id.name.clone()))
}
