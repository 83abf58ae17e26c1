//! # Engine Interface
//!
//! The contract between the bridge and the native rendering engine. The
//! engine's actual scene/camera/animation semantics live behind these two
//! traits; the bridge only needs to enumerate, look up, describe, and
//! remove engine-owned objects.
//!
//! ## Invariants
//!
//! - Resource names are unique within their collection; the identity
//!   scheme depends on this.
//! - `remove` is terminal: a removed resource never reappears under the
//!   same name unless something new is created with it.

/// One engine-owned object, observed through the bridge.
///
/// Everything here is recomputed from the live object on demand; the
/// bridge never caches any of it.
pub trait Resource {
    /// The resource's current name within its native collection.
    fn name(&self) -> &str;

    /// The class hierarchy from the base kind down to the most specific
    /// kind, e.g. `["Prop"]` or `["Prop", "RiggedProp"]`. The first
    /// segment must be the key of the owning collection; identities
    /// resolve through it.
    fn class_path(&self) -> &[&'static str];

    /// A discriminator for polymorphic container types (a prop holding
    /// mesh data reports `"Mesh"`), appended to the type tag.
    fn sub_kind(&self) -> Option<&str> {
        None
    }

    /// A custom kind marker stamped at creation time by higher-level
    /// code. When present it *replaces* the derived type tag, and must
    /// still begin with the owning collection's key.
    fn custom_tag(&self) -> Option<&str> {
        None
    }

    /// How many engine-internal holders reference this resource.
    fn users(&self) -> u32;

    /// An explicit engine-side pin that keeps the resource alive
    /// regardless of usage counts or client handles.
    fn keep(&self) -> bool {
        false
    }
}

/// The engine root: named collections of resources, keyed by base kind.
pub trait Engine: Send + 'static {
    /// The base kinds of every managed collection, e.g.
    /// `["Mesh", "Camera", "Scene", "Prop"]`.
    fn collections(&self) -> &'static [&'static str];

    /// A snapshot of the names currently present in one collection.
    fn names(&self, collection: &str) -> Vec<String>;

    /// Looks up a live resource by collection and name.
    fn get(&self, collection: &str, name: &str) -> Option<&dyn Resource>;

    /// Removes a resource from its collection, dropping the usage counts
    /// of anything it held. Removal is terminal.
    fn remove(&mut self, collection: &str, name: &str) -> anyhow::Result<()>;
}
