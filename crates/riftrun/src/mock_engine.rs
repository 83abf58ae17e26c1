//! Mock engine for testing.
//!
//! A tiny in-memory stand-in for the rendering engine, used internally by
//! the test suite and not part of the public API. It models exactly what
//! the bridge consumes: named collections, class hierarchies with a
//! polymorphic prop kind, custom tags, usage counts with container
//! cascade, and a keep flag.

use std::collections::BTreeMap;

use anyhow::anyhow;
use anyhow::bail;

use crate::engine::Engine;
use crate::engine::Resource;

const COLLECTIONS: &[&str] = &["Mesh", "Camera", "Scene", "Prop"];

fn class_path_of(collection: &str) -> Vec<&'static str> {
    // The first segment is the collection key; identities resolve through it.
    match collection {
        "Mesh" => vec!["Mesh"],
        "Camera" => vec!["Camera"],
        "Scene" => vec!["Scene"],
        "Prop" => vec!["Prop"],
        _ => vec!["Unknown"],
    }
}

/// One fake engine-owned object.
pub struct MockResource {
    name: String,
    class_path: Vec<&'static str>,
    sub_kind: Option<String>,
    custom_tag: Option<String>,
    users: u32,
    keep: bool,
    /// Removal fails while set, simulating an engine-side refusal.
    stuck: bool,
    /// Resources this one holds alive: removing it drops their users.
    links: Vec<(String, String)>,
}

impl Resource for MockResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_path(&self) -> &[&'static str] {
        &self.class_path
    }

    fn sub_kind(&self) -> Option<&str> {
        self.sub_kind.as_deref()
    }

    fn custom_tag(&self) -> Option<&str> {
        self.custom_tag.as_deref()
    }

    fn users(&self) -> u32 {
        self.users
    }

    fn keep(&self) -> bool {
        self.keep
    }
}

/// An in-memory engine with the four collections the tests exercise.
pub struct MockEngine {
    collections: BTreeMap<&'static str, BTreeMap<String, MockResource>>,
}

impl MockEngine {
    pub fn new() -> Self {
        let mut collections = BTreeMap::new();
        for collection in COLLECTIONS {
            collections.insert(*collection, BTreeMap::new());
        }
        Self { collections }
    }

    fn shelf_mut(
        &mut self,
        collection: &str,
    ) -> anyhow::Result<&mut BTreeMap<String, MockResource>> {
        self.collections
            .get_mut(collection)
            .ok_or_else(|| anyhow!("no collection named {:?}", collection))
    }

    fn resource_mut(&mut self, collection: &str, name: &str) -> anyhow::Result<&mut MockResource> {
        self.shelf_mut(collection)?
            .get_mut(name)
            .ok_or_else(|| anyhow!("no resource {}/{}", collection, name))
    }

    fn insert(&mut self, collection: &'static str, resource: MockResource) -> anyhow::Result<()> {
        let shelf = self.shelf_mut(collection)?;
        if shelf.contains_key(&resource.name) {
            bail!("{}/{} already exists", collection, resource.name);
        }
        shelf.insert(resource.name.clone(), resource);
        Ok(())
    }

    fn blank(collection: &str, name: &str) -> MockResource {
        MockResource {
            name: name.to_string(),
            class_path: class_path_of(collection),
            sub_kind: None,
            custom_tag: None,
            users: 0,
            keep: false,
            stuck: false,
            links: Vec::new(),
        }
    }

    pub fn create_mesh(&mut self, name: &str) -> anyhow::Result<()> {
        self.insert("Mesh", Self::blank("Mesh", name))
    }

    pub fn create_camera(&mut self, name: &str) -> anyhow::Result<()> {
        self.insert("Camera", Self::blank("Camera", name))
    }

    pub fn create_scene(&mut self, name: &str) -> anyhow::Result<()> {
        self.insert("Scene", Self::blank("Scene", name))
    }

    /// Creates a prop wrapping a data resource. The data's collection
    /// becomes the prop's polymorphic sub-kind, and the prop holds the
    /// data alive until removed.
    pub fn create_prop(
        &mut self,
        name: &str,
        data_collection: &str,
        data_name: &str,
    ) -> anyhow::Result<()> {
        self.resource_mut(data_collection, data_name)?.users += 1;

        let mut prop = Self::blank("Prop", name);
        prop.sub_kind = Some(data_collection.to_string());
        prop.links
            .push((data_collection.to_string(), data_name.to_string()));
        self.insert("Prop", prop)
    }

    /// Links a prop into a scene; the scene holds the prop alive.
    pub fn link(&mut self, scene: &str, prop: &str) -> anyhow::Result<()> {
        self.resource_mut("Prop", prop)?.users += 1;
        self.resource_mut("Scene", scene)?
            .links
            .push(("Prop".to_string(), prop.to_string()));
        Ok(())
    }

    /// Unlinks a prop from a scene, dropping the scene's hold on it.
    pub fn unlink(&mut self, scene: &str, prop: &str) -> anyhow::Result<()> {
        let links = &mut self.resource_mut("Scene", scene)?.links;
        let position = links
            .iter()
            .position(|(c, n)| c == "Prop" && n == prop)
            .ok_or_else(|| anyhow!("{:?} is not linked into {:?}", prop, scene))?;
        links.remove(position);
        let held = self.resource_mut("Prop", prop)?;
        held.users = held.users.saturating_sub(1);
        Ok(())
    }

    pub fn set_keep(&mut self, collection: &str, name: &str, keep: bool) -> anyhow::Result<()> {
        self.resource_mut(collection, name)?.keep = keep;
        Ok(())
    }

    pub fn set_custom_tag(
        &mut self,
        collection: &str,
        name: &str,
        tag: &str,
    ) -> anyhow::Result<()> {
        self.resource_mut(collection, name)?.custom_tag = Some(tag.to_string());
        Ok(())
    }

    /// Makes removal of one resource fail, as a pinned engine object would.
    pub fn mark_stuck(&mut self, collection: &str, name: &str) -> anyhow::Result<()> {
        self.resource_mut(collection, name)?.stuck = true;
        Ok(())
    }

    /// Renames a resource in place. Links held *by other resources* are
    /// tracked by name and will dangle; tests rename standalone resources
    /// only.
    pub fn rename(&mut self, collection: &str, old: &str, new: &str) -> anyhow::Result<()> {
        let shelf = self.shelf_mut(collection)?;
        if shelf.contains_key(new) {
            bail!("{}/{} already exists", collection, new);
        }
        let mut resource = shelf
            .remove(old)
            .ok_or_else(|| anyhow!("no resource {}/{}", collection, old))?;
        resource.name = new.to_string();
        shelf.insert(new.to_string(), resource);
        Ok(())
    }

    pub fn contains(&self, collection: &str, name: &str) -> bool {
        self.collections
            .get(collection)
            .map_or(false, |shelf| shelf.contains_key(name))
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |shelf| shelf.len())
    }

    pub fn users_of(&self, collection: &str, name: &str) -> Option<u32> {
        self.collections
            .get(collection)?
            .get(name)
            .map(|resource| resource.users)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MockEngine {
    fn collections(&self) -> &'static [&'static str] {
        COLLECTIONS
    }

    fn names(&self, collection: &str) -> Vec<String> {
        self.collections
            .get(collection)
            .map_or_else(Vec::new, |shelf| shelf.keys().cloned().collect())
    }

    fn get(&self, collection: &str, name: &str) -> Option<&dyn Resource> {
        self.collections
            .get(collection)?
            .get(name)
            .map(|resource| resource as &dyn Resource)
    }

    fn remove(&mut self, collection: &str, name: &str) -> anyhow::Result<()> {
        let shelf = self.shelf_mut(collection)?;
        let resource = shelf
            .get(name)
            .ok_or_else(|| anyhow!("no resource {}/{}", collection, name))?;
        if resource.stuck {
            bail!("{}/{} is pinned by the engine", collection, name);
        }

        let removed = shelf.remove(name).ok_or_else(|| anyhow!("no resource {}/{}", collection, name))?;
        for (link_collection, link_name) in removed.links {
            if let Ok(held) = self.resource_mut(&link_collection, &link_name) {
                held.users = held.users.saturating_sub(1);
            }
        }
        Ok(())
    }
}
