//! Concurrent registry of loaded plugins keyed by name

use crate::plugin::LoadedPlugin;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::debug;

/// Registry of loaded plugins
pub trait PluginStore: Send + Sync {
    /// Number of plugins
    fn size(&self) -> usize;

    /// Insert a plugin under its descriptor name
    ///
    /// Does nothing when the name is empty. An existing entry is replaced
    /// only when `forced` is set. Returns whether the plugin was written.
    fn put(&self, item: LoadedPlugin, forced: bool) -> bool;

    /// Get a plugin by name
    fn get(&self, name: &str) -> Option<LoadedPlugin>;

    /// Remove a plugin, returning it
    fn remove(&self, name: &str) -> Option<LoadedPlugin>;

    /// Names of all plugins
    fn names(&self) -> Vec<String>;
}

/// In-memory store guarded by a reader-writer lock
#[derive(Default)]
pub struct MemoryStore {
    plugins: RwLock<HashMap<String, LoadedPlugin>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("plugins", &self.names())
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl PluginStore for MemoryStore {
    fn size(&self) -> usize {
        self.plugins.read().len()
    }

    fn put(&self, item: LoadedPlugin, forced: bool) -> bool {
        if item.name().is_empty() {
            return false;
        }

        // Presence check and write share one write-lock acquisition.
        let mut plugins = self.plugins.write();
        match plugins.entry(item.name().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(item);
                true
            }
            Entry::Occupied(mut slot) if forced => {
                debug!(plugin = %slot.key(), "Replacing loaded plugin");
                slot.insert(item);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    fn get(&self, name: &str) -> Option<LoadedPlugin> {
        self.plugins.read().get(name).cloned()
    }

    fn remove(&self, name: &str) -> Option<LoadedPlugin> {
        self.plugins.write().remove(name)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.read().keys().cloned().collect();
        names.sort();
        names
    }
}
