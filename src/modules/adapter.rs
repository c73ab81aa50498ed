//! Registry Adapter
//!
//! The single write path into a [`SharedModuleRegistry`]. Each call takes
//! the lock for exactly one operation, so callers never hold it across
//! module execution.

use std::sync::Arc;

use tracing::trace;

use super::record::{ModuleId, ModuleRecord};
use super::registry::SharedModuleRegistry;

/// Accessor over a shared registry: get, set, delete, replace, restore.
#[derive(Clone, Debug)]
pub struct RegistryAdapter {
    registry: SharedModuleRegistry,
}

impl RegistryAdapter {
    pub fn new(registry: SharedModuleRegistry) -> Self {
        Self { registry }
    }

    /// The registry this adapter writes to.
    pub fn shared(&self) -> &SharedModuleRegistry {
        &self.registry
    }

    pub fn get(&self, id: &ModuleId) -> Option<Arc<ModuleRecord>> {
        self.registry.read().get(id)
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.registry.read().contains(id)
    }

    pub fn set(&self, id: &ModuleId, record: Arc<ModuleRecord>) {
        trace!(target: "depswap::registry::set", %id, synthetic = record.is_synthetic());
        self.registry.write().insert(id.clone(), record);
    }

    pub fn delete(&self, id: &ModuleId) {
        trace!(target: "depswap::registry::delete", %id);
        self.registry.write().remove(id);
    }

    /// Delete then set. A `None` record leaves the slot alone.
    pub fn replace(&self, id: &ModuleId, record: Option<Arc<ModuleRecord>>) {
        if let Some(record) = record {
            let mut registry = self.registry.write();
            registry.remove(id);
            registry.insert(id.clone(), record);
        }
    }

    /// Put a slot back to a snapshot: a record is reinstated, absence
    /// removes the slot.
    pub fn restore(&self, id: &ModuleId, snapshot: Option<Arc<ModuleRecord>>) {
        trace!(target: "depswap::registry::restore", %id, present = snapshot.is_some());
        match snapshot {
            Some(record) => self.replace(id, Some(record)),
            None => self.delete(id),
        }
    }

    /// Check if a module is currently being loaded.
    pub fn is_loading(&self, id: &ModuleId) -> bool {
        self.registry.read().is_loading(id)
    }

    /// Mark a module as executing. Returns false if it already was.
    pub fn mark_loading(&self, id: &ModuleId) -> bool {
        self.registry.write().mark_loading(id)
    }

    pub fn unmark_loading(&self, id: &ModuleId) {
        self.registry.write().unmark_loading(id);
    }

    /// Get the number of cached modules.
    pub fn module_count(&self) -> usize {
        self.registry.read().module_count()
    }

    /// Identities of every cached module, sorted.
    pub fn ids(&self) -> Vec<ModuleId> {
        self.registry.read().ids()
    }
}
