//! Module Registry
//!
//! The shared identity → record cache every load goes through, plus the
//! set of identities currently executing (cycle detection).
//!
//! Reads are open to anyone holding a `SharedModuleRegistry`; writes go
//! through [`RegistryAdapter`](super::RegistryAdapter).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::record::{ModuleId, ModuleRecord};

/// Module registry for tracking loaded modules.
#[derive(Default)]
pub struct ModuleRegistry {
    /// Loaded modules by identity.
    modules: HashMap<ModuleId, Arc<ModuleRecord>>,

    /// Identities currently executing.
    loading_modules: HashSet<ModuleId>,
}

impl ModuleRegistry {
    /// Create a new empty module registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ModuleId) -> Option<Arc<ModuleRecord>> {
        self.modules.get(id).cloned()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    /// Insert a record, returning whatever it displaced.
    pub(crate) fn insert(&mut self, id: ModuleId, record: Arc<ModuleRecord>) -> Option<Arc<ModuleRecord>> {
        self.modules.insert(id, record)
    }

    pub(crate) fn remove(&mut self, id: &ModuleId) -> Option<Arc<ModuleRecord>> {
        self.modules.remove(id)
    }

    /// Check if a module is currently being loaded (cycle detection).
    pub fn is_loading(&self, id: &ModuleId) -> bool {
        self.loading_modules.contains(id)
    }

    /// Mark a module as being loaded. Returns false if it already was.
    pub(crate) fn mark_loading(&mut self, id: &ModuleId) -> bool {
        self.loading_modules.insert(id.clone())
    }

    pub(crate) fn unmark_loading(&mut self, id: &ModuleId) {
        self.loading_modules.remove(id);
    }

    /// Get the number of cached modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Identities of every cached module, sorted.
    pub fn ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self.modules.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Iterate over all cached records.
    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &Arc<ModuleRecord>)> {
        self.modules.iter()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("module_count", &self.modules.len())
            .field("loading_count", &self.loading_modules.len())
            .finish()
    }
}

/// Thread-safe wrapper for ModuleRegistry.
pub type SharedModuleRegistry = Arc<RwLock<ModuleRegistry>>;

/// Create a new shared module registry.
pub fn new_shared_registry() -> SharedModuleRegistry {
    Arc::new(RwLock::new(ModuleRegistry::new()))
}

/// The process-wide registry, created on first use.
pub fn global_registry() -> SharedModuleRegistry {
    static GLOBAL: OnceLock<SharedModuleRegistry> = OnceLock::new();
    Arc::clone(GLOBAL.get_or_init(new_shared_registry))
}
