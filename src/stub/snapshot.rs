//! Snapshot and restore.
//!
//! `RestoreGuard` owns everything a transaction has displaced. Dropping it
//! puts the registry back, whichever way the transaction exits: identities
//! first cached while stubs were installed are evicted, snapshots are
//! written back, and the real target is reinstated.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::modules::{ModuleId, ModuleRecord, RegistryAdapter};

/// Identity → slot content before the transaction touched it.
#[derive(Debug, Default)]
pub struct SnapshotTable {
    slots: BTreeMap<ModuleId, Option<Arc<ModuleRecord>>>,
}

impl SnapshotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current content of `id`. Only the first capture per
    /// identity is kept, so a slot overwritten twice restores to its
    /// original content.
    pub fn capture(&mut self, adapter: &RegistryAdapter, id: &ModuleId) {
        if !self.slots.contains_key(id) {
            self.slots.insert(id.clone(), adapter.get(id));
        }
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Write every captured slot back and empty the table.
    pub fn restore(&mut self, adapter: &RegistryAdapter) {
        for (id, snapshot) in std::mem::take(&mut self.slots) {
            adapter.restore(&id, snapshot);
        }
    }
}

/// Restores the snapshot table, then the target, when dropped.
pub struct RestoreGuard<'a> {
    adapter: &'a RegistryAdapter,
    snapshot: SnapshotTable,
    target: ModuleId,
    true_module: Option<Arc<ModuleRecord>>,
    /// Cached identities when the execute phase began.
    baseline: Option<BTreeSet<ModuleId>>,
}

impl<'a> RestoreGuard<'a> {
    /// Start guarding `target`, whose real record was `true_module`.
    pub fn new(
        adapter: &'a RegistryAdapter,
        target: ModuleId,
        true_module: Option<Arc<ModuleRecord>>,
    ) -> Self {
        Self {
            adapter,
            snapshot: SnapshotTable::new(),
            target,
            true_module,
            baseline: None,
        }
    }

    /// Snapshot `id`, then install `record` in its place.
    pub fn substitute(&mut self, id: &ModuleId, record: Arc<ModuleRecord>) {
        self.snapshot.capture(self.adapter, id);
        self.adapter.replace(id, Some(record));
    }

    pub fn snapshot(&self) -> &SnapshotTable {
        &self.snapshot
    }

    /// Remember what is cached right now. Anything cached after this call
    /// is evicted on drop.
    pub fn begin_execute(&mut self) {
        self.baseline = Some(self.adapter.ids().into_iter().collect());
    }

    fn evict_new_entries(&mut self) -> usize {
        let Some(baseline) = self.baseline.take() else {
            return 0;
        };
        let added: Vec<ModuleId> = self
            .adapter
            .ids()
            .into_iter()
            .filter(|id| !baseline.contains(id))
            .collect();
        for id in &added {
            self.adapter.delete(id);
        }
        added.len()
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        let evicted = self.evict_new_entries();
        let restored = self.snapshot.len();
        self.snapshot.restore(self.adapter);
        self.adapter.replace(&self.target, self.true_module.take());
        debug!(target: "depswap::stub::restore", target = %self.target, restored, evicted);
    }
}
