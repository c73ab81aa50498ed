//! Harness attachment and self-deregistration.
//!
//! The harness is a module of the host like any other (`builtin:depswap`),
//! so attaching it is a real load on behalf of the caller. Right after that
//! load it deletes its own registry slot and splices its own edge out of the
//! caller's child list: leak detection over the caller's dependency graph
//! never sees it. Having deleted its slot, every attach is a fresh load and
//! deregisters again.

use std::sync::Arc;

use tracing::debug;

use super::stubs::Stubs;
use super::transaction;
use crate::error::LoadResult;
use crate::modules::{AliasTable, ModuleHost, ModuleId, ModuleLoader, ParentContext};
use crate::value::Value;

/// Name the harness registers itself under.
pub const HARNESS_MODULE: &str = "depswap";

/// Handle through which a test runs substitution transactions.
#[derive(Debug, Clone)]
pub struct Harness {
    host: Arc<ModuleHost>,
}

impl Harness {
    /// Load the harness on behalf of `parent`, then remove every trace of
    /// that load.
    pub fn attach(host: Arc<ModuleHost>, parent: &mut ParentContext) -> LoadResult<Self> {
        let id = ModuleId::builtin(HARNESS_MODULE);
        if !host.is_defined(&id) {
            host.define_builtin(HARNESS_MODULE, |_| Ok(Value::Unit));
        }

        host.load(&id, parent)?;
        deregister(host.as_ref(), &id, parent);
        Ok(Self { host })
    }

    /// Attach to the process-wide host.
    pub fn global(parent: &mut ParentContext) -> LoadResult<Self> {
        Self::attach(ModuleHost::global(), parent)
    }

    pub fn host(&self) -> &Arc<ModuleHost> {
        &self.host
    }

    /// Load `request` with `stubs` substituted. See [`transaction::run`].
    pub fn run(&self, request: &str, parent: &mut ParentContext, stubs: &Stubs) -> LoadResult<Value> {
        transaction::run(self.host.as_ref(), request, parent, stubs)
    }

    /// Alias `token` to `rule` on this host's alias table.
    pub fn alias(&self, token: impl Into<String>, rule: impl Into<std::path::PathBuf>) {
        self.host.resolver().aliases().write().add(token, rule);
    }

    pub fn unalias(&self, token: &str) {
        self.host.resolver().aliases().write().remove(token);
    }

    /// Snapshot of this host's alias table.
    pub fn aliases(&self) -> AliasTable {
        self.host.resolver().aliases().read().clone()
    }
}

fn deregister<L>(loader: &L, id: &ModuleId, parent: &mut ParentContext)
where
    L: ModuleLoader + ?Sized,
{
    loader.registry().delete(id);
    let spliced = parent.remove_child(id);
    debug!(target: "depswap::stub::bootstrap", parent = %parent.filename().display(), spliced);
}
