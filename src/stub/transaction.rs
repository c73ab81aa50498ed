//! Substitution Transaction
//!
//! Loads a module with some of its dependencies replaced, then puts the
//! registry back exactly as it was.
//!
//! # Phases
//!
//! 1. **Resolve** the request from the caller's directory.
//! 2. **Warm up**: load the target for real, so every transitive dependency
//!    is cached the way production code would cache it. The probe edge is
//!    removed from the caller, the real record is kept aside, and the
//!    target's slot is cleared so the next load relinks.
//! 3. **Substitute**: resolve each stub from the *target's* directory,
//!    snapshot its slot, install a synthetic record.
//! 4. **Execute**: load the target again; requests for stubbed identities
//!    hit the synthetic records. The edge is removed from the caller.
//! 5. **Restore**: the [`RestoreGuard`] drops. Identities first cached during
//!    execute are evicted, every snapshot is written back, and the real
//!    target record is reinstated.
//! 6. Return the exports, or the execute-phase error unchanged.
//!
//! Because warm-up has already cached the target's dependencies, a stub
//! only reaches modules the target loads directly on re-execution; deeper
//! modules keep the real dependency they were linked against.

use tracing::{debug, trace};

use super::snapshot::RestoreGuard;
use super::stubs::Stubs;
use crate::error::LoadResult;
use crate::modules::{ModuleId, ModuleLoader, ModuleRecord, ParentContext};
use crate::value::Value;

/// Load `request` for `parent` with `stubs` substituted, returning the
/// target's exports.
///
/// On return, successful or not, every registry slot the transaction
/// touched holds what it held before, and `parent`'s child list has its
/// original length.
pub fn run<L>(
    loader: &L,
    request: &str,
    parent: &mut ParentContext,
    stubs: &Stubs,
) -> LoadResult<Value>
where
    L: ModuleLoader + ?Sized,
{
    let resolver = loader.resolver();
    let adapter = loader.registry();

    let target_id = resolver.resolve(request, parent.dirname())?;
    debug!(target: "depswap::stub::run", %request, target = %target_id, stubs = stubs.len());

    let true_module = warm_up(loader, &target_id, parent)?;

    let mut guard = RestoreGuard::new(adapter, target_id.clone(), Some(true_module));

    let target_dir = target_id.dirname();
    for (stub_request, exports) in stubs.iter() {
        let stub_id = resolver.resolve(stub_request, &target_dir)?;
        trace!(target: "depswap::stub::substitute", request = %stub_request, id = %stub_id);
        guard.substitute(&stub_id, ModuleRecord::synthetic(stub_id.clone(), exports.clone()));
    }

    guard.begin_execute();
    let result = load_probe(loader, &target_id, parent);
    if let Err(e) = &result {
        debug!(target: "depswap::stub::execute", target = %target_id, error = %e);
    }
    drop(guard);

    let record = result?;
    debug!(target: "depswap::stub::run", target = %target_id, "loaded with stubs");
    Ok(record.exports().clone())
}

/// Load the target against the untouched registry, keep its record, and
/// clear its slot.
fn warm_up<L>(
    loader: &L,
    target_id: &ModuleId,
    parent: &mut ParentContext,
) -> LoadResult<std::sync::Arc<ModuleRecord>>
where
    L: ModuleLoader + ?Sized,
{
    let true_module = load_probe(loader, target_id, parent)?;
    loader.registry().delete(target_id);
    trace!(target: "depswap::stub::warm_up", target = %target_id);
    Ok(true_module)
}

/// A load that leaves no edge behind on `parent`.
fn load_probe<L>(
    loader: &L,
    id: &ModuleId,
    parent: &mut ParentContext,
) -> LoadResult<std::sync::Arc<ModuleRecord>>
where
    L: ModuleLoader + ?Sized,
{
    let edges = parent.children().len();
    let result = loader.load(id, parent);
    parent.truncate_children(edges);
    result
}
