/// depswap - Transactional Dependency Substitution
///
/// This library loads a module-under-test with some of its dependencies
/// replaced by caller-supplied exports, then restores the shared module
/// registry exactly as it was, whether the load succeeded or failed.
///
/// # Architecture
///
/// 1. **Module system** (`modules` module)
///    - `ModuleId` identities, cached `ModuleRecord`s, `ParentContext` load edges
///    - Shared `ModuleRegistry`, written only through `RegistryAdapter`
///    - `AliasTable` rewriting, consulted before filesystem resolution
///    - `ModuleLoader` trait and the in-process `ModuleHost`
///
/// 2. **Substitution** (`stub` module)
///    - Warm-up load against the untouched registry
///    - Snapshot and substitute each stubbed identity
///    - Execute the target again, then restore through a drop guard
///    - `Harness` attachment that deregisters itself from its caller
///
/// # Example
///
/// ```rust,no_run
/// use depswap::{Harness, ModuleHost, ParentContext, Stubs, Value};
///
/// let host = ModuleHost::global();
/// let mut me = ParentContext::new("/project/tests/a_test.rs");
/// let harness = Harness::attach(host, &mut me)?;
///
/// let stubs = Stubs::new().with("./b", Value::function(|_| Ok(Value::from("hello mock"))));
/// let a = harness.run("../src/a", &mut me, &stubs)?;
/// assert_eq!(a.call_member("default", &[])?, Value::from("hello mock"));
/// # Ok::<(), depswap::LoadError>(())
/// ```

pub mod config;
pub mod error;
pub mod logging;
pub mod modules;
pub mod stub;
pub mod value;

use std::collections::BTreeMap;
use std::path::PathBuf;

pub use config::HostConfig;
pub use error::{ConfigError, ExecutionError, LoadError, LoadResult, ResolutionError};
pub use modules::{ModuleHost, ModuleId, ModuleLoader, ModuleRecord, ParentContext};
pub use stub::{Harness, Stubs};
pub use value::Value;

/// Run a substitution transaction on the process-wide host.
pub fn run(request: &str, parent: &mut ParentContext, stubs: &Stubs) -> LoadResult<Value> {
    stub::run(ModuleHost::global().as_ref(), request, parent, stubs)
}

/// Add a process-wide alias.
pub fn alias(token: impl Into<String>, rule: impl Into<PathBuf>) {
    modules::global_aliases().write().add(token, rule);
}

/// Remove a process-wide alias.
pub fn unalias(token: &str) {
    modules::global_aliases().write().remove(token);
}

/// The current process-wide aliases.
pub fn get_aliases() -> BTreeMap<String, PathBuf> {
    modules::global_aliases().read().get().clone()
}
