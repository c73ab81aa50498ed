//! Module Host
//!
//! The execute-and-cache primitive the substitution transaction drives.
//!
//! `ModuleLoader` is the seam: anything that can load an identity on behalf
//! of a parent, caching through a [`RegistryAdapter`], can host
//! substitutions. `ModuleHost` is the in-process implementation, where each
//! module file on disk is backed by a native body registered with
//! [`ModuleHost::define`].
//!
//! # Load semantics
//!
//! - Cached identity: return the cached record, record the edge.
//! - Identity already executing: `LoadError::CircularImport`.
//! - Otherwise run the body with a fresh [`ModuleScope`]; on success cache
//!   the record and record the edge. A failed load caches nothing and adds
//!   no edge; an execution error is tagged with the innermost module that
//!   raised it.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use super::adapter::RegistryAdapter;
use super::alias::{global_aliases, new_shared_aliases, SharedAliasTable};
use super::record::{ModuleId, ModuleRecord, ParentContext};
use super::registry::{global_registry, new_shared_registry, SharedModuleRegistry};
use super::resolver::{FileResolver, FsResolver, Resolver};
use crate::config::HostConfig;
use crate::error::{LoadError, LoadResult, ResolutionError};
use crate::value::Value;

/// Native module body.
pub type ModuleBody = Arc<dyn Fn(&mut ModuleScope<'_>) -> LoadResult<Value> + Send + Sync>;

/// Execute-or-return-cached loading over a shared registry.
pub trait ModuleLoader: Send + Sync {
    /// The adapter every cache write goes through.
    fn registry(&self) -> &RegistryAdapter;

    /// Resolver for requests made against this loader.
    fn resolver(&self) -> &Resolver;

    /// Load `id`, appending a child edge to `parent`.
    fn load(&self, id: &ModuleId, parent: &mut ParentContext) -> LoadResult<Arc<ModuleRecord>>;

    /// Resolve `request` from `parent`'s directory and load it.
    fn require(&self, request: &str, parent: &mut ParentContext) -> LoadResult<Value> {
        let id = self.resolver().resolve(request, parent.dirname())?;
        Ok(self.load(&id, parent)?.exports().clone())
    }
}

/// In-process module host.
pub struct ModuleHost {
    registry: RegistryAdapter,
    resolver: Resolver,
    definitions: DashMap<ModuleId, ModuleBody>,
}

impl ModuleHost {
    /// A host with its own registry and alias table.
    pub fn new(config: &HostConfig) -> Self {
        Self::with_shared(new_shared_registry(), new_shared_aliases(), config)
    }

    /// A host over an existing registry and alias table.
    ///
    /// Aliases from `config` are added to `aliases`.
    pub fn with_shared(
        registry: SharedModuleRegistry,
        aliases: SharedAliasTable,
        config: &HostConfig,
    ) -> Self {
        let files = FsResolver::new(config.resolve.module_dirs.clone());
        Self::with_resolver(registry, aliases, Arc::new(files), config)
    }

    /// A host with a custom filesystem resolution capability.
    pub fn with_resolver(
        registry: SharedModuleRegistry,
        aliases: SharedAliasTable,
        files: Arc<dyn FileResolver>,
        config: &HostConfig,
    ) -> Self {
        {
            let mut table = aliases.write();
            for (token, target) in config.alias_entries() {
                table.add(token, target);
            }
        }
        let resolver = Resolver::new(files, aliases, config.resolve.extensions.clone());
        Self {
            registry: RegistryAdapter::new(registry),
            resolver,
            definitions: DashMap::new(),
        }
    }

    /// The process-wide host, over the global registry and alias table.
    ///
    /// Configured from the first `depswap.toml` found walking up from the
    /// working directory, or defaults if there is none.
    pub fn global() -> Arc<ModuleHost> {
        static GLOBAL: OnceLock<Arc<ModuleHost>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| {
            let config = std::env::current_dir()
                .ok()
                .map(|dir| HostConfig::discover(&dir))
                .transpose()
                .unwrap_or_else(|e| {
                    warn!(target: "depswap::host::global", error = %e, "ignoring unreadable config");
                    None
                })
                .flatten()
                .unwrap_or_default();
            Arc::new(ModuleHost::with_shared(
                global_registry(),
                global_aliases(),
                &config,
            ))
        }))
    }

    /// Register the body of the module file at `path`.
    ///
    /// The file must exist: its canonical path becomes the identity.
    pub fn define<F>(&self, path: impl AsRef<Path>, body: F) -> Result<ModuleId, ResolutionError>
    where
        F: Fn(&mut ModuleScope<'_>) -> LoadResult<Value> + Send + Sync + 'static,
    {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).map_err(|e| {
            ResolutionError::new(
                path.to_string_lossy(),
                path.parent().unwrap_or_else(|| Path::new(".")),
                e.to_string(),
            )
        })?;
        let id = ModuleId::from_canonical_path(&canonical);
        self.define_id(id.clone(), Arc::new(body));
        Ok(id)
    }

    /// Register a built-in module under `builtin:<name>`.
    pub fn define_builtin<F>(&self, name: &str, body: F) -> ModuleId
    where
        F: Fn(&mut ModuleScope<'_>) -> LoadResult<Value> + Send + Sync + 'static,
    {
        let id = ModuleId::builtin(name);
        self.define_id(id.clone(), Arc::new(body));
        id
    }

    fn define_id(&self, id: ModuleId, body: ModuleBody) {
        trace!(target: "depswap::host::define", %id);
        self.definitions.insert(id, body);
    }

    pub fn is_defined(&self, id: &ModuleId) -> bool {
        self.definitions.contains_key(id)
    }

    /// Registry handle, for inspection.
    pub fn shared_registry(&self) -> &SharedModuleRegistry {
        self.registry.shared()
    }
}

impl ModuleLoader for ModuleHost {
    fn registry(&self) -> &RegistryAdapter {
        &self.registry
    }

    fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    fn load(&self, id: &ModuleId, parent: &mut ParentContext) -> LoadResult<Arc<ModuleRecord>> {
        if let Some(cached) = self.registry.get(id) {
            trace!(target: "depswap::host::load", %id, cached = true);
            parent.add_child(id);
            return Ok(cached);
        }

        let body = self
            .definitions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LoadError::MissingDefinition(id.clone()))?;

        let loading = LoadingGuard::enter(&self.registry, id)?;
        let mut scope = ModuleScope {
            host: self,
            id: id.clone(),
            context: ParentContext::for_module(id),
        };
        let result = body(&mut scope);
        drop(loading);

        let exports = result.map_err(|err| tag_origin(err, id))?;
        let record = Arc::new(ModuleRecord::new(
            id.clone(),
            exports,
            scope.context.into_children(),
        ));
        self.registry.set(id, Arc::clone(&record));
        parent.add_child(id);
        debug!(target: "depswap::host::load", %id, children = record.children().len());
        Ok(record)
    }
}

impl Default for ModuleHost {
    fn default() -> Self {
        Self::new(&HostConfig::default())
    }
}

impl std::fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHost")
            .field("definitions", &self.definitions.len())
            .field("cached", &self.registry.module_count())
            .field("resolver", &self.resolver)
            .finish()
    }
}

/// Attribute an untagged execution error to the module whose body raised it.
/// Errors already tagged further down the load stack keep their origin.
fn tag_origin(err: LoadError, id: &ModuleId) -> LoadError {
    match err {
        LoadError::Execution(exec) if exec.module().is_none() => {
            LoadError::Execution(exec.in_module(id.clone()))
        }
        other => other,
    }
}

/// Marks an identity as executing for as long as it lives.
struct LoadingGuard<'a> {
    registry: &'a RegistryAdapter,
    id: &'a ModuleId,
}

impl<'a> LoadingGuard<'a> {
    fn enter(registry: &'a RegistryAdapter, id: &'a ModuleId) -> LoadResult<Self> {
        if !registry.mark_loading(id) {
            return Err(LoadError::CircularImport(id.clone()));
        }
        Ok(Self { registry, id })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.registry.unmark_loading(self.id);
    }
}

/// What a module body sees while it executes.
pub struct ModuleScope<'h> {
    host: &'h ModuleHost,
    id: ModuleId,
    context: ParentContext,
}

impl ModuleScope<'_> {
    /// Identity of the executing module.
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Directory relative requests resolve from.
    pub fn dirname(&self) -> &Path {
        self.context.dirname()
    }

    /// Load a dependency and return its exports.
    pub fn require(&mut self, request: &str) -> LoadResult<Value> {
        self.host.require(request, &mut self.context)
    }

    /// Dependencies loaded so far.
    pub fn children(&self) -> &[ModuleId] {
        self.context.children()
    }
}
