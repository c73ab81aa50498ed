//! Module Records
//!
//! A `ModuleRecord` is what the registry caches for one loaded unit: its
//! identity, its exports, and the identities it loaded while executing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::value::Value;

const BUILTIN_PREFIX: &str = "builtin:";

/// Canonical identity of a loadable unit.
///
/// For files this is the canonicalized absolute path, so two requests that
/// reach the same file (including through symlinks) share one identity.
/// Built-in modules live under the `builtin:` namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// Identity for an already-canonical file path.
    pub fn from_canonical_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    /// Identity for a built-in module.
    pub fn builtin(name: &str) -> Self {
        Self(format!("{}{}", BUILTIN_PREFIX, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_builtin(&self) -> bool {
        self.0.starts_with(BUILTIN_PREFIX)
    }

    /// Filesystem path of the module, `None` for built-ins.
    pub fn path(&self) -> Option<&Path> {
        if self.is_builtin() {
            None
        } else {
            Some(Path::new(&self.0))
        }
    }

    /// Directory that relative requests made by this module resolve from.
    ///
    /// Built-ins resolve from the process working directory.
    pub fn dirname(&self) -> PathBuf {
        match self.path().and_then(Path::parent) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        }
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached, fully executed module.
#[derive(Debug)]
pub struct ModuleRecord {
    id: ModuleId,
    exports: Value,
    /// Modules this one loaded while executing, in load order.
    children: Vec<ModuleId>,
    /// Installed by the harness rather than produced by executing code.
    synthetic: bool,
}

impl ModuleRecord {
    pub fn new(id: ModuleId, exports: Value, children: Vec<ModuleId>) -> Self {
        Self {
            id,
            exports,
            children,
            synthetic: false,
        }
    }

    /// A record whose exports is exactly `exports`, standing in for `id`.
    pub fn synthetic(id: ModuleId, exports: Value) -> Arc<Self> {
        Arc::new(Self {
            id,
            exports,
            children: Vec::new(),
            synthetic: true,
        })
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn exports(&self) -> &Value {
        &self.exports
    }

    pub fn children(&self) -> &[ModuleId] {
        &self.children
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// Whoever is performing a load: a test file, or a module mid-execution.
///
/// Loads append the identities they produce to `children`; that list is
/// what leak detection walks.
#[derive(Debug, Clone)]
pub struct ParentContext {
    filename: PathBuf,
    children: Vec<ModuleId>,
}

impl ParentContext {
    /// Context for a caller living at `filename`.
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            children: Vec::new(),
        }
    }

    /// Context for a module that is about to execute.
    pub fn for_module(id: &ModuleId) -> Self {
        match id.path() {
            Some(path) => Self::new(path),
            None => Self::new(id.dirname().join(id.as_str())),
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Directory requests from this context resolve against. A bare
    /// filename resolves from the working directory.
    pub fn dirname(&self) -> &Path {
        match self.filename.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    pub fn children(&self) -> &[ModuleId] {
        &self.children
    }

    /// Record a load edge unless it is already present.
    pub fn add_child(&mut self, id: &ModuleId) {
        if !self.children.contains(id) {
            self.children.push(id.clone());
        }
    }

    /// Remove a load edge, returning whether it was there.
    pub fn remove_child(&mut self, id: &ModuleId) -> bool {
        match self.children.iter().position(|child| child == id) {
            Some(index) => {
                self.children.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop every edge recorded after the list had `len` entries.
    pub fn truncate_children(&mut self, len: usize) {
        self.children.truncate(len);
    }

    pub(crate) fn into_children(self) -> Vec<ModuleId> {
        self.children
    }
}
