//! Error types for resolution, loading, and configuration.
//!
//! `LoadError` is the umbrella returned by every load and by the
//! substitution transaction. Module bodies return it too, so nested
//! `require` failures propagate with `?`.

use std::path::PathBuf;

use crate::modules::ModuleId;

/// Result type for module loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// A request could not be mapped to a module identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    /// The request as the caller wrote it (after alias rewriting).
    pub request: String,
    /// Directory the request was resolved from.
    pub base_dir: PathBuf,
    /// Why resolution failed.
    pub reason: String,
}

impl ResolutionError {
    pub fn new(request: impl Into<String>, base_dir: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            base_dir: base_dir.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(request: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self::new(request, base_dir, "no matching file")
    }
}

impl std::fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cannot resolve '{}' from '{}': {}",
            self.request,
            self.base_dir.display(),
            self.reason
        )
    }
}

impl std::error::Error for ResolutionError {}

/// An error raised by module code itself.
///
/// Carried through the transaction untouched, so callers can compare the
/// returned error against the one their stub raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    message: String,
    module: Option<ModuleId>,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            module: None,
        }
    }

    /// Attach the identity of the module that raised the error.
    pub fn in_module(mut self, module: ModuleId) -> Self {
        self.module = Some(module);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn module(&self) -> Option<&ModuleId> {
        self.module.as_ref()
    }
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{} (in {})", self.message, module),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Errors that can occur while loading a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// A request could not be resolved.
    Resolution(ResolutionError),
    /// The module (or something it called) raised an error.
    Execution(ExecutionError),
    /// The module is already executing further up the load stack.
    CircularImport(ModuleId),
    /// The identity resolved, but the host has no body for it.
    MissingDefinition(ModuleId),
}

impl LoadError {
    /// The execution error, if this is one.
    pub fn as_execution(&self) -> Option<&ExecutionError> {
        match self {
            LoadError::Execution(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, LoadError::Resolution(_))
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Resolution(err) => write!(f, "{}", err),
            LoadError::Execution(err) => write!(f, "Execution error: {}", err),
            LoadError::CircularImport(id) => write!(f, "Circular import detected: {}", id),
            LoadError::MissingDefinition(id) => {
                write!(f, "No module definition registered for {}", id)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Resolution(err) => Some(err),
            LoadError::Execution(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResolutionError> for LoadError {
    fn from(err: ResolutionError) -> Self {
        LoadError::Resolution(err)
    }
}

impl From<ExecutionError> for LoadError {
    fn from(err: ExecutionError) -> Self {
        LoadError::Execution(err)
    }
}

/// Errors reading `depswap.toml`.
#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read.
    Io(PathBuf, std::io::Error),
    /// File could not be parsed.
    Parse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, err) => {
                write!(f, "Failed to read '{}': {}", path.display(), err)
            }
            ConfigError::Parse(path, err) => {
                write!(f, "Failed to parse '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, err) => Some(err),
            ConfigError::Parse(_, err) => Some(err),
        }
    }
}
