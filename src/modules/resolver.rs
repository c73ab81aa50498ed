//! Module Path Resolution
//!
//! Supports three request shapes:
//! - `./x`, `../x` - Relative to the requesting directory
//! - `/abs/x` - Absolute path
//! - `bare_name` - Looked up in module directories, walking up to the root
//!
//! Each location is tried as the exact file, then with every recognized
//! extension appended, then as a directory holding `index.<ext>`.

use std::path::{Path, PathBuf};

use tracing::trace;

use super::alias::SharedAliasTable;
use super::record::ModuleId;
use crate::error::ResolutionError;

/// Options passed to a [`FileResolver`].
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions<'a> {
    /// Directory the request is resolved from.
    pub base_dir: &'a Path,
    /// Recognized extensions, with the leading dot (`.mod`).
    pub extensions: &'a [String],
}

/// Filesystem resolution capability.
pub trait FileResolver: Send + Sync {
    fn resolve_sync(
        &self,
        request: &str,
        options: &ResolveOptions<'_>,
    ) -> Result<ModuleId, ResolutionError>;
}

/// Resolver over the real filesystem.
#[derive(Debug, Clone)]
pub struct FsResolver {
    module_dirs: Vec<String>,
}

impl Default for FsResolver {
    fn default() -> Self {
        Self::new(vec!["modules".to_string()])
    }
}

impl FsResolver {
    pub fn new(module_dirs: Vec<String>) -> Self {
        Self { module_dirs }
    }

    pub fn module_dirs(&self) -> &[String] {
        &self.module_dirs
    }

    /// Try `location` as a file, as a file with an extension, then as a
    /// directory index.
    fn try_location(location: &Path, extensions: &[String]) -> Option<PathBuf> {
        if location.is_file() {
            return Some(location.to_path_buf());
        }
        for ext in extensions {
            let mut candidate = location.as_os_str().to_os_string();
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if location.is_dir() {
            for ext in extensions {
                let candidate = location.join(format!("index{}", ext));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn find_bare(&self, request: &str, options: &ResolveOptions<'_>) -> Option<PathBuf> {
        options.base_dir.ancestors().find_map(|dir| {
            self.module_dirs.iter().find_map(|modules| {
                Self::try_location(&dir.join(modules).join(request), options.extensions)
            })
        })
    }
}

fn is_path_request(request: &str) -> bool {
    request == "."
        || request == ".."
        || request.starts_with("./")
        || request.starts_with("../")
        || Path::new(request).is_absolute()
}

impl FileResolver for FsResolver {
    fn resolve_sync(
        &self,
        request: &str,
        options: &ResolveOptions<'_>,
    ) -> Result<ModuleId, ResolutionError> {
        if request.is_empty() {
            return Err(ResolutionError::new(
                request,
                options.base_dir,
                "empty request",
            ));
        }

        let found = if is_path_request(request) {
            Self::try_location(&options.base_dir.join(request), options.extensions)
        } else {
            self.find_bare(request, options)
        };

        let path = found.ok_or_else(|| ResolutionError::not_found(request, options.base_dir))?;
        let canonical = std::fs::canonicalize(&path).map_err(|e| {
            ResolutionError::new(request, options.base_dir, e.to_string())
        })?;
        Ok(ModuleId::from_canonical_path(&canonical))
    }
}

/// Alias-aware resolution of requests to identities.
#[derive(Clone)]
pub struct Resolver {
    files: std::sync::Arc<dyn FileResolver>,
    aliases: SharedAliasTable,
    extensions: Vec<String>,
}

impl Resolver {
    pub fn new(
        files: std::sync::Arc<dyn FileResolver>,
        aliases: SharedAliasTable,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            files,
            aliases,
            extensions,
        }
    }

    pub fn aliases(&self) -> &SharedAliasTable {
        &self.aliases
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Apply aliases to `request` as seen from `base_dir`.
    pub fn rewrite(&self, request: &str, base_dir: &Path) -> String {
        let aliases = self.aliases.read();
        if aliases.is_aliased(request) {
            aliases.relative(base_dir, request)
        } else {
            request.to_string()
        }
    }

    /// Resolve `request` from `base_dir` to a module identity.
    pub fn resolve(&self, request: &str, base_dir: &Path) -> Result<ModuleId, ResolutionError> {
        let rewritten = self.rewrite(request, base_dir);
        let options = ResolveOptions {
            base_dir,
            extensions: &self.extensions,
        };
        let id = self.files.resolve_sync(&rewritten, &options)?;
        trace!(target: "depswap::resolver::resolve", %request, %rewritten, %id);
        Ok(id)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("aliases", &self.aliases.read().get().len())
            .field("extensions", &self.extensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::new_shared_aliases;
    use std::sync::Arc;

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    fn exts() -> Vec<String> {
        vec![".mod".to_string()]
    }

    fn resolve(request: &str, base: &Path) -> Result<ModuleId, ResolutionError> {
        let exts = exts();
        FsResolver::default().resolve_sync(
            request,
            &ResolveOptions {
                base_dir: base,
                extensions: &exts,
            },
        )
    }

    fn canonical(rel: &str) -> ModuleId {
        ModuleId::from_canonical_path(&std::fs::canonicalize(fixtures_dir().join(rel)).unwrap())
    }

    #[test]
    fn test_resolve_with_extension() {
        let id = resolve("./a", &fixtures_dir()).unwrap();
        assert_eq!(id, canonical("a.mod"));
    }

    #[test]
    fn test_resolve_exact_file() {
        let id = resolve("./a.mod", &fixtures_dir()).unwrap();
        assert_eq!(id, canonical("a.mod"));
    }

    #[test]
    fn test_same_file_same_identity() {
        let from_root = resolve("./lib/greeting", &fixtures_dir()).unwrap();
        let from_lib = resolve("./greeting", &fixtures_dir().join("lib")).unwrap();
        let roundabout = resolve("../fixtures/lib/../a", &fixtures_dir()).unwrap();
        assert_eq!(from_root, from_lib);
        assert_eq!(roundabout, canonical("a.mod"));
    }

    #[test]
    fn test_resolve_directory_index() {
        let id = resolve("./nested", &fixtures_dir()).unwrap();
        assert_eq!(id, canonical("nested/index.mod"));
    }

    #[test]
    fn test_resolve_bare_walks_up() {
        let id = resolve("formatter", &fixtures_dir().join("nested")).unwrap();
        assert_eq!(id, canonical("modules/formatter.mod"));
    }

    #[test]
    fn test_resolve_missing() {
        let err = resolve("./wat-this-path-does-not-exist", &fixtures_dir()).unwrap_err();
        assert_eq!(err.request, "./wat-this-path-does-not-exist");
        assert_eq!(err.base_dir, fixtures_dir());
    }

    #[test]
    fn test_resolve_empty_request() {
        let err = resolve("", &fixtures_dir()).unwrap_err();
        assert_eq!(err.reason, "empty request");
    }

    #[test]
    fn test_resolver_applies_aliases() {
        let aliases = new_shared_aliases();
        aliases.write().add("@lib", fixtures_dir().join("lib"));
        let resolver = Resolver::new(Arc::new(FsResolver::default()), aliases, exts());

        let via_alias = resolver
            .resolve("@lib/greeting", &fixtures_dir().join("nested"))
            .unwrap();
        assert_eq!(via_alias, canonical("lib/greeting.mod"));
    }

    #[test]
    fn test_resolver_unknown_alias_is_bare() {
        let resolver = Resolver::new(
            Arc::new(FsResolver::default()),
            new_shared_aliases(),
            exts(),
        );
        assert!(resolver.resolve("@lib/greeting", &fixtures_dir()).is_err());
    }
}
