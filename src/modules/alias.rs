//! Alias Table
//!
//! Maps short tokens (`@lib`, `~`) to directories. A request is aliased when
//! it is the token itself or starts with `token/`; rewriting replaces the
//! token with the target and re-expresses the result relative to the
//! requesting directory, so the resolver sees an ordinary relative path.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::trace;

/// Token → target directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, PathBuf>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite an alias.
    pub fn add(&mut self, token: impl Into<String>, rule: impl Into<PathBuf>) {
        let token = token.into();
        let rule = rule.into();
        trace!(target: "depswap::alias::add", %token, rule = %rule.display());
        self.entries.insert(token, rule);
    }

    /// Remove an alias, returning its rule if it existed.
    pub fn remove(&mut self, token: &str) -> Option<PathBuf> {
        trace!(target: "depswap::alias::remove", %token);
        self.entries.remove(token)
    }

    /// The current mapping.
    pub fn get(&self) -> &BTreeMap<String, PathBuf> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_aliased(&self, request: &str) -> bool {
        self.matching(request).is_some()
    }

    /// Rewrite an aliased request into a path relative to `base_dir`.
    ///
    /// Requests that are not aliased come back unchanged.
    pub fn relative(&self, base_dir: &Path, request: &str) -> String {
        let Some((token, target)) = self.matching(request) else {
            return request.to_string();
        };

        let rest = request[token.len()..].trim_start_matches('/');
        let target = absolute(target);
        let destination = if rest.is_empty() {
            target
        } else {
            target.join(rest)
        };

        let rewritten = relative_request(&absolute(base_dir), &destination);
        trace!(target: "depswap::alias::relative", %request, %rewritten);
        rewritten
    }

    /// Longest token that matches `request`.
    fn matching(&self, request: &str) -> Option<(&str, &Path)> {
        self.entries
            .iter()
            .filter(|(token, _)| token_matches(token, request))
            .max_by_key(|(token, _)| token.len())
            .map(|(token, rule)| (token.as_str(), rule.as_path()))
    }
}

fn token_matches(token: &str, request: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    request == token
        || request
            .strip_prefix(token)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Lexical only: the rewritten request is joined back onto the same
/// `base_dir`, so both sides must be in the same (uncanonicalized) form.
fn absolute(path: &Path) -> PathBuf {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// `to` expressed as a `./` or `../` request from directory `from`.
fn relative_request(from: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    // No shared root: `to` can only be named absolutely.
    let rooted = matches!(to.first(), Some(Component::RootDir | Component::Prefix(_)));
    if common == 0 && rooted {
        return to.iter().collect::<PathBuf>().to_string_lossy().into_owned();
    }

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &to[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    if parts.is_empty() {
        return ".".to_string();
    }
    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}

/// Thread-safe wrapper for AliasTable.
pub type SharedAliasTable = Arc<RwLock<AliasTable>>;

pub fn new_shared_aliases() -> SharedAliasTable {
    Arc::new(RwLock::new(AliasTable::new()))
}

/// The process-wide alias table, created on first use.
pub fn global_aliases() -> SharedAliasTable {
    static GLOBAL: OnceLock<SharedAliasTable> = OnceLock::new();
    Arc::clone(GLOBAL.get_or_init(new_shared_aliases))
}
