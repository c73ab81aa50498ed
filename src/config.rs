//! Host configuration (`depswap.toml`).
//!
//! ```toml
//! [resolve]
//! extensions = [".mod", ".json"]
//! module_dirs = ["modules"]
//!
//! [aliases]
//! "@lib" = "src/lib"
//! ```
//!
//! Relative alias targets are taken relative to the directory holding the
//! config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Name of the config file looked up by [`HostConfig::load`] and
/// [`HostConfig::discover`].
pub const CONFIG_FILE: &str = "depswap.toml";

/// Configuration for a [`ModuleHost`](crate::modules::ModuleHost).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostConfig {
    /// Resolution settings (the `[resolve]` section).
    #[serde(default)]
    pub resolve: ResolveConfig,

    /// Token → target directory (the `[aliases]` section).
    #[serde(default)]
    pub aliases: BTreeMap<String, PathBuf>,

    /// Directory the config was read from.
    #[serde(skip)]
    root: Option<PathBuf>,
}

/// The `[resolve]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveConfig {
    /// Extensions tried when a request has none, with the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names searched for bare requests.
    #[serde(default = "default_module_dirs")]
    pub module_dirs: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            module_dirs: default_module_dirs(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec![".mod".to_string()]
}

fn default_module_dirs() -> Vec<String> {
    vec!["modules".to_string()]
}

impl HostConfig {
    /// Parse a config from TOML content.
    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.normalize_extensions();
        Ok(config)
    }

    /// Load `depswap.toml` from `dir`. `Ok(None)` if there is no such file.
    pub fn load(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;
        let mut config = Self::parse_toml(&content).map_err(|e| ConfigError::Parse(path.clone(), e))?;
        config.root = Some(dir.to_path_buf());
        debug!(target: "depswap::config::load", path = %path.display(), aliases = config.aliases.len());
        Ok(Some(config))
    }

    /// Walk up from `start` and load the first `depswap.toml` found.
    pub fn discover(start: &Path) -> Result<Option<Self>, ConfigError> {
        for dir in start.ancestors() {
            if let Some(config) = Self::load(dir)? {
                return Ok(Some(config));
            }
        }
        Ok(None)
    }

    /// Directory the config was loaded from, if it came from a file.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Alias entries with relative targets joined onto the config root.
    pub fn alias_entries(&self) -> impl Iterator<Item = (&str, PathBuf)> + '_ {
        self.aliases.iter().map(move |(token, target)| {
            let target = match (&self.root, target.is_relative()) {
                (Some(root), true) => root.join(target),
                _ => target.clone(),
            };
            (token.as_str(), target)
        })
    }

    /// Add an alias to the config (builder style).
    pub fn with_alias(mut self, token: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        self.aliases.insert(token.into(), target.into());
        self
    }

    /// Replace the recognized extensions (builder style).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolve.extensions = extensions.into_iter().map(Into::into).collect();
        self.normalize_extensions();
        self
    }

    /// `mod` and `.mod` both mean `.mod`.
    fn normalize_extensions(&mut self) {
        for ext in &mut self.resolve.extensions {
            if !ext.starts_with('.') {
                ext.insert(0, '.');
            }
        }
    }
}
