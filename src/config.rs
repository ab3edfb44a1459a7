//! Configuration: defaults, the `tern.toml` manifest, environment, CLI flags.
//!
//! Later layers win. The manifest is found by walking up from the script's
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const MANIFEST_FILE: &str = "tern.toml";

/// Default `tracing` filter when `TERN_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// The `tern.toml` manifest.
///
/// ```toml
/// [package]
/// name = "app"
/// version = "0.1.0"
/// main = "main.tn"
/// [modules]
/// paths = ["lib", "vendor"]
/// [check]
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub package: PackageSection,
    pub modules: ModulesSection,
    pub check: CheckSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
    /// Entry point, relative to the manifest
    pub main: Option<String>,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: "0.1.0".to_string(),
            main: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModulesSection {
    /// Module directories, relative to the manifest
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckSection {
    pub enabled: bool,
}

impl Default for CheckSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Manifest {
    /// Find the manifest in the given directory or its parents.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();
        loop {
            let manifest = current.join(MANIFEST_FILE);
            if manifest.is_file() {
                return Some(manifest);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Manifest {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Effective settings for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of the script being run; first on the module search path
    pub script_dir: Option<PathBuf>,
    /// The manifest, with the path it was read from
    pub manifest: Option<(PathBuf, Manifest)>,
    /// `TERN_PATH` entries
    pub env_paths: Vec<PathBuf>,
    /// `--path` flags
    pub cli_paths: Vec<PathBuf>,
    /// Run the semantic analyzer before compiling
    pub check: bool,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            script_dir: None,
            manifest: None,
            env_paths: Vec::new(),
            cli_paths: Vec::new(),
            check: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Configuration for running `script` (or for the REPL when `None`),
    /// reading the process environment.
    pub fn load(script: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(script, |key| std::env::var(key).ok())
    }

    /// Like `load`, with an explicit environment lookup.
    pub fn load_with(
        script: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let start = match script.and_then(Path::parent) {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            Some(_) => PathBuf::from("."),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        if script.is_some() {
            config.script_dir = Some(start.clone());
        }

        if let Some(path) = Manifest::find(&start) {
            let manifest = Manifest::load(&path)?;
            tracing::debug!(manifest = %path.display(), "manifest loaded");
            config.check = manifest.check.enabled;
            config.manifest = Some((path, manifest));
        }

        if let Some(paths) = env("TERN_PATH") {
            config.env_paths = paths
                .split(':')
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        if let Some(filter) = env("TERN_LOG") {
            config.log_filter = filter;
        }
        if env("TERN_NO_CHECK").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
            config.check = false;
        }

        Ok(config)
    }

    /// Apply `--no-check`.
    pub fn disable_check(&mut self) {
        self.check = false;
    }

    /// Apply `--path DIR`.
    pub fn add_path(&mut self, dir: impl Into<PathBuf>) {
        self.cli_paths.push(dir.into());
    }

    /// Directories searched for imported modules, in order: the script's
    /// directory, `--path` flags, manifest paths, `TERN_PATH`, `~/.tern/lib`.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        paths.extend(self.script_dir.iter().cloned());
        paths.extend(self.cli_paths.iter().cloned());
        if let Some((manifest_path, manifest)) = &self.manifest {
            let base = manifest_path.parent().unwrap_or(Path::new("."));
            paths.extend(manifest.modules.paths.iter().map(|p| base.join(p)));
        }
        paths.extend(self.env_paths.iter().cloned());
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".tern").join("lib"));
        }
        paths
    }

    /// The manifest's entry point, if it names one.
    pub fn main_script(&self) -> Option<PathBuf> {
        let (path, manifest) = self.manifest.as_ref()?;
        let main = manifest.package.main.as_ref()?;
        Some(path.parent().unwrap_or(Path::new(".")).join(main))
    }
}
