//! Where imported modules come from.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ResolveError;

/// Source file extension for Tern modules.
pub const EXTENSION: &str = "tn";

/// Lookup capability for named modules.
pub trait ModuleSource {
    /// The source text of module `name`, or `None` when no such module exists.
    fn load(&self, name: &str) -> Result<Option<String>, ResolveError>;
}

/// Finds modules on disk along a list of search directories.
///
/// `Geometry` is looked up as `Geometry.tn` then `geometry.tn`; a dotted name
/// such as `shapes.Circle` maps to `shapes/Circle.tn`.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    search_paths: Vec<PathBuf>,
}

impl FileSource {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// The first existing file for `name`, in search order.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .flat_map(|dir| candidates(dir, name))
            .find(|path| path.is_file())
    }
}

fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut segments: Vec<&str> = name.split('.').collect();
    let Some(last) = segments.pop() else {
        return Vec::new();
    };
    let base = segments.iter().fold(dir.to_path_buf(), |acc, s| acc.join(s));

    let mut files = vec![base.join(format!("{}.{}", last, EXTENSION))];
    let lower = last.to_lowercase();
    if lower != last {
        files.push(base.join(format!("{}.{}", lower, EXTENSION)));
    }
    files
}

impl ModuleSource for FileSource {
    fn load(&self, name: &str) -> Result<Option<String>, ResolveError> {
        let Some(path) = self.find(name) else {
            return Ok(None);
        };
        tracing::debug!(module = name, path = %path.display(), "loading module");
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| ResolveError::Io {
                module: name.to_string(),
                source,
            })
    }
}

/// Modules held in memory, keyed by name. Used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    modules: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.modules.insert(name.into(), source.into());
    }
}

impl ModuleSource for MemorySource {
    fn load(&self, name: &str) -> Result<Option<String>, ResolveError> {
        if let Some(source) = self.modules.get(name) {
            return Ok(Some(source.clone()));
        }
        // Module names are case-insensitive, like the visited set
        Ok(self
            .modules
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, source)| source.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn file_source_searches_paths_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("geometry.tn"), "var PI = 3.14").unwrap();

        let source = FileSource::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(
            source.load("Geometry").unwrap().as_deref(),
            Some("var PI = 3.14")
        );

        fs::write(first.path().join("Geometry.tn"), "var PI = 3").unwrap();
        assert_eq!(source.load("Geometry").unwrap().as_deref(), Some("var PI = 3"));
    }

    #[test]
    fn dotted_names_map_to_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("shapes")).unwrap();
        fs::write(dir.path().join("shapes").join("Circle.tn"), "var r = 1").unwrap();

        let source = FileSource::new(vec![dir.path().to_path_buf()]);
        assert!(source.load("shapes.Circle").unwrap().is_some());
        assert!(source.load("shapes.Square").unwrap().is_none());
    }

    #[test]
    fn memory_source_is_case_insensitive() {
        let source = MemorySource::new().with("Core", "function id(x)\n return x\nend function");
        assert!(source.load("core").unwrap().is_some());
        assert!(source.load("missing").unwrap().is_none());
    }
}
