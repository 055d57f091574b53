//! Plugin registry for Creak
//!
//! This module provides the `PluginRegistry` struct that owns every loaded
//! plugin for the lifetime of the process, keyed by display name, together
//! with the per-category file lists gathered during discovery.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ResolutionError;

use super::types::Plugin;

/// A registry that owns loaded plugins and the discovery statistics.
///
/// # Example
///
/// ```rust
/// use creak::plugins::{discover_plugins, FixedCapabilities, PluginCatalog};
///
/// let discovery = discover_plugins(&[], &PluginCatalog::with_builtins(), &FixedCapabilities::default());
/// let registry = discovery.registry;
/// assert!(registry.is_empty());
/// assert!(registry.resolve("scan").is_err());
/// ```
#[derive(Default)]
pub struct PluginRegistry {
    /// Map from display name to plugin instance.
    plugins: BTreeMap<String, Box<dyn Plugin>>,

    /// Map from category to the files recorded under it, in insertion order.
    categories: BTreeMap<String, Vec<String>>,
}

impl PluginRegistry {
    /// Create a new empty plugin registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a plugin under its display name, replacing an earlier one.
    pub fn insert(&mut self, plugin: Box<dyn Plugin>) {
        let name = plugin.name().to_string();
        if self.plugins.insert(name.clone(), plugin).is_some() {
            debug!(plugin = %name, "Replaced previously loaded plugin");
        }
    }

    /// Record `file` under `category` unless it is already listed there.
    pub fn record_file(&mut self, category: &str, file: &str) {
        let files = self.categories.entry(category.to_string()).or_default();
        if !files.iter().any(|f| f == file) {
            files.push(file.to_string());
        }
    }

    /// Find the single plugin `fragment` refers to.
    ///
    /// An exact display name wins outright. Otherwise the fragment must be a
    /// substring of exactly one display name.
    pub fn resolve(&self, fragment: &str) -> Result<&str, ResolutionError> {
        if let Some((name, _)) = self.plugins.get_key_value(fragment) {
            return Ok(name.as_str());
        }

        let matches: Vec<&str> = self
            .plugins
            .keys()
            .map(String::as_str)
            .filter(|name| name.contains(fragment))
            .collect();

        match matches.as_slice() {
            [] => Err(ResolutionError::NotFound(fragment.to_string())),
            [single] => Ok(*single),
            many => Err(ResolutionError::Ambiguous {
                fragment: fragment.to_string(),
                count: many.len(),
                candidates: many.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(name).map(|p| p.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Plugin + 'static)> {
        self.plugins.get_mut(name).map(|p| p.as_mut())
    }

    /// Display names in sorted order.
    pub fn list(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Category name to recorded files.
    pub fn categories(&self) -> &BTreeMap<String, Vec<String>> {
        &self.categories
    }

    /// Number of files recorded under `category`.
    pub fn plugin_count_in(&self, category: &str) -> usize {
        self.categories.get(category).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::plugins::types::{ParamSchema, PluginInfo, RunContext};
    use async_trait::async_trait;

    struct Stub {
        name: String,
        schema: ParamSchema,
    }

    #[async_trait]
    impl Plugin for Stub {
        fn name(&self) -> &str {
            &self.name
        }
        fn required_params(&self) -> &ParamSchema {
            &self.schema
        }
        async fn run(&self, _ctx: RunContext) -> Result<()> {
            Ok(())
        }
        fn info(&self) -> PluginInfo {
            PluginInfo {
                name: self.name.clone(),
                ..Default::default()
            }
        }
    }

    fn stub(name: &str) -> Box<dyn Plugin> {
        Box::new(Stub {
            name: name.to_string(),
            schema: ParamSchema::new(),
        })
    }

    fn registry(names: &[&str]) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        for name in names {
            registry.insert(stub(name));
        }
        registry
    }

    #[test]
    fn test_registry_new_is_empty() {
        let registry = PluginRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.list().is_empty());
        assert!(registry.categories().is_empty());
    }

    #[test]
    fn test_resolve_exact_match_wins() {
        let registry = registry(&["network/scan", "network/scan_full"]);
        assert_eq!(registry.resolve("network/scan").unwrap(), "network/scan");
    }

    #[test]
    fn test_resolve_unique_substring() {
        let registry = registry(&["network/scan", "web/crawl"]);
        assert_eq!(registry.resolve("scan").unwrap(), "network/scan");
        assert_eq!(registry.resolve("craw").unwrap(), "web/crawl");
    }

    #[test]
    fn test_resolve_not_found() {
        let registry = registry(&["network/scan"]);
        assert_eq!(
            registry.resolve("ftp"),
            Err(ResolutionError::NotFound("ftp".into()))
        );
    }

    #[test]
    fn test_resolve_ambiguous_reports_count() {
        let registry = registry(&["network/scan", "network/portscan", "web/crawl"]);
        match registry.resolve("scan") {
            Err(ResolutionError::Ambiguous {
                count, candidates, ..
            }) => {
                assert_eq!(count, 2);
                assert_eq!(candidates, vec!["network/portscan", "network/scan"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_same_name_replaces() {
        let mut registry = registry(&["net/a"]);
        registry.insert(stub("net/a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_record_file_dedups_and_keeps_order() {
        let mut registry = PluginRegistry::new();
        registry.record_file("net", "net/b.json");
        registry.record_file("net", "net/a.json");
        registry.record_file("net", "net/b.json");
        registry.record_file("disabled", "web/x.json");

        assert_eq!(
            registry.categories().get("net").unwrap(),
            &vec!["net/b.json".to_string(), "net/a.json".to_string()]
        );
        assert_eq!(registry.plugin_count_in("net"), 2);
        assert_eq!(registry.plugin_count_in("disabled"), 1);
        assert_eq!(registry.plugin_count_in("missing"), 0);
    }

    #[test]
    fn test_list_is_sorted() {
        let registry = registry(&["web/crawl", "net/scan", "ap/fake"]);
        assert_eq!(registry.list(), vec!["ap/fake", "net/scan", "web/crawl"]);
    }

    #[test]
    fn test_get_and_get_mut() {
        let mut registry = registry(&["net/scan"]);
        assert_eq!(registry.get("net/scan").unwrap().name(), "net/scan");
        assert!(registry.get_mut("net/scan").is_some());
        assert!(registry.get("nope").is_none());
    }
}
