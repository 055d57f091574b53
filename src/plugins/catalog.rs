//! Factory catalog and host capability probes.
//!
//! Plugin files never contain code. Each manifest names a `kind`, and the
//! catalog maps that kind to a factory registered at startup. Discovery
//! enumerates manifests and asks the catalog to build them, so every
//! loadable module is a compiled type implementing [`Plugin`].

use std::collections::{BTreeSet, HashMap};

use crate::error::Result;

use super::builtin;
use super::types::{Plugin, PluginSpec};

/// Constructor for one plugin kind.
pub type PluginFactory = fn(PluginSpec) -> Result<Box<dyn Plugin>>;

/// Registered plugin kinds.
pub struct PluginCatalog {
    factories: HashMap<String, PluginFactory>,
}

impl PluginCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Catalog with every builtin kind registered.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        builtin::register_builtins(&mut catalog);
        catalog
    }

    /// Register a factory, replacing any previous factory for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn get(&self, kind: &str) -> Option<PluginFactory> {
        self.factories.get(kind).copied()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Answers whether a prerequisite declared in a manifest is available.
pub trait HostCapabilities {
    fn has(&self, capability: &str) -> bool;

    /// First capability from `required` the host lacks.
    fn first_missing<'a>(&self, required: &'a [String]) -> Option<&'a str> {
        required
            .iter()
            .map(String::as_str)
            .find(|capability| !self.has(capability))
    }
}

/// Treats a capability as an executable that must resolve on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathCapabilities;

impl HostCapabilities for PathCapabilities {
    fn has(&self, capability: &str) -> bool {
        which::which(capability).is_ok()
    }
}

/// A fixed capability set.
#[derive(Debug, Clone, Default)]
pub struct FixedCapabilities(BTreeSet<String>);

impl FixedCapabilities {
    pub fn new<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(capabilities.into_iter().map(Into::into).collect())
    }
}

impl HostCapabilities for FixedCapabilities {
    fn has(&self, capability: &str) -> bool {
        self.0.contains(capability)
    }
}
