//! Plugin discovery and loading for Creak
//!
//! This module walks plugin root directories, reads every `*.json` manifest
//! it finds, and asks the [`PluginCatalog`] to build a plugin from it. A file
//! that fails for any reason is recorded under the `disabled` category and
//! the scan carries on; discovery itself never fails.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::DiscoveryError;

use super::catalog::{HostCapabilities, PluginCatalog};
use super::registry::PluginRegistry;
use super::types::{Plugin, PluginManifest, PluginSpec};

/// Category that collects every file that failed to load.
pub const DISABLED_CATEGORY: &str = "disabled";

/// Category for manifests placed directly under a plugin root.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Extension of candidate plugin files.
pub const MANIFEST_EXTENSION: &str = "json";

/// Entries whose name starts with this marker are skipped.
const HIDDEN_MARKER: char = '.';

/// A file that could not be loaded, with the reason.
#[derive(Debug, Clone)]
pub struct DiscoveryFailure {
    pub path: PathBuf,
    pub error: DiscoveryError,
}

/// Outcome of a discovery pass.
#[derive(Default)]
pub struct Discovery {
    pub registry: PluginRegistry,
    pub failures: Vec<DiscoveryFailure>,
}

impl Discovery {
    /// Number of files recorded under `disabled`.
    pub fn disabled_count(&self) -> usize {
        self.registry
            .categories()
            .get(DISABLED_CATEGORY)
            .map_or(0, Vec::len)
    }
}

/// A manifest located under a plugin root, before loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    /// Path relative to the root, `/`-separated, e.g. `network/scan.json`.
    pub relative: String,
    pub display_name: String,
    pub category: String,
}

impl Candidate {
    /// Derive display name and category from the file's position under `root`.
    pub fn from_path(root: &Path, path: &Path) -> Option<Self> {
        let rel = path.strip_prefix(root).ok()?;
        let mut segments: Vec<String> = rel
            .iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        let file = segments.pop()?;
        let stem = Path::new(&file).file_stem()?.to_string_lossy().into_owned();

        let category = segments
            .first()
            .cloned()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        let relative = segments
            .iter()
            .cloned()
            .chain(std::iter::once(file))
            .collect::<Vec<_>>()
            .join("/");
        segments.push(stem);

        Some(Self {
            path: path.to_path_buf(),
            relative,
            display_name: segments.join("/"),
            category,
        })
    }
}

/// Discover plugins across multiple root directories.
///
/// Roots may repeat; a display name loaded twice keeps the last successful
/// instance. Roots that do not exist are skipped.
///
/// # Example
///
/// ```no_run
/// use std::path::PathBuf;
/// use creak::plugins::{discover_plugins, PathCapabilities, PluginCatalog};
///
/// let roots = vec![PathBuf::from("./plugins")];
/// let discovery = discover_plugins(&roots, &PluginCatalog::with_builtins(), &PathCapabilities);
/// println!("Loaded {} plugins", discovery.registry.len());
/// ```
pub fn discover_plugins(
    roots: &[PathBuf],
    catalog: &PluginCatalog,
    capabilities: &dyn HostCapabilities,
) -> Discovery {
    let mut discovery = Discovery::default();

    for root in roots {
        if !root.exists() {
            info!(dir = %root.display(), "Plugin directory does not exist, skipping");
            continue;
        }
        if !root.is_dir() {
            warn!(path = %root.display(), "Plugin path is not a directory, skipping");
            continue;
        }

        for candidate in find_candidates(root) {
            match load_plugin(&candidate, catalog, capabilities) {
                Ok(plugin) => {
                    debug!(plugin = %candidate.display_name, "Loaded plugin");
                    discovery
                        .registry
                        .record_file(&candidate.category, &candidate.relative);
                    discovery.registry.insert(plugin);
                }
                Err(error) => {
                    warn!(
                        path = %candidate.path.display(),
                        error = %error,
                        "Failed to load plugin, disabling"
                    );
                    discovery
                        .registry
                        .record_file(DISABLED_CATEGORY, &candidate.relative);
                    discovery.failures.push(DiscoveryFailure {
                        path: candidate.path.clone(),
                        error,
                    });
                }
            }
        }
    }

    info!(
        loaded = discovery.registry.len(),
        disabled = discovery.disabled_count(),
        "Plugin discovery finished"
    );
    discovery
}

/// Every non-hidden `*.json` file under `root`, in file-name order.
pub fn find_candidates(root: &Path) -> Vec<Candidate> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Failed to read plugin directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == MANIFEST_EXTENSION)
        })
        .filter_map(|entry| Candidate::from_path(root, entry.path()))
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with(HIDDEN_MARKER))
}

/// Load a single candidate into a plugin instance.
///
/// # Errors
/// - `MissingDependency` if a `requires` entry is not available on the host
/// - `LoadFailure` for unreadable files, malformed manifests, unknown kinds,
///   and factory errors or panics
pub fn load_plugin(
    candidate: &Candidate,
    catalog: &PluginCatalog,
    capabilities: &dyn HostCapabilities,
) -> Result<Box<dyn Plugin>, DiscoveryError> {
    let plugin = candidate.display_name.clone();
    let failure = |reason: String| DiscoveryError::LoadFailure {
        plugin: plugin.clone(),
        reason,
    };

    let content = fs::read_to_string(&candidate.path)
        .map_err(|e| failure(format!("Failed to read {}: {}", candidate.path.display(), e)))?;

    let manifest: PluginManifest =
        serde_json::from_str(&content).map_err(|e| failure(format!("Invalid manifest: {}", e)))?;

    if let Some(capability) = capabilities.first_missing(&manifest.requires) {
        return Err(DiscoveryError::MissingDependency {
            plugin: plugin.clone(),
            capability: capability.to_string(),
        });
    }

    let factory = catalog
        .get(&manifest.kind)
        .ok_or_else(|| failure(format!("Unknown plugin kind '{}'", manifest.kind)))?;

    let kind = manifest.kind.clone();
    let spec = PluginSpec {
        display_name: candidate.display_name.clone(),
        path: candidate.path.clone(),
        manifest,
    };

    match panic::catch_unwind(AssertUnwindSafe(|| factory(spec))) {
        Ok(Ok(instance)) if instance.name() != candidate.display_name => Err(failure(format!(
            "Factory for kind '{}' returned plugin named '{}'",
            kind,
            instance.name()
        ))),
        Ok(Ok(instance)) => Ok(instance),
        Ok(Err(e)) => Err(failure(e.to_string())),
        Err(payload) => Err(failure(format!(
            "Plugin constructor panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
