//! Plugin system for Creak
//!
//! Plugins are described by JSON manifests laid out in a directory tree. The
//! first directory under a plugin root is the plugin's category, and the path
//! down to the file (minus its extension) is the plugin's display name.
//! Manifests never carry code: each names a `kind` that must be registered in
//! the [`PluginCatalog`], and the catalog's factory builds the instance.
//!
//! # Architecture
//!
//! - **types**: Core data structures (`PluginManifest`, `PluginSpec`, the `Plugin` trait)
//! - **catalog**: Factory registration and host capability probes
//! - **builtin**: The `command` and `echo` plugin kinds
//! - **loader**: Directory traversal and per-file loading with failure isolation
//! - **registry**: Display-name lookup, fragment resolution and category statistics
//!
//! # Plugin Directory Structure
//!
//! ```text
//! ~/.creak/plugins/
//! ├── network/
//! │   ├── ping.json        -> network/ping
//! │   └── wifi/
//! │       └── survey.json  -> network/wifi/survey
//! ├── web/
//! │   └── headers.json     -> web/headers
//! └── .drafts/             (hidden, skipped)
//! ```
//!
//! # Example manifest
//!
//! ```json
//! {
//!   "kind": "command",
//!   "description": "Fetch response headers",
//!   "requires": ["curl"],
//!   "params": { "url": true },
//!   "settings": { "command": "curl -sI {{url}}", "timeout_secs": 15 }
//! }
//! ```

pub mod builtin;
pub mod catalog;
mod loader;
pub mod registry;
pub mod types;

pub use catalog::{
    FixedCapabilities, HostCapabilities, PathCapabilities, PluginCatalog, PluginFactory,
};
pub use loader::{
    discover_plugins, find_candidates, load_plugin, panic_message, Candidate, Discovery,
    DiscoveryFailure, DISABLED_CATEGORY, UNCATEGORIZED,
};
pub use registry::PluginRegistry;
pub use types::{
    short_name, ParamSchema, Params, Plugin, PluginInfo, PluginManifest, PluginSpec, RunContext,
};
