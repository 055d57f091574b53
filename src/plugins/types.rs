//! Plugin types for Creak
//!
//! This module defines the manifest structure parsed from plugin files, the
//! [`Plugin`] trait every loadable module implements, and the context handed
//! to a plugin when it runs.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Parameter schema: lower-cased name to "mandatory" flag.
pub type ParamSchema = BTreeMap<String, bool>;

/// Parameter values: lower-cased name to free-form string.
pub type Params = BTreeMap<String, String>;

/// The manifest loaded from a plugin file.
///
/// # Example
///
/// ```json
/// {
///   "kind": "command",
///   "description": "Ping a host once",
///   "author": "codep",
///   "version": "1.0",
///   "root": false,
///   "requires": ["ping"],
///   "params": { "target": true, "count": false },
///   "settings": { "command": "ping -c 1 {{target}}", "timeout_secs": 10 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Identifier of the registered factory that builds this plugin.
    pub kind: String,

    /// Human-readable description shown by `showinfo`.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    /// Whether running the plugin requires elevated privileges.
    #[serde(default)]
    pub root: bool,

    /// Host capabilities that must be present for the plugin to load.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Declared parameters and whether each one is mandatory.
    #[serde(default)]
    pub params: ParamSchema,

    /// Kind-specific configuration, interpreted by the factory.
    #[serde(default)]
    pub settings: Value,
}

impl PluginManifest {
    /// Return the schema with every parameter name lower-cased.
    pub fn normalized_params(&self) -> ParamSchema {
        self.params
            .iter()
            .map(|(name, mandatory)| (name.to_lowercase(), *mandatory))
            .collect()
    }
}

/// Everything a factory needs to construct a plugin instance.
#[derive(Debug, Clone)]
pub struct PluginSpec {
    /// Slash-joined category path plus base name, e.g. `network/scan`.
    pub display_name: String,

    /// File the manifest was read from.
    pub path: PathBuf,

    pub manifest: PluginManifest,
}

impl PluginSpec {
    /// Last segment of the display name, used for the prompt.
    pub fn short_name(&self) -> &str {
        short_name(&self.display_name)
    }
}

/// Last segment of a slash-joined display name.
pub fn short_name(display_name: &str) -> &str {
    display_name.rsplit('/').next().unwrap_or(display_name)
}

/// Metadata printed by `showinfo` for a loaded plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub author: Option<String>,
    pub version: Option<String>,
    pub root: bool,
    pub params: ParamSchema,
}

impl PluginInfo {
    /// Build the info block straight from a spec.
    pub fn from_spec(spec: &PluginSpec) -> Self {
        Self {
            name: spec.display_name.clone(),
            description: spec.manifest.description.clone(),
            author: spec.manifest.author.clone(),
            version: spec.manifest.version.clone(),
            root: spec.manifest.root,
            params: spec.manifest.normalized_params(),
        }
    }

    /// Render the info block.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Name: {}", self.name)?;
        if !self.description.is_empty() {
            writeln!(out, "Description: {}", self.description)?;
        }
        if let Some(author) = &self.author {
            writeln!(out, "Author: {}", author)?;
        }
        if let Some(version) = &self.version {
            writeln!(out, "Version: {}", version)?;
        }
        writeln!(out, "Root required: {}", if self.root { "yes" } else { "no" })?;
        if !self.params.is_empty() {
            writeln!(out, "Parameters:")?;
            for (name, mandatory) in &self.params {
                writeln!(
                    out,
                    "  {:<16}{}",
                    name.to_uppercase(),
                    if *mandatory { "required" } else { "optional" }
                )?;
            }
        }
        Ok(())
    }
}

/// Context handed to [`Plugin::run`].
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Snapshot of the validated session parameters.
    pub params: Params,

    /// Cancelled when the user interrupts the run. Plugins doing long work
    /// should observe it; the dispatcher also drops the run future.
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(params: Params, cancel: CancellationToken) -> Self {
        Self { params, cancel }
    }

    /// Parameter value, treating an empty string as absent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Capability set implemented by every loadable module.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique display name the plugin was registered under.
    fn name(&self) -> &str;

    /// Declared parameters (name → mandatory).
    fn required_params(&self) -> &ParamSchema;

    /// Whether the plugin needs elevated privileges to run.
    fn requires_root(&self) -> bool {
        false
    }

    /// Called every time the plugin becomes the current one.
    fn init(&mut self) {}

    /// Execute the plugin body.
    async fn run(&self, ctx: RunContext) -> Result<()>;

    /// Metadata for `showinfo`.
    fn info(&self) -> PluginInfo;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manifest_defaults() {
        let manifest: PluginManifest = serde_json::from_value(json!({ "kind": "echo" })).unwrap();
        assert_eq!(manifest.kind, "echo");
        assert!(!manifest.root);
        assert!(manifest.requires.is_empty());
        assert!(manifest.params.is_empty());
        assert!(manifest.settings.is_null());
    }

    #[test]
    fn test_manifest_missing_kind_is_error() {
        let result: std::result::Result<PluginManifest, _> =
            serde_json::from_value(json!({ "description": "no kind" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_normalized_params_lowercases() {
        let manifest: PluginManifest = serde_json::from_value(json!({
            "kind": "echo",
            "params": { "Target": true, "TIMEOUT": false }
        }))
        .unwrap();
        let schema = manifest.normalized_params();
        assert_eq!(schema.get("target"), Some(&true));
        assert_eq!(schema.get("timeout"), Some(&false));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("network/scan"), "scan");
        assert_eq!(short_name("a/b/c"), "c");
        assert_eq!(short_name("solo"), "solo");
    }

    #[test]
    fn test_run_context_param_treats_empty_as_absent() {
        let mut params = Params::new();
        params.insert("target".into(), "10.0.0.1".into());
        params.insert("port".into(), String::new());
        let ctx = RunContext::new(params, CancellationToken::new());
        assert_eq!(ctx.param("target"), Some("10.0.0.1"));
        assert_eq!(ctx.param("port"), None);
        assert_eq!(ctx.param("missing"), None);
    }

    #[test]
    fn test_info_write_to() {
        let info = PluginInfo {
            name: "network/scan".into(),
            description: "Scan a host".into(),
            author: Some("codep".into()),
            version: None,
            root: true,
            params: [("target".to_string(), true)].into_iter().collect(),
        };
        let mut out = Vec::new();
        info.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Name: network/scan"));
        assert!(text.contains("Author: codep"));
        assert!(text.contains("Root required: yes"));
        assert!(text.contains("TARGET"));
        assert!(!text.contains("Version"));
    }
}
