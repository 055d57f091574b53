//! Configuration for Creak
//!
//! Settings are read from `~/.creak/config.json` when it exists, then
//! environment overrides are applied:
//!
//! - `CREAK_PLUGIN_DIRS`: plugin roots, separated like `PATH`
//! - `CREAK_PROBE_NETWORK`: `true`/`false`, whether to probe base parameters
//! - `CREAK_PROMPT_NAME`: first field of the prompt
//!
//! ```json
//! {
//!   "plugin_dirs": ["./plugins", "/opt/creak/plugins"],
//!   "probe_network": true,
//!   "prompt_name": "creak",
//!   "framework": { "author": "codep", "version": "1.0" }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CreakError, Result};

/// Metadata shown by `showinfo` when no plugin is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub author: String,
    pub version: String,
}

impl Default for FrameworkInfo {
    fn default() -> Self {
        Self {
            author: "codep".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plugin roots to scan, in order. Duplicates are harmless.
    pub plugin_dirs: Vec<PathBuf>,

    /// Probe the network at startup to seed base parameters.
    pub probe_network: bool,

    /// First field of the prompt, `[<prompt_name>::<context>] > `.
    pub prompt_name: String,

    pub framework: FrameworkInfo,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_dirs: default_plugin_dirs(),
            probe_network: true,
            prompt_name: "creak".into(),
            framework: FrameworkInfo::default(),
        }
    }
}

impl Config {
    /// `~/.creak`
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".creak")
    }

    /// `~/.creak/config.json`
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default path plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from `path` (defaults if it does not exist) plus environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CreakError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                CreakError::Config(format!("Invalid config {}: {}", path.display(), e))
            })?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Config::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CREAK_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dirs) = lookup("CREAK_PLUGIN_DIRS") {
            self.plugin_dirs = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(probe) = lookup("CREAK_PROBE_NETWORK") {
            self.probe_network = parse_bool(&probe).ok_or_else(|| {
                CreakError::Config(format!("CREAK_PROBE_NETWORK must be true or false, got '{}'", probe))
            })?;
        }
        if let Some(name) = lookup("CREAK_PROMPT_NAME") {
            if !name.trim().is_empty() {
                self.prompt_name = name.trim().to_string();
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `./plugins` next to the working directory, then `~/.creak/plugins`.
fn default_plugin_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("plugins"), Config::dir().join("plugins")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.probe_network);
        assert_eq!(config.prompt_name, "creak");
        assert_eq!(config.plugin_dirs.len(), 2);
        assert_eq!(config.plugin_dirs[0], PathBuf::from("plugins"));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        assert!(Config::load_from(&tmp.path().join("nope.json")).is_ok());
    }

    #[test]
    fn test_load_from_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{ "probe_network": false, "plugin_dirs": ["/opt/p"] }"#).unwrap();
        let config: Config = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(!config.probe_network);
        assert_eq!(config.plugin_dirs, vec![PathBuf::from("/opt/p")]);
        assert_eq!(config.prompt_name, "creak");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        let dirs = std::env::join_paths(["/a", "/b"]).unwrap();
        config
            .apply_env_overrides(lookup(&[
                ("CREAK_PLUGIN_DIRS", dirs.to_str().unwrap()),
                ("CREAK_PROBE_NETWORK", "off"),
                ("CREAK_PROMPT_NAME", " lab "),
            ]))
            .unwrap();
        assert_eq!(config.plugin_dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(!config.probe_network);
        assert_eq!(config.prompt_name, "lab");
    }

    #[test]
    fn test_env_override_bad_bool() {
        let mut config = Config::default();
        let err = config
            .apply_env_overrides(lookup(&[("CREAK_PROBE_NETWORK", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("CREAK_PROBE_NETWORK"));
    }
}
