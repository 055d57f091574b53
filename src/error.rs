//! Error types for Creak
//!
//! This module defines all error types used throughout the console. Uses
//! `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! The taxonomy mirrors where a failure is contained:
//!
//! - [`DiscoveryError`] never escapes plugin discovery; the offending file is
//!   recorded under the `disabled` category.
//! - Everything else never escapes the dispatcher; it is rendered as a single
//!   diagnostic line and the session state is left untouched.

use thiserror::Error;

/// A plugin file that could not be turned into a registered plugin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The manifest declares a prerequisite the host does not provide.
    #[error("Plugin '{plugin}' disabled. Dependency required: '{capability}'")]
    MissingDependency { plugin: String, capability: String },

    /// Unreadable file, malformed manifest, unknown kind or factory failure.
    #[error("Plugin '{plugin}' disabled. {reason}")]
    LoadFailure { plugin: String, reason: String },
}

impl DiscoveryError {
    /// Display name of the plugin that failed to load.
    pub fn plugin(&self) -> &str {
        match self {
            DiscoveryError::MissingDependency { plugin, .. } => plugin,
            DiscoveryError::LoadFailure { plugin, .. } => plugin,
        }
    }
}

/// Failure to map a `load` fragment to exactly one plugin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Invalid module name '{0}'")]
    NotFound(String),

    #[error("Multiple plugins ({count}) match '{fragment}'")]
    Ambiguous {
        fragment: String,
        count: usize,
        candidates: Vec<String>,
    },
}

/// Parameter validation failure before a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Value required for mandatory '{}' parameter", .0.to_uppercase())]
    MissingMandatoryParameter(String),
}

/// The primary error type for Creak operations.
#[derive(Error, Debug)]
pub enum CreakError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// `set`/`unset` on a name outside the current plugin's schema.
    #[error("Invalid parameter '{0}'")]
    InvalidParameter(String),

    /// A command that needs a loaded plugin was issued while idle.
    #[error("No plugin loaded. Use 'load <name>' first")]
    NoPluginLoaded,

    /// Malformed command line.
    #[error("Usage: {0}")]
    Usage(String),

    /// Recognized syntax with no defined behavior.
    #[error("{0} is not supported")]
    Unsupported(String),

    /// Plugin flagged `root` while the process is not elevated.
    #[error("Root permissions required to run '{0}'")]
    Privilege(String),

    /// Any failure raised from inside a plugin body.
    #[error("Plugin '{plugin}' failed: {message}")]
    Execution { plugin: String, message: String },

    /// The user cancelled the running plugin.
    #[error("Run interrupted")]
    Interrupted,

    /// Configuration-related errors (invalid config file, bad overrides, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CreakError {
    /// Wrap an arbitrary plugin-side failure as an execution error.
    pub fn execution(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        CreakError::Execution {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a benign cancellation rather than a failure.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, CreakError::Interrupted)
    }
}

/// A specialized `Result` type for Creak operations.
pub type Result<T> = std::result::Result<T, CreakError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_display() {
        let err = DiscoveryError::MissingDependency {
            plugin: "network/scan".into(),
            capability: "nmap".into(),
        };
        assert_eq!(
            err.to_string(),
            "Plugin 'network/scan' disabled. Dependency required: 'nmap'"
        );
        assert_eq!(err.plugin(), "network/scan");
    }

    #[test]
    fn test_missing_mandatory_parameter_is_uppercased() {
        let err = ValidationError::MissingMandatoryParameter("target".into());
        assert_eq!(
            err.to_string(),
            "Value required for mandatory 'TARGET' parameter"
        );
    }

    #[test]
    fn test_ambiguous_reports_count() {
        let err: CreakError = ResolutionError::Ambiguous {
            fragment: "scan".into(),
            count: 3,
            candidates: vec![],
        }
        .into();
        assert!(err.to_string().contains("(3)"));
        assert!(matches!(err, CreakError::Resolution(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CreakError = io_err.into();
        assert!(matches!(err, CreakError::Io(_)));
    }

    #[test]
    fn test_is_interrupt() {
        assert!(CreakError::Interrupted.is_interrupt());
        assert!(!CreakError::NoPluginLoaded.is_interrupt());
        assert!(!CreakError::execution("x", "boom").is_interrupt());
    }
}
