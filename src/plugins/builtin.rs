//! Builtin plugin kinds.
//!
//! - `command`: wraps an external program. The manifest's `settings.command`
//!   is a template using `{{param}}` placeholders that are filled from the
//!   session parameters when the plugin runs.
//! - `echo`: prints the parameters it was run with.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CreakError, Result};

use super::catalog::PluginCatalog;
use super::types::{ParamSchema, Params, Plugin, PluginInfo, PluginSpec, RunContext};

/// Default command timeout when the manifest does not set one.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").unwrap());

/// Register every builtin kind in `catalog`.
pub fn register_builtins(catalog: &mut PluginCatalog) {
    catalog.register("command", CommandPlugin::build);
    catalog.register("echo", EchoPlugin::build);
}

#[derive(Debug, Deserialize)]
struct CommandSettings {
    command: String,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// Runs an external program built from a command template.
pub struct CommandPlugin {
    spec: PluginSpec,
    schema: ParamSchema,
    /// Template split into argv words; placeholders are filled per run.
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandPlugin {
    /// Factory registered under the `command` kind.
    pub fn build(spec: PluginSpec) -> Result<Box<dyn Plugin>> {
        let settings: CommandSettings = serde_json::from_value(spec.manifest.settings.clone())
            .map_err(|e| CreakError::Config(format!("invalid command settings: {}", e)))?;

        if settings.command.trim().is_empty() {
            return Err(CreakError::Config("command template is empty".into()));
        }
        validate_command_safety(&settings.command)?;

        let argv = shlex::split(&settings.command).ok_or_else(|| {
            CreakError::Config(format!(
                "command template has unbalanced quotes: {}",
                settings.command
            ))
        })?;

        let schema = spec.manifest.normalized_params();
        for caps in PLACEHOLDER.captures_iter(&settings.command) {
            let name = caps[1].to_lowercase();
            if !schema.contains_key(&name) {
                return Err(CreakError::Config(format!(
                    "placeholder '{{{{{}}}}}' is not a declared parameter",
                    name
                )));
            }
        }

        Ok(Box::new(Self {
            schema,
            argv,
            timeout: Duration::from_secs(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            spec,
        }))
    }

    /// Fill placeholders. Words that were a bare placeholder and end up empty
    /// are dropped so unset optional parameters vanish from the command line.
    fn render(&self, params: &Params) -> Vec<String> {
        self.argv
            .iter()
            .filter_map(|word| {
                let filled = PLACEHOLDER
                    .replace_all(word, |caps: &regex::Captures| {
                        params
                            .get(&caps[1].to_lowercase())
                            .cloned()
                            .unwrap_or_default()
                    })
                    .into_owned();
                let bare = PLACEHOLDER
                    .find(word)
                    .is_some_and(|m| m.start() == 0 && m.end() == word.len());
                if bare && filled.is_empty() {
                    None
                } else {
                    Some(filled)
                }
            })
            .collect()
    }
}

#[async_trait]
impl Plugin for CommandPlugin {
    fn name(&self) -> &str {
        &self.spec.display_name
    }

    fn required_params(&self) -> &ParamSchema {
        &self.schema
    }

    fn requires_root(&self) -> bool {
        self.spec.manifest.root
    }

    async fn run(&self, ctx: RunContext) -> Result<()> {
        let argv = self.render(&ctx.params);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| CreakError::execution(self.name(), "command rendered empty"))?;

        debug!(plugin = %self.name(), program = %program, args = ?args, "Running command plugin");

        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(CreakError::Interrupted),
            result = tokio::time::timeout(self.timeout, child) => result
                .map_err(|_| CreakError::execution(
                    self.name(),
                    format!("timed out after {}s", self.timeout.as_secs()),
                ))?
                .map_err(|e| CreakError::execution(
                    self.name(),
                    format!("failed to run '{}': {}", program, e),
                ))?,
        };

        let mut stdout = std::io::stdout();
        stdout.write_all(&output.stdout)?;
        stdout.flush()?;

        if output.status.success() {
            Ok(())
        } else if ctx.cancel.is_cancelled() || interrupted_by_signal(&output.status) {
            debug!(plugin = %self.name(), status = %output.status, "Command interrupted");
            Err(CreakError::Interrupted)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CreakError::execution(
                self.name(),
                format!("'{}' exited with {}: {}", program, output.status, stderr.trim()),
            ))
        }
    }

    fn info(&self) -> PluginInfo {
        PluginInfo::from_spec(&self.spec)
    }
}

/// Terminal Ctrl-C reaches the child as SIGINT, possibly before the run
/// token is cancelled.
#[cfg(unix)]
fn interrupted_by_signal(status: &std::process::ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(libc::SIGINT)
}

#[cfg(not(unix))]
fn interrupted_by_signal(_status: &std::process::ExitStatus) -> bool {
    false
}

/// Reject shell operators in command templates. The template is executed
/// without a shell, so these would only ever be passed as literal words.
fn validate_command_safety(command: &str) -> Result<()> {
    let dangerous_patterns: &[(&str, &str)] = &[
        ("&&", "command chaining (&&)"),
        ("||", "conditional chaining (||)"),
        (";", "command separator (;)"),
        ("`", "backtick execution"),
        ("|", "pipe operator (|)"),
    ];

    for (pattern, description) in dangerous_patterns {
        if command.contains(pattern) {
            return Err(CreakError::Config(format!(
                "command template contains {}",
                description
            )));
        }
    }
    Ok(())
}

/// Prints the parameters it was run with.
pub struct EchoPlugin {
    spec: PluginSpec,
    schema: ParamSchema,
}

impl EchoPlugin {
    /// Factory registered under the `echo` kind.
    pub fn build(spec: PluginSpec) -> Result<Box<dyn Plugin>> {
        let schema = spec.manifest.normalized_params();
        Ok(Box::new(Self { spec, schema }))
    }
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &str {
        &self.spec.display_name
    }

    fn required_params(&self) -> &ParamSchema {
        &self.schema
    }

    fn requires_root(&self) -> bool {
        self.spec.manifest.root
    }

    async fn run(&self, ctx: RunContext) -> Result<()> {
        let mut stdout = std::io::stdout();
        for (name, value) in &ctx.params {
            writeln!(stdout, "{} => {}", name.to_uppercase(), value)?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn info(&self) -> PluginInfo {
        PluginInfo::from_spec(&self.spec)
    }
}
