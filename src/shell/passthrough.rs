//! Shell passthrough for input lines that are not console commands.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CreakError, Result};

/// Runs a raw command line and returns what it printed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShellExecutor: Send + Sync {
    async fn execute(&self, line: &str) -> Result<String>;
}

/// Executes lines with `sh -c`.
#[derive(Debug, Clone)]
pub struct SystemShell {
    shell: String,
}

impl Default for SystemShell {
    fn default() -> Self {
        Self { shell: "sh".into() }
    }
}

#[async_trait]
impl ShellExecutor for SystemShell {
    async fn execute(&self, line: &str) -> Result<String> {
        debug!(shell = %self.shell, line = %line, "Forwarding line to shell");
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(line)
            .output()
            .await
            .map_err(|e| CreakError::execution("shell", format!("failed to run {}: {}", self.shell, e)))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}
