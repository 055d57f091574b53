//! Console output formatting.
//!
//! Diagnostics are always one line: `[!] ` prefix, first letter upper-cased,
//! and a trailing period unless the text already ends in punctuation.
//! Normal status lines use the `[*] ` prefix.

use std::error::Error;
use std::io::{self, Write};

use crate::config::FrameworkInfo;
use crate::plugins::{DiscoveryFailure, Params, PluginRegistry, DISABLED_CATEGORY};

/// Format a diagnostic line.
pub fn format_error(line: &str) -> String {
    let mut line = line.trim().to_string();
    if !line.ends_with(&['.', ',', ';', '!', '?'][..]) {
        line.push('.');
    }
    let mut chars = line.chars();
    let line = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("[!] {}", line)
}

/// Format a normal status line.
pub fn format_output(line: &str) -> String {
    format!("[*] {}", line)
}

/// Error message followed by its innermost cause when one exists.
pub fn describe_error(err: &(dyn Error + 'static)) -> String {
    let message = err.to_string();
    let Some(mut root) = err.source() else {
        return message;
    };
    while let Some(source) = root.source() {
        root = source;
    }
    let cause = root.to_string();
    if message.contains(&cause) {
        message
    } else {
        format!("{} (root cause: {})", message, cause)
    }
}

pub fn write_error(out: &mut dyn Write, line: &str) -> io::Result<()> {
    writeln!(out, "{}", format_error(line))
}

pub fn write_output(out: &mut dyn Write, line: &str) -> io::Result<()> {
    writeln!(out, "{}", format_output(line))
}

/// Startup summary: plugin count, then each category with its files.
pub fn write_discovery_summary(out: &mut dyn Write, registry: &PluginRegistry) -> io::Result<()> {
    writeln!(out)?;
    write_output(out, &format!("Loaded {} plugins", registry.len()))?;
    write_output(out, "Categories:")?;
    writeln!(out)?;
    for (category, files) in registry.categories() {
        let marker = if category == DISABLED_CATEGORY { '-' } else { '+' };
        write_output(out, &format!("{}({})", category, files.len()))?;
        for file in files {
            writeln!(out, "     {} {}", marker, file)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One diagnostic per file that failed to load.
pub fn write_discovery_failures(out: &mut dyn Write, failures: &[DiscoveryFailure]) -> io::Result<()> {
    for failure in failures {
        write_error(out, &failure.error.to_string())?;
    }
    out.flush()
}

/// Base parameters as dotted name/value rows.
pub fn write_base_params(out: &mut dyn Write, base: &Params) -> io::Result<()> {
    if base.is_empty() {
        return Ok(());
    }
    write_output(out, "Detected some informations")?;
    writeln!(out)?;
    for (name, value) in base {
        writeln!(out, " {:.<12}{:.>15}", name, value)?;
    }
    writeln!(out)
}

/// Framework metadata, one `field: value` per line.
pub fn write_framework_info(out: &mut dyn Write, info: &FrameworkInfo) -> io::Result<()> {
    writeln!(out, "author: {}", info.author)?;
    writeln!(out, "version: {}", info.version)
}
