//! Command line parsing for the interactive console.

use crate::error::{CreakError, Result};

/// Separator that marks a chained command line.
const PIPE: char = '|';

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank input.
    Empty,
    Load(String),
    Set { name: String, value: String },
    Unset(String),
    Run,
    Clean,
    ShowInfo,
    List,
    Help,
    Quit,
    /// A line containing `|`, split into its trimmed segments.
    Pipe(Vec<String>),
    /// Anything else, forwarded verbatim to the shell.
    Shell(String),
}

/// Parse one input line.
///
/// # Errors
/// `CreakError::Usage` when a known command is missing its argument.
pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    if line.contains(PIPE) {
        return Ok(Command::Pipe(
            line.split(PIPE).map(|s| s.trim().to_string()).collect(),
        ));
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "load" => Command::Load(required(rest, "load <name>")?.to_string()),
        "set" => {
            let mut words = rest.split_whitespace();
            let name = words
                .next()
                .ok_or_else(|| CreakError::Usage("set <name> <value>".into()))?;
            Command::Set {
                name: name.to_string(),
                value: words.collect::<Vec<_>>().join(" "),
            }
        }
        "unset" => Command::Unset(required(rest, "unset <name>")?.to_string()),
        "run" => Command::Run,
        "clean" => Command::Clean,
        "showinfo" => Command::ShowInfo,
        "list" => Command::List,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Shell(line.to_string()),
    };
    Ok(command)
}

fn required<'a>(arg: &'a str, usage: &str) -> Result<&'a str> {
    if arg.is_empty() {
        Err(CreakError::Usage(usage.to_string()))
    } else {
        Ok(arg)
    }
}

/// One line per command for `help`.
pub const HELP: &[(&str, &str)] = &[
    ("load <name>", "Select a plugin by display name or unique fragment"),
    ("set <name> <value>", "Assign a parameter of the loaded plugin"),
    ("unset <name>", "Clear a parameter of the loaded plugin"),
    ("run", "Validate parameters and run the loaded plugin"),
    ("clean", "Leave the current plugin"),
    ("showinfo", "Describe the loaded plugin, or the framework"),
    ("list", "List available plugins"),
    ("help", "Show this help"),
    ("quit", "Exit (aliases: exit, q)"),
    ("<anything else>", "Run as a shell command"),
];
