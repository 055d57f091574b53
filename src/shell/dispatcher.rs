//! Stateful command dispatcher.
//!
//! The dispatcher owns the plugin registry and one session: the current
//! plugin (by display name) and its parameters. It has two states, idle and
//! plugin-loaded, and every command is processed to completion before the
//! next line is read. No error raised while handling a command escapes
//! [`Dispatcher::execute_line`]; each is rendered as one diagnostic line and
//! the session is left as it was.

use std::io::Write;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::FrameworkInfo;
use crate::error::{CreakError, ResolutionError, Result};
use crate::plugins::{
    panic_message, short_name, ParamSchema, Params, PluginRegistry, RunContext,
};
use crate::session::ParamStore;
use crate::utils::privilege;

use super::command::{parse_command, Command, HELP};
use super::interrupt::InterruptHandle;
use super::passthrough::{ShellExecutor, SystemShell};
use super::printer::{describe_error, write_error, write_framework_info, write_output};

/// Context shown in the prompt while idle.
const BASE_CONTEXT: &str = "base";

/// Whether the loop should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive command dispatcher writing to `W`.
pub struct Dispatcher<W: Write> {
    registry: PluginRegistry,
    current: Option<String>,
    params: ParamStore,
    shell: Box<dyn ShellExecutor>,
    framework: FrameworkInfo,
    prompt_name: String,
    elevated: bool,
    interrupt: InterruptHandle,
    session_id: Uuid,
    out: W,
}

impl<W: Write> Dispatcher<W> {
    /// Create an idle dispatcher over `registry` with the given base defaults.
    pub fn new(registry: PluginRegistry, base_params: Params, out: W) -> Self {
        Self {
            registry,
            current: None,
            params: ParamStore::new(base_params),
            shell: Box::new(SystemShell::default()),
            framework: FrameworkInfo::default(),
            prompt_name: "creak".into(),
            elevated: privilege::is_elevated(),
            interrupt: InterruptHandle::new(),
            session_id: Uuid::new_v4(),
            out,
        }
    }

    pub fn with_shell(mut self, shell: Box<dyn ShellExecutor>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_framework(mut self, framework: FrameworkInfo) -> Self {
        self.framework = framework;
        self
    }

    pub fn with_prompt_name(mut self, name: impl Into<String>) -> Self {
        self.prompt_name = name.into();
        self
    }

    /// Override the privilege check made at construction.
    pub fn with_elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    /// Handle for cancelling the active run from another task.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Display name of the current plugin.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Prompt text, `[creak::base] > ` or `[creak::<short name>] > `.
    pub fn prompt(&self) -> String {
        let context = self.current.as_deref().map_or(BASE_CONTEXT, short_name);
        format!("[{}::{}] > ", self.prompt_name, context)
    }

    /// Read and execute lines until `quit` or end of input.
    pub async fn run_loop<R>(&mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let span = info_span!("session", id = %self.session_id);
        self.read_eval(input).instrument(span).await
    }

    async fn read_eval<R>(&mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            write!(self.out, "{}", self.prompt())?;
            self.out.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(self.out)?;
                self.dispatch(Command::Quit).await?;
                return Ok(());
            };
            if self.execute_line(&line).await? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Parse and execute one line, reporting any failure as a diagnostic.
    ///
    /// Only output errors are returned.
    pub async fn execute_line(&mut self, line: &str) -> Result<Flow> {
        let result = match parse_command(line) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(flow) => Ok(flow),
            Err(e) => {
                self.report(&e)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn report(&mut self, err: &CreakError) -> Result<()> {
        match err {
            CreakError::Interrupted => writeln!(self.out)?,
            CreakError::Resolution(ResolutionError::Ambiguous { candidates, .. }) => {
                write_output(&mut self.out, &err.to_string())?;
                for candidate in candidates {
                    writeln!(self.out, "     {}", candidate)?;
                }
            }
            CreakError::Execution { .. } => write_error(&mut self.out, &describe_error(err))?,
            _ => write_error(&mut self.out, &err.to_string())?,
        }
        Ok(())
    }

    /// Execute a parsed command. Errors are returned unreported.
    pub async fn dispatch(&mut self, command: Command) -> Result<Flow> {
        debug!(command = ?command, "Dispatching command");
        match command {
            Command::Empty => {}
            Command::Load(fragment) => self.load(&fragment)?,
            Command::Set { name, value } => self.set(&name, &value)?,
            Command::Unset(name) => self.unset(&name)?,
            Command::Run => self.run().await?,
            Command::Clean => self.clean(),
            Command::ShowInfo => self.show_info()?,
            Command::List => self.list()?,
            Command::Help => self.help()?,
            Command::Quit => {
                writeln!(self.out, "Quitting..")?;
                return Ok(Flow::Quit);
            }
            Command::Pipe(segments) => {
                debug!(segments = ?segments, "Ignoring chained command line");
                return Err(CreakError::Unsupported("Command chaining with '|'".into()));
            }
            Command::Shell(line) => {
                let output = self.shell.execute(&line).await?;
                write!(self.out, "{}", output)?;
                if !output.is_empty() && !output.ends_with('\n') {
                    writeln!(self.out)?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Resolve `fragment` and make that plugin current.
    fn load(&mut self, fragment: &str) -> Result<()> {
        let name = self.registry.resolve(fragment)?.to_string();
        self.activate(name);
        Ok(())
    }

    fn activate(&mut self, name: String) {
        if let Some(plugin) = self.registry.get_mut(&name) {
            plugin.init();
        }
        info!(plugin = %name, "Plugin loaded");
        self.params.clear();
        self.current = Some(name);
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let schema = schema_of(&self.registry, self.current.as_deref());
        let name = self.params.set(schema, name, value)?;
        writeln!(self.out, "{} => {}", name.to_uppercase(), value)?;
        Ok(())
    }

    fn unset(&mut self, name: &str) -> Result<()> {
        let schema = schema_of(&self.registry, self.current.as_deref());
        let name = self.params.unset(schema, name)?;
        writeln!(self.out, "{} => (unset)", name.to_uppercase())?;
        Ok(())
    }

    /// Validate, check privileges, then run the current plugin.
    async fn run(&mut self) -> Result<()> {
        let name = self.current.clone().ok_or(CreakError::NoPluginLoaded)?;
        let plugin = self
            .registry
            .get(&name)
            .ok_or(CreakError::NoPluginLoaded)?;

        self.params.validate(plugin.required_params())?;

        if plugin.requires_root() && !self.elevated {
            return Err(CreakError::Privilege(name));
        }

        let token = self.interrupt.begin();
        let ctx = RunContext::new(self.params.snapshot(), token.clone());
        info!(plugin = %name, "Running plugin");

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(CreakError::Interrupted),
            result = AssertUnwindSafe(plugin.run(ctx)).catch_unwind() => match result {
                Ok(result) => result,
                Err(payload) => Err(CreakError::execution(
                    &name,
                    format!("panicked: {}", panic_message(payload.as_ref())),
                )),
            },
        };
        self.interrupt.finish();

        // A run that fails after cancellation was requested counts as interrupted.
        let outcome = match outcome {
            Err(e) if token.is_cancelled() && !e.is_interrupt() => {
                debug!(plugin = %name, error = %e, "Run failed after cancellation");
                Err(CreakError::Interrupted)
            }
            other => other,
        };

        match outcome {
            Ok(()) => {
                debug!(plugin = %name, "Plugin finished");
                Ok(())
            }
            Err(CreakError::Interrupted) => {
                info!(plugin = %name, "Run interrupted by user");
                Err(CreakError::Interrupted)
            }
            Err(e @ CreakError::Execution { .. }) => {
                warn!(plugin = %name, error = %e, "Plugin run failed");
                Err(e)
            }
            Err(e) => {
                warn!(plugin = %name, error = %e, "Plugin run failed");
                Err(CreakError::execution(&name, describe_error(&e)))
            }
        }
    }

    /// Leave the current plugin.
    fn clean(&mut self) {
        if let Some(name) = self.current.take() {
            debug!(plugin = %name, "Plugin unloaded");
        }
        self.params.clear();
    }

    fn show_info(&mut self) -> Result<()> {
        let Some(plugin) = self.current.as_deref().and_then(|n| self.registry.get(n)) else {
            write_framework_info(&mut self.out, &self.framework)?;
            return Ok(());
        };
        plugin.info().write_to(&mut self.out)?;
        if !self.params.is_empty() {
            writeln!(self.out, "Current values:")?;
            for (name, value) in self.params.values() {
                writeln!(self.out, "  {:<16}{}", name.to_uppercase(), value)?;
            }
        }
        Ok(())
    }

    fn list(&mut self) -> Result<()> {
        let mut last_category: Option<&str> = None;
        for name in self.registry.list() {
            let category = name.split('/').next().unwrap_or(name);
            if last_category != Some(category) {
                write_output(&mut self.out, category)?;
                last_category = Some(category);
            }
            writeln!(self.out, "     {}", name)?;
        }
        Ok(())
    }

    fn help(&mut self) -> Result<()> {
        for (usage, description) in HELP {
            writeln!(self.out, "  {:<22}{}", usage, description)?;
        }
        Ok(())
    }
}

/// Parameter schema of the current plugin, if one is loaded.
fn schema_of<'a>(registry: &'a PluginRegistry, current: Option<&str>) -> Option<&'a ParamSchema> {
    current
        .and_then(|name| registry.get(name))
        .map(|plugin| plugin.required_params())
}
