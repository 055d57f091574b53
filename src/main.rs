use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use creak::config::Config;
use creak::plugins::{discover_plugins, Discovery, PathCapabilities, PluginCatalog};
use creak::probe::{base_params, NetworkProbe, NoProbe, RouteProbe};
use creak::shell::printer::{write_base_params, write_discovery_failures, write_discovery_summary};
use creak::shell::{spawn_ctrl_c_listener, Dispatcher};
use creak::utils::panic_hook::install_quiet_panic_hook;

#[derive(Parser)]
#[command(name = "creak")]
#[command(about = "Interactive plugin console for network tooling", long_about = None)]
struct Cli {
    /// Config file (default: ~/.creak/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Plugin root to scan; repeat for several. Replaces the configured roots.
    #[arg(long = "plugin-dir", global = true)]
    plugin_dirs: Vec<PathBuf>,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive console
    Shell,
    /// Print the discovery report and exit
    Plugins,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    install_quiet_panic_hook();

    match cli.command {
        Some(Commands::Version) => {
            println!("creak {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Plugins) => {
            let (_, discovery) = prepare(cli.config.as_deref(), cli.plugin_dirs)?;
            let mut out = std::io::stdout().lock();
            write_discovery_summary(&mut out, &discovery.registry)?;
            out.flush()?;
        }
        Some(Commands::Shell) | None => {
            let (config, discovery) = prepare(cli.config.as_deref(), cli.plugin_dirs)?;
            shell(config, discovery).await?;
        }
    }

    Ok(())
}

/// Load configuration and discover plugins.
fn prepare(config_path: Option<&Path>, plugin_dirs: Vec<PathBuf>) -> anyhow::Result<(Config, Discovery)> {
    let mut config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if !plugin_dirs.is_empty() {
        config.plugin_dirs = plugin_dirs;
    }
    let discovery = discover(&config)?;
    Ok((config, discovery))
}

/// Scan the configured roots and print one diagnostic per rejected file.
fn discover(config: &Config) -> anyhow::Result<Discovery> {
    let catalog = PluginCatalog::with_builtins();
    let discovery = discover_plugins(&config.plugin_dirs, &catalog, &PathCapabilities);

    let mut out = std::io::stdout().lock();
    write_discovery_failures(&mut out, &discovery.failures)?;
    info!(
        plugins = discovery.registry.len(),
        failures = discovery.failures.len(),
        "Discovery complete"
    );
    Ok(discovery)
}

async fn shell(config: Config, discovery: Discovery) -> anyhow::Result<()> {
    let probe: Box<dyn NetworkProbe> = if config.probe_network {
        Box::new(RouteProbe::default())
    } else {
        Box::new(NoProbe)
    };
    let base = base_params(probe.as_ref()).await;

    {
        let mut out = std::io::stdout().lock();
        write_discovery_summary(&mut out, &discovery.registry)?;
        write_base_params(&mut out, &base)?;
        out.flush()?;
    }

    let mut dispatcher = Dispatcher::new(discovery.registry, base, std::io::stdout())
        .with_framework(config.framework)
        .with_prompt_name(config.prompt_name);

    let listener = spawn_ctrl_c_listener(dispatcher.interrupt_handle());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = dispatcher.run_loop(stdin).await;
    listener.abort();

    result.map_err(Into::into)
}
