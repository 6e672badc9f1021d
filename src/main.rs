//! Readiness Wrapper - report readiness and health of a wrapped server
//! to its orchestrator.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use readiness_wrapper::config::{parse_child_args, ConfigLoader, FileConfig, SupervisorConfig};
use readiness_wrapper::control::{ControlPlaneClient, HttpSdkClient, LocalClient};
use readiness_wrapper::display;
use readiness_wrapper::supervisor::{FatalError, StreamKind, Supervisor, FATAL_EXIT_CODE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TriggerArg {
    Stdout,
    Stderr,
}

impl From<TriggerArg> for StreamKind {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::Stdout => StreamKind::Stdout,
            TriggerArg::Stderr => StreamKind::Stderr,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "readiness-wrapper",
    about = "Wrap a server process and report its readiness and health to the orchestrator",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the server executable or launch script.
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    input: Option<String>,

    /// Whitespace-separated arguments passed to the server.
    #[arg(long, default_value = "", allow_hyphen_values = true, value_name = "ARGS")]
    args: String,

    /// Output substring that marks the server as ready.
    #[arg(long)]
    marker: Option<String>,

    /// Milliseconds between health pings.
    #[arg(long, value_name = "MS")]
    heartbeat_interval_ms: Option<u64>,

    /// Stream scanned for the readiness marker (repeatable).
    #[arg(long = "trigger", value_enum)]
    triggers: Vec<TriggerArg>,

    /// Config file to use instead of the default search paths.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log reports locally instead of contacting the SDK sidecar.
    #[arg(long)]
    local: bool,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Build the configuration from flags, the config file and defaults.
fn build_config(cli: &Cli) -> Result<(SupervisorConfig, FileConfig), FatalError> {
    let mut config = SupervisorConfig::new(cli.input.clone().unwrap_or_default())
        .with_args(parse_child_args(&cli.args));
    // The executable path is checked before any file is read.
    config.validate()?;

    let loader = cli
        .config
        .clone()
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let file = loader.load()?;
    config = file.apply(config);

    if let Some(marker) = &cli.marker {
        config.readiness_marker.clone_from(marker);
    }
    if let Some(ms) = cli.heartbeat_interval_ms {
        config.heartbeat_interval = Duration::from_millis(ms);
    }
    if !cli.triggers.is_empty() {
        config.trigger_streams = cli.triggers.iter().copied().map(StreamKind::from).collect();
    }
    config.validate()?;

    Ok((config, file))
}

async fn run(cli: Cli) -> FatalError {
    let (config, file) = match build_config(&cli) {
        Ok(built) => built,
        Err(e) => return e,
    };

    display::banner("Connecting to the control plane");
    let client: Arc<dyn ControlPlaneClient> = if cli.local {
        tracing::info!("Using local control plane");
        Arc::new(LocalClient::new())
    } else {
        let timeout = file.control_plane.timeout();
        let connected = match &file.control_plane.base_url {
            Some(url) => HttpSdkClient::new(url, timeout),
            None => HttpSdkClient::from_env(timeout),
        };
        match connected {
            Ok(client) => {
                tracing::info!(base_url = %client.base_url(), "Using SDK sidecar");
                Arc::new(client)
            }
            Err(e) => return FatalError::Connect(e),
        }
    };

    tracing::info!(
        command = %config.command,
        args = ?config.args,
        marker = %config.readiness_marker,
        triggers = ?config.trigger_streams,
        "Starting readiness wrapper"
    );
    Supervisor::new(config, client).run().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cause = run(cli).await;
    tracing::error!(error = %cause, "Supervisor terminating");
    display::fatal(&cause);
    std::process::exit(FATAL_EXIT_CODE);
}
