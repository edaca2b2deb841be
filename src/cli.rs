//! Command line entry point
//!
//! ```text
//! cast-bridge [--license] [--version]
//! cast-bridge connect [OPTIONS]            foreground
//! cast-bridge service connect [OPTIONS]    background
//! cast-bridge service disconnect|reconnect|log
//! ```
//!
//! The cast protocol and desktop control bus live outside this crate; a host
//! binary hands them over in a [`Backend`] and calls [`main_with`].

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bus::create_bus;
use crate::config::{get_data_dir, load_config, Config, ConnectionArgs};
use crate::daemon::Daemon;
use crate::device::locator::{DeviceConnector, DeviceDiscovery, DeviceLocator};
use crate::device::mdns::MdnsDiscovery;
use crate::error::{exit_code, BridgeError};
use crate::listener::IntegrationHook;
use crate::logging;
use crate::resources::ResourceCache;
use crate::supervisor::{Supervisor, SupervisorConfig};
use crate::surface::SurfaceFactory;

const ABOUT: &str = "Control casting devices via desktop media controls.\n\n\
This service connects a casting device to the desktop media player interface.";

pub fn version_info() -> String {
    format!(
        "{} v{} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CAST_BRIDGE_VERSION"),
        env!("CAST_BRIDGE_GIT_SHA")
    )
}

pub fn license_info() -> String {
    format!(
        "{} is free software, licensed under {}.",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_LICENSE")
    )
}

#[derive(Debug, Parser)]
#[command(name = "cast-bridge", about = ABOUT, disable_version_flag = true)]
pub struct Cli {
    /// Show license and copyright information
    #[arg(short = 'L', long)]
    pub license: bool,

    /// Show version information
    #[arg(short = 'V', long)]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to a device and run the service in the foreground
    Connect(ConnectOpts),

    /// Connect, disconnect or reconnect the background service
    #[command(subcommand)]
    Service(ServiceCommand),
}

#[derive(Debug, Subcommand)]
pub enum ServiceCommand {
    /// Connect the background service to a device
    Connect(ConnectOpts),
    /// Disconnect the background service from the device
    Disconnect,
    /// Reconnect the background service to the device
    Reconnect,
    /// Show the service log
    Log,
    /// Body of the background process
    #[command(hide = true)]
    Run,
}

/// Device selection and retry flags. Unset values fall back to [`Config`].
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConnectOpts {
    /// Connect to a device via its name, otherwise control the first device found
    #[arg(short, long)]
    pub name: Option<String>,

    /// Connect to a device via its hostname or IP address
    #[arg(long)]
    pub host: Option<String>,

    /// Connect to a device via its UUID
    #[arg(short, long)]
    pub uuid: Option<String>,

    /// Seconds to wait between attempts to find the device; without it a
    /// miss exits
    #[arg(short, long)]
    pub wait: Option<f64>,

    /// Seconds to wait before reconnecting after an interrupted connection
    #[arg(short, long)]
    pub retry_wait: Option<f64>,

    /// Use the light icon, which suits dark themes
    #[arg(short, long)]
    pub icon: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

impl ConnectOpts {
    pub fn resolve(&self, config: &Config) -> ConnectionArgs {
        ConnectionArgs {
            name: self.name.clone(),
            host: self.host.clone(),
            uuid: self.uuid.clone(),
            wait: self.wait.or(config.wait),
            retry_wait: self.retry_wait.unwrap_or(config.retry_wait),
            icon: self.icon || config.light_icon,
            log_level: self
                .log_level
                .clone()
                .unwrap_or_else(|| config.log_level.clone()),
        }
    }
}

/// Protocol collaborators supplied by the host binary
pub struct Backend {
    pub connector: Arc<dyn DeviceConnector>,
    pub surfaces: Arc<dyn SurfaceFactory>,
    pub discovery: Arc<dyn DeviceDiscovery>,
    pub hooks: Vec<Arc<dyn IntegrationHook>>,
}

impl Backend {
    pub fn new(connector: Arc<dyn DeviceConnector>, surfaces: Arc<dyn SurfaceFactory>) -> Self {
        Self {
            connector,
            surfaces,
            discovery: Arc::new(MdnsDiscovery::new()),
            hooks: Vec::new(),
        }
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn DeviceDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_hooks(mut self, hooks: Vec<Arc<dyn IntegrationHook>>) -> Self {
        self.hooks = hooks;
        self
    }
}

/// Parse the process arguments, run, and map the outcome to an exit code.
/// Failures print a single warning line.
pub fn main_with(backend: Backend) -> ExitCode {
    let code = match execute(Cli::parse(), backend) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("warning: {:#}", e);
            exit_code_for(&e)
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<BridgeError>()
        .map(BridgeError::exit_code)
        .unwrap_or(exit_code::NO_DEVICE)
}

pub fn execute(cli: Cli, backend: Backend) -> Result<i32> {
    if cli.license || cli.version {
        if cli.license {
            println!("{}", license_info());
        }
        if cli.version {
            println!("{}", version_info());
        }
        return Ok(exit_code::OK);
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(exit_code::OK);
    };

    let config = load_config()?;

    match command {
        Command::Connect(opts) => {
            let args = opts.resolve(&config);
            logging::init_foreground(&args.log_level);
            run_supervisor(&args, backend)
        }
        Command::Service(command) => service(command, &config, backend),
    }
}

fn service(command: ServiceCommand, config: &Config, backend: Backend) -> Result<i32> {
    let daemon = Daemon::default();

    if let ServiceCommand::Run = command {
        let args = daemon.args().load(None)?.ok_or(BridgeError::NotRunning)?;
        logging::init_file(&args.log_level, &daemon.log_file())?;
        let result = run_supervisor(&args, backend);
        daemon.release();
        return result;
    }

    logging::init_foreground(&config.log_level);
    match command {
        ServiceCommand::Connect(opts) => {
            daemon.connect(&opts.resolve(config))?;
        }
        ServiceCommand::Disconnect => daemon.disconnect()?,
        ServiceCommand::Reconnect => {
            daemon.reconnect()?;
        }
        ServiceCommand::Log => daemon.print_log(&mut io::stdout().lock())?,
        ServiceCommand::Run => {}
    }
    Ok(exit_code::OK)
}

fn run_supervisor(args: &ConnectionArgs, backend: Backend) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        info!("Starting {}", version_info());

        let shutdown = CancellationToken::new();
        let on_signal = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            on_signal.cancel();
        });

        let supervisor = Supervisor::new(
            DeviceLocator::new(backend.discovery, backend.connector),
            backend.surfaces,
            Arc::new(ResourceCache::new(get_data_dir())),
            create_bus(),
            shutdown,
            SupervisorConfig::from(args),
        )
        .with_hooks(backend.hooks);

        supervisor.run().await?;
        info!("Shutdown complete");
        Ok(exit_code::OK)
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
