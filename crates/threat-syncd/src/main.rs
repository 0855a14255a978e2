// # threat-syncd - Threat Feed Sync Daemon
//
// This is a thin integration layer. All sync logic lives in
// threat-sync-core; feed formats and the controller client live in their
// own crates.
//
// The daemon is responsible for:
// 1. Parsing the command line and loading the YAML configuration
// 2. Initializing logging and the runtime
// 3. Registering feed parsers and connecting to the UniFi controller
// 4. Serving health endpoints (optional)
// 5. Running the periodic sync until SIGTERM/SIGINT
//
// ## Example
//
// ```bash
// export UNIFI_PASSWORD=...
// threat-syncd --config /config/config.yaml
// threat-syncd --config ./config.yaml --validate
// ```

mod health;

use anyhow::{Context, Result};
use clap::Parser;
use health::HealthState;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use threat_sync_core::config::ThreatSyncConfig;
use threat_sync_core::shutdown::{self, ShutdownTrigger};
use threat_sync_core::{ParserRegistry, SyncEngine, SyncEvent};
use threat_sync_unifi::UnifiClient;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Deadline for the startup login test
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for logout and health server drain on exit
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Sync public threat-intelligence IP feeds into a UniFi firewall group
#[derive(Debug, Parser)]
#[command(name = "threat-syncd", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "/config/config.yaml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    validate: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    if args.validate {
        println!("Configuration is valid: {}", args.config.display());
        return DaemonExitCode::CleanShutdown.into();
    }

    if let Err(e) = init_tracing(&args.log_level) {
        eprintln!("Failed to set tracing subscriber: {:#}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!(version = VERSION, "Starting threat-syncd");
    info!(
        controller = %config.controller.url,
        site = %config.controller.site,
        group = %config.controller.group_name,
        ruleset = %config.controller.ruleset,
        rule_index = config.controller.rule_index,
        "Controller configuration"
    );
    info!(
        interval = %config.sync.interval,
        feeds = config.feeds.enabled_count(),
        "Sync configuration"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Load and validate the configuration file
fn load_config(args: &Args) -> Result<ThreatSyncConfig> {
    let config = ThreatSyncConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.validate()?;
    Ok(config)
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{}'", level))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
}

/// Run the daemon until shutdown
async fn run_daemon(config: ThreatSyncConfig) -> DaemonExitCode {
    let (trigger, shutdown) = shutdown::channel();

    // Feed parsers
    let registry = Arc::new(ParserRegistry::new());
    threat_sync_feeds::register(&registry);
    info!(parsers = ?registry.list(), "Registered feed parsers");

    // Controller
    let client = match connect(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to UniFi controller: {:#}", e);
            return DaemonExitCode::ConfigError;
        }
    };
    info!("Successfully connected to UniFi controller");

    let (mut engine, event_rx) = match SyncEngine::from_config(
        Arc::clone(&registry),
        Box::new(Arc::clone(&client)),
        &config,
    ) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Failed to create sync engine: {}", e);
            return DaemonExitCode::ConfigError;
        }
    };
    tokio::spawn(log_events(event_rx));

    // Health endpoints
    let health_server = if config.health.enabled {
        let state = match HealthState::new(VERSION) {
            Ok(state) => Arc::new(state),
            Err(e) => {
                error!("Failed to create health metrics: {}", e);
                return DaemonExitCode::ConfigError;
            }
        };
        engine.set_health_recorder(state.clone());

        let listener = match health::bind(config.health.port).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(port = config.health.port, "Failed to start health server: {}", e);
                return DaemonExitCode::ConfigError;
            }
        };
        let handle = tokio::spawn(health::serve(listener, Arc::clone(&state), shutdown.clone()));
        Some((state, handle))
    } else {
        None
    };

    for (feed, problem) in engine.validate_feeds() {
        warn!(feed = %feed, error = %problem, "Feed configuration problem, feed will be skipped");
    }

    tokio::spawn(forward_shutdown_signal(trigger));

    engine
        .run_periodic(config.sync.interval(), shutdown.clone())
        .await;

    info!("Shutting down daemon");
    let mut exit_code = DaemonExitCode::CleanShutdown;

    // Liveness reports unhealthy while the daemon drains
    if let Some((state, _)) = &health_server {
        state.set_healthy(false);
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, client.logout()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Logout failed: {}", e),
        Err(_) => warn!("Logout timed out after {:?}", SHUTDOWN_TIMEOUT),
    }

    if let Some((_, handle)) = health_server {
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => {
                error!("Health server error: {}", e);
                exit_code = DaemonExitCode::RuntimeError;
            }
            Ok(Err(e)) => {
                error!("Health server task failed: {}", e);
                exit_code = DaemonExitCode::RuntimeError;
            }
            Err(_) => warn!("Health server did not stop within {:?}", SHUTDOWN_TIMEOUT),
        }
    }

    info!("Daemon stopped");
    exit_code
}

/// Build the controller client and test the credentials
async fn connect(config: &ThreatSyncConfig) -> Result<Arc<UnifiClient>> {
    let client = Arc::new(UnifiClient::new(&config.controller)?);

    tokio::time::timeout(CONNECT_TIMEOUT, client.login())
        .await
        .with_context(|| format!("login timed out after {:?}", CONNECT_TIMEOUT))??;

    Ok(client)
}

/// Drain engine events into the debug log
async fn log_events(mut event_rx: tokio::sync::mpsc::Receiver<SyncEvent>) {
    while let Some(event) = event_rx.recv().await {
        debug!(event = ?event, "Sync event");
    }
}

/// Fire the shutdown trigger on SIGTERM/SIGINT
///
/// If the signal handlers cannot be installed the daemon shuts down rather
/// than run without a way to stop it cleanly.
async fn forward_shutdown_signal(trigger: ShutdownTrigger) {
    match wait_for_shutdown_signal().await {
        Ok(signal) => info!("Received shutdown signal: {}", signal),
        Err(e) => error!("Shutdown signal error: {}", e),
    }
    trigger.trigger();
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to listen for Ctrl+C: {}", e))?;
    Ok("SIGINT")
}
