mod api;
mod command;
mod config;
mod discovery;
mod proxy;
mod scheduler;
mod store;
mod telemetry;

use anyhow::{bail, Context, Result};
use api::StatusServer;
use clap::{Parser, Subcommand};
use command::CommandExecutor;
use config::AppConfig;
use discovery::LanScanner;
use drone_shared::{format_run_at, parse_run_at, ScheduleAction};
use proxy::{RemoteProxy, SelectedDevice, StatusAccessor};
use scheduler::Scheduler;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::{JsonFileStore, MemoryStore, MissionStore};
use telemetry::TelemetryService;
use tokio::time::interval;

use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How often `run` logs a telemetry line
const TELEMETRY_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "drone-control", version, about = "Simulated drone control plane")]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Serve the device endpoint and run the scheduler until Ctrl+C
    Run {
        /// Keep schedules and captures in memory only
        #[arg(long)]
        ephemeral: bool,
    },
    /// Probe the local /24 for devices exposing the status port
    Scan {
        /// Address prefix such as 192.168.1. (defaults to the local subnet)
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Print the current status, from a remote device when one is given
    Status {
        #[arg(long)]
        device: Option<String>,
    },
    /// Send one command to a running device
    Command {
        name: String,
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        /// Device address (the instance started by `run` on this host by default)
        #[arg(long, default_value = "127.0.0.1")]
        device: String,
    },
    /// Manage scheduled commands
    Schedule {
        #[command(subcommand)]
        cmd: ScheduleCmd,
    },
    /// List stored captures, newest first
    Images,
}

#[derive(Debug, Subcommand)]
enum ScheduleCmd {
    Add {
        /// `YYYY-MM-DDTHH:MM[:SS][offset]` or `YYYY-MM-DD HH:MM`, UTC unless an offset is given
        #[arg(long)]
        run_at: String,
        /// capture, takeoff or land
        #[arg(long)]
        action: String,
        #[arg(long, default_value = "Mission")]
        name: String,
        #[arg(long, default_value_t = 0.0)]
        lat: f64,
        #[arg(long, default_value_t = 0.0)]
        lon: f64,
    },
    List,
    Remove {
        id: u64,
    },
}

/// Components shared by every subcommand
struct App {
    config: AppConfig,
    store: Arc<dyn MissionStore>,
    telemetry: Arc<TelemetryService>,
    executor: CommandExecutor,
}

impl App {
    fn build(config: AppConfig, ephemeral: bool) -> Self {
        let store: Arc<dyn MissionStore> = if ephemeral {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(JsonFileStore::open(config.storage.data_file.clone()))
        };
        let telemetry = Arc::new(TelemetryService::new(
            store.clone(),
            config.storage.capture_dir.clone(),
        ));
        let executor = CommandExecutor::new(telemetry.clone());

        Self {
            config,
            store,
            telemetry,
            executor,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    let ephemeral = matches!(cli.cmd, Cmd::Run { ephemeral: true });
    let app = App::build(config, ephemeral);

    match cli.cmd {
        Cmd::Run { .. } => run(app).await,
        Cmd::Scan { prefix } => scan(&app, prefix).await,
        Cmd::Status { device } => status(&app, device).await,
        Cmd::Command {
            name,
            lat,
            lon,
            device,
        } => command(&app, &name, lat.zip(lon), device).await,
        Cmd::Schedule { cmd } => schedule(&app, cmd).await,
        Cmd::Images => images(&app).await,
    }
}

async fn run(app: App) -> Result<()> {
    // Endpoint and scheduler drive the same executor
    let server = StatusServer::bind(&app.config.api, app.executor.clone()).await?;
    let mut server_task = server.spawn();

    let scheduler = Scheduler::new(app.store.clone(), app.executor.clone(), &app.config.scheduler);
    let scheduler_handle = scheduler.start();

    let telemetry = app.telemetry.clone();
    let telemetry_task = tokio::spawn(async move {
        let mut ticker = interval(TELEMETRY_LOG_INTERVAL);
        loop {
            ticker.tick().await;
            let s = telemetry.refresh().await;
            info!(
                "[TELEMETRY] connected={} flying={} battery={:.1}% signal={:.1}% alt={:.1}m yaw={:.1}",
                s.connected,
                s.flying,
                s.battery_pct,
                s.signal_pct,
                s.position.alt_m,
                s.orientation.yaw_deg
            );
        }
    });

    info!("Drone control running, press Ctrl+C to stop");

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("listen for Ctrl+C")?;
            info!("Shutting down");
            Ok(())
        }
        joined = &mut server_task => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.context("device endpoint stopped")),
            Err(e) => Err(anyhow::anyhow!("device endpoint task failed: {}", e)),
        },
    };

    scheduler_handle.abort();
    telemetry_task.abort();
    server_task.abort();
    outcome
}

async fn scan(app: &App, prefix: Option<String>) -> Result<()> {
    let prefix = match prefix {
        Some(p) => p,
        None => {
            let p = discovery::default_prefix().await;
            debug!("[SCAN] Using local prefix {}", p);
            p
        }
    };

    let scanner = LanScanner::new(&app.config.discovery);
    let found = scanner.scan(&prefix).await;

    if found.is_empty() {
        println!("No devices found on {}* port {}", prefix, scanner.port());
    }
    for ip in found {
        println!("{}", ip);
    }
    Ok(())
}

async fn status(app: &App, device: Option<String>) -> Result<()> {
    let selection = Arc::new(SelectedDevice::new());
    if let Some(address) = device {
        println!("{}", selection.select(address).await);
    }

    let proxy = Arc::new(RemoteProxy::new(&app.config.proxy, selection)?);
    let accessor = StatusAccessor::new(proxy, app.telemetry.clone());

    let status = accessor.current_status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn command(
    app: &App,
    name: &str,
    coords: Option<(f64, f64)>,
    device: String,
) -> Result<()> {
    let selection = Arc::new(SelectedDevice::new());
    debug!("{}", selection.select(device).await);

    let proxy = RemoteProxy::new(&app.config.proxy, selection)?;
    let reply = proxy.send_command(name, coords).await;
    println!("{}", serde_json::to_string_pretty(&reply)?);

    if reply["success"] != serde_json::Value::Bool(true) {
        bail!("command '{}' did not complete", name);
    }
    Ok(())
}

async fn schedule(app: &App, cmd: ScheduleCmd) -> Result<()> {
    match cmd {
        ScheduleCmd::Add {
            run_at,
            action,
            name,
            lat,
            lon,
        } => {
            let at = parse_run_at(&run_at)?;
            let action: ScheduleAction = action.parse()?;
            let id = app
                .store
                .insert_schedule(&name, &format_run_at(&at), lat, lon, action.as_str())
                .await?;
            println!("Scheduled '{}' ({}) at {} as #{}", name, action, format_run_at(&at), id);
        }
        ScheduleCmd::List => {
            let entries = app.store.list_schedules().await?;
            if entries.is_empty() {
                println!("No scheduled commands");
            }
            for e in entries {
                println!(
                    "#{:<4} {:<20} {:<9} {}  ({:.6}, {:.6})",
                    e.id, e.run_at, e.action, e.name, e.lat, e.lon
                );
            }
        }
        ScheduleCmd::Remove { id } => {
            app.store.delete_schedule(id).await?;
            println!("Removed #{}", id);
        }
    }
    Ok(())
}

async fn images(app: &App) -> Result<()> {
    let records = app.store.list_images().await?;
    if records.is_empty() {
        println!("No captures stored");
    }
    for r in records {
        let coords = match (r.lat, r.lon) {
            (Some(lat), Some(lon)) => format!("({:.6}, {:.6})", lat, lon),
            _ => "(no position)".to_string(),
        };
        println!(
            "#{:<4} {}  {}  {}  {}",
            r.id,
            r.timestamp,
            r.filename,
            coords,
            r.note
        );
    }
    Ok(())
}
