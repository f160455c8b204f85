// Module declarations for the application's core components
pub mod config;    // Configuration management
pub mod error;     // Error handling and types
pub mod inverter;  // Inverter session: catalog + transport + executor
pub mod mpp;       // MPP protocol: command catalog, resolution, checksums
pub mod options;   // Command line options parsing
pub mod prelude;   // Common imports and types
pub mod scheduler; // Repeated polling
pub mod status;    // Merged status report
pub mod transport; // Test, serial, hidraw and raw USB executors

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::scheduler::{Request, Scheduler};
use std::time::Duration;

fn init_logging(level: &str) {
    if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init()
    {
        eprintln!("Failed to initialise logging: {}", e);
    }
}

/// Works out what the command line asked for.
fn request(options: &Options) -> Option<Request> {
    if options.status {
        Some(Request::Status)
    } else if options.serial_number {
        Some(Request::SerialNumber)
    } else {
        options.command.clone().map(Request::Command)
    }
}

/// Main application entry point
pub async fn app(options: Options) -> Result<()> {
    let config = Config::from_options(&options)?;
    init_logging(config.loglevel());

    info!("mpp-bridge {} starting", CARGO_PKG_VERSION);
    config.log_summary();

    let catalog = config.catalog()?;
    let session = Arc::new(InverterSession::new(SessionConfig::from_config(&config), catalog)?);

    if options.list_commands {
        print!("{}", session);
        return Ok(());
    }

    let Some(request) = request(&options) else {
        bail!("nothing to do: pass --command, --status, --serial-number or --list-commands");
    };

    match options.interval {
        Some(secs) => poll(session, request, Duration::from_secs(secs)).await,
        None => {
            let scheduler = Scheduler::new(session, request, Duration::ZERO);
            println!("{}", scheduler.run_once().await?);
            Ok(())
        }
    }
}

/// Repeats `request` every `interval` until Ctrl+C.
async fn poll(session: Arc<InverterSession>, request: Request, interval: Duration) -> Result<()> {
    if interval.is_zero() {
        bail!("interval must be at least one second");
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    // Set up signal handler for graceful shutdown
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
        }
        let _ = shutdown_tx.send(());
    });

    info!("Polling every {}s, ctrl+c to stop", interval.as_secs());
    Scheduler::new(session, request, interval)
        .start(shutdown_rx)
        .await?;

    info!("Shutdown complete");
    Ok(())
}
