use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use wiiu_bridge::config::{self, Config};
use wiiu_bridge::error::{BridgeError, Result};
use wiiu_bridge::instance_lock::InstanceLock;
use wiiu_bridge::platform::{LoggingHost, WiiUPlatform};

/// Headless bridge exposing Wii U consoles as HomeKit televisions.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Platform config file (JSON)
    #[arg(short, long, env = "WIIU_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for per-device title caches
    #[arg(long, env = "WIIU_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Liveness poll interval in seconds
    #[arg(long, env = "WIIU_POLL_INTERVAL_SECS")]
    poll_interval: Option<u64>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(interval) = args.poll_interval {
        config.poll_interval_secs = interval;
    }
    config.validate()?;
    if config.devices.is_empty() {
        return Err(BridgeError::Config(
            "no devices configured (use --config or WIIU_HOST)".to_string(),
        ));
    }
    Ok(config)
}

async fn run(config: Config) -> Result<()> {
    info!("Configuration loaded:");
    info!("  Platform: {}", config.platform);
    info!("  Poll interval: {}s", config.poll_interval_secs);
    info!("  Cache dir: {}", config.cache_dir().display());
    for device in &config.devices {
        info!("  Device: {} at {}", device.name, device.address());
    }

    // Held until exit so no other bridge rewrites these title caches
    let _locks = config
        .devices
        .iter()
        .map(|device| InstanceLock::acquire(&device.cache_key()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let platform = Arc::new(WiiUPlatform::new(config, Arc::new(LoggingHost)));
    let televisions = platform.discover_devices().await;
    if televisions.is_empty() {
        return Err(BridgeError::Config(
            "none of the configured devices could be started".to_string(),
        ));
    }

    info!("Wii U bridge is running");
    info!("  - {} accessory(ies) ready", televisions.len());
    info!("  - Press Ctrl+C to exit");

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    platform.shutdown();
    info!("Wii U bridge stopped");
    Ok(())
}

fn main() -> ExitCode {
    // Before any runtime threads exist
    config::load_dotenv();
    init_logger();
    info!("Starting Wii U bridge");

    let args = Args::parse();
    let result = load_config(&args).and_then(|config| {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(run(config))
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
