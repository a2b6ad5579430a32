//! Probe a console's Ristretto server without HomeKit.
//!
//! Usage:
//!   cargo run --bin ristretto-probe -- --host 192.168.1.195
//!
//! Prints system info, the running title, the installed titles with the
//! identifiers the bridge would assign, and the GamePad battery.

use clap::Parser;
use log::info;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use wiiu_bridge::accessory::BatteryStatus;
use wiiu_bridge::catalog::{MemoryTitleStore, TitleCatalog};
use wiiu_bridge::config::{DEFAULT_RISTRETTO_PORT, DeviceConfig};
use wiiu_bridge::ristretto::{ConsoleFacade, CurrentTitle, Reachability, RistrettoClient};

#[derive(Debug, Parser)]
#[command(about = "Dump the state of one Wii U console")]
struct Args {
    /// Console address
    #[arg(long, env = "WIIU_HOST")]
    host: String,

    #[arg(long, env = "WIIU_PORT", default_value_t = DEFAULT_RISTRETTO_PORT)]
    port: u16,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let device = DeviceConfig::new("probe", args.host, args.port);
    let client = match RistrettoClient::for_device(&device, Some(Duration::from_secs(args.timeout))) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let facade = Arc::new(ConsoleFacade::new(client));

    info!("Probing {}", device.address());
    if facade.poll_liveness().await != Reachability::Reachable {
        eprintln!("{} is not responding", device.address());
        return ExitCode::FAILURE;
    }

    let system = facade.get_system_info().await;
    println!("Serial:   {}", system.serial);
    println!("Model:    {}", system.model);
    println!("Firmware: {}", system.firmware_version);

    match facade.get_current_title().await {
        CurrentTitle::Running(id) => println!("Running:  {id}"),
        CurrentTitle::Unknown => println!("Running:  (unknown)"),
    }

    match facade.get_battery_level().await {
        Some(raw) => {
            let status = BatteryStatus::from_raw(raw);
            println!(
                "Battery:  {}%{} (raw {raw})",
                status.level,
                if status.charging { " charging" } else { "" }
            );
        }
        None => println!("Battery:  (unavailable)"),
    }

    let catalog = TitleCatalog::new(Box::new(MemoryTitleStore::new()));
    catalog.load();
    catalog.refresh_from_device(facade.as_ref()).await;
    println!("Input sources:");
    for (slot, source) in catalog.input_sources() {
        println!("  {slot:>3}  {}", source.name());
    }

    ExitCode::SUCCESS
}
