//! `airlink`: command-line client for LAN air conditioners.

mod config;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use airlink_core::constants::DEFAULT_PORT;
use airlink_core::{ParameterName, ParameterSet, ParameterValue};
use airlink_network::UdpTransport;
use airlink_protocol::parse_scan_reply;
use airlink_session::{Callback, SessionHandle};
use config::Config;

#[derive(Debug, Parser)]
#[command(name = "airlink", version, about = "Control air conditioners on the local network")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "airlink.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Poll configured devices and print every parameter update
    Monitor {
        /// Only monitor this device
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Send one scan and list the devices that answer
    Scan {
        /// Target address; the default broadcasts on the local network
        #[arg(long, default_value = "255.255.255.255")]
        address: IpAddr,

        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// How long to collect replies, in milliseconds
        #[arg(long, default_value_t = 3000)]
        window_ms: u64,
    },

    /// Write one parameter and wait until the device reports it
    Set {
        /// Device name from the configuration file
        device: String,

        /// Parameter, by wire name (`SetTem`) or field name (`target_temp`)
        param: ParameterName,

        /// `on`/`off`, a number, or a mode name
        value: ParameterValue,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("Invalid log filter {filter:?} ({e}), using \"info\"");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_tracing(&config.logging.filter);

    match cli.command {
        Command::Monitor { device } => monitor(&config, device.as_deref()).await,
        Command::Scan {
            address,
            port,
            window_ms,
        } => scan(&config, SocketAddr::new(address, port), window_ms).await,
        Command::Set {
            device,
            param,
            value,
            timeout_secs,
        } => set(&config, &device, param, value, timeout_secs).await,
    }
}

async fn monitor(config: &Config, only: Option<&str>) -> Result<()> {
    let devices: Vec<_> = config
        .devices
        .iter()
        .filter(|device| only.is_none_or(|name| device.name == name))
        .collect();
    if devices.is_empty() {
        bail!("no matching devices in configuration");
    }

    let mut sessions = Vec::with_capacity(devices.len());
    for device in devices {
        let transport = UdpTransport::new(config.transport_config());
        let handle = SessionHandle::spawn(transport, config.session_config(device));

        let name = device.name.clone();
        let printer: Arc<Callback<ParameterSet>> = Arc::new(move |params: &ParameterSet| {
            match serde_json::to_string(params) {
                Ok(json) => println!("{name}: {json}"),
                Err(e) => warn!(device = %name, error = %e, "Failed to serialise params"),
            }
        });
        handle.on_params(&printer);

        info!(device = %device.name, address = %device.socket_addr(), "Monitoring");
        sessions.push((handle, printer));
    }

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Stopping");
    for (handle, _printer) in sessions {
        handle.stop().await;
    }
    Ok(())
}

async fn scan(config: &Config, target: SocketAddr, window_ms: u64) -> Result<()> {
    let mut transport_config = config.transport_config();
    transport_config.broadcast = true;
    let transport = UdpTransport::new(transport_config);

    let replies = transport
        .discover(target, Duration::from_millis(window_ms))
        .await
        .with_context(|| format!("scanning {target}"))?;

    let mut found = 0;
    for (reply, from) in replies {
        match parse_scan_reply(&reply, from) {
            Ok(identity) => {
                found += 1;
                println!(
                    "{}\t{}\t{}",
                    identity.address,
                    identity.cid,
                    identity.name.as_deref().unwrap_or("-")
                );
            }
            Err(e) => warn!(%from, error = %e, "Ignoring invalid scan reply"),
        }
    }

    info!(found, "Scan complete");
    Ok(())
}

async fn set(
    config: &Config,
    device: &str,
    param: ParameterName,
    value: ParameterValue,
    timeout_secs: u64,
) -> Result<()> {
    let device = config
        .device(device)
        .with_context(|| format!("unknown device {device}"))?;
    let expected = param.decode(param.encode(value)?);

    let transport = UdpTransport::new(config.transport_config());
    let handle = SessionHandle::spawn(transport, config.session_config(device));
    handle.set_param(param, value).await?;

    let mut latest = handle.latest();
    let applied = tokio::time::timeout(Duration::from_secs(timeout_secs), async {
        loop {
            let current = latest
                .borrow_and_update()
                .as_ref()
                .and_then(|params| params.get(param));
            if current == Some(expected) {
                return true;
            }
            if latest.changed().await.is_err() {
                return false;
            }
        }
    })
    .await
    .unwrap_or(false);

    handle.stop().await;

    if !applied {
        bail!("{} did not report {param} = {expected} within {timeout_secs}s", device.name);
    }
    println!("{}: {param} = {expected}", device.name);
    Ok(())
}
