//! Mock Device Binary
//!
//! Emulates an ECI recording device on a TCP port.

use std::thread;

use clap::Parser;
use netstation::network::MockDevice;
use netstation::DEFAULT_PORT;
use tracing_subscriber::{fmt, EnvFilter};

/// ECI Mock Device
#[derive(Parser, Debug)]
#[command(name = "netstation-mock")]
#[command(about = "Emulated ECI recording device for testing clients")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    listen: String,

    /// Protocol version reported to clients
    #[arg(short, long, default_value = "1")]
    protocol_version: u8,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,netstation=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("netstation mock device v{}", netstation::VERSION);

    let device = match MockDevice::bind(&args.listen) {
        Ok(d) => d.with_version(args.protocol_version),
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    let commands = device.commands();
    thread::spawn(move || {
        for command in commands.iter() {
            tracing::info!("{:?}", command);
        }
    });

    if let Err(e) = device.run() {
        tracing::error!("Device error: {}", e);
        std::process::exit(1);
    }
}
