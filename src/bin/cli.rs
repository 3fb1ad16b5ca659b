//! ECI Command-Line Client
//!
//! Connects to a recording device and issues one command sequence.

use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use netstation::{ByteOrderSpec, ClientConfig, EciClient, EventCode, DEFAULT_PORT};
use tracing_subscriber::{fmt, EnvFilter};

/// ECI CLI
#[derive(Parser, Debug)]
#[command(name = "netstation-cli")]
#[command(about = "Send ECI commands to a recording device")]
#[command(version)]
struct Args {
    /// Device address
    #[arg(short, long, default_value = "127.0.0.1")]
    address: String,

    /// Device port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Byte order tag declared at session start (NTEL, UNIX or MAC-)
    #[arg(short, long, value_parser = parse_byte_order)]
    byte_order: Option<ByteOrderSpec>,

    /// Socket read/write timeout in milliseconds (0 = none)
    #[arg(short, long, default_value = "0")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open and close a session
    Ping,

    /// Send an attention command
    Attention,

    /// Send a time synchronization point
    Synch {
        /// Timestamp in milliseconds
        timestamp_ms: i32,
    },

    /// Begin recording, send one trigger, end recording
    Trigger {
        /// Four character event code
        #[arg(value_parser = parse_event_code)]
        code: EventCode,

        /// Timestamp in milliseconds
        timestamp_ms: i32,

        /// Event duration in milliseconds
        #[arg(short, long, default_value = "1")]
        duration_ms: i32,
    },

    /// Record for a while, sending a trigger at a fixed interval
    Record {
        /// Recording length in seconds
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Milliseconds between triggers (at least 1, so timestamps increase)
        #[arg(short, long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: u64,

        /// Four character event code
        #[arg(short, long, default_value = "TICK", value_parser = parse_event_code)]
        code: EventCode,
    },
}

fn parse_event_code(s: &str) -> Result<EventCode, String> {
    EventCode::try_from(s).map_err(|e| e.to_string())
}

fn parse_byte_order(s: &str) -> Result<ByteOrderSpec, String> {
    ByteOrderSpec::try_from(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,netstation=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = ClientConfig::builder()
        .address(&args.address)
        .port(args.port)
        .byte_order(args.byte_order.unwrap_or_default())
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .build();

    tracing::info!("Connecting to {} ({})", config.endpoint(), config.byte_order);

    let mut client: EciClient = EciClient::new();
    if !client.connect_with(&config) {
        tracing::error!("Could not open a session with {}", config.endpoint());
        return ExitCode::FAILURE;
    }

    if let Some(version) = client.protocol_version() {
        tracing::info!("Device protocol version {}", version);
    }

    let succeeded = execute(&mut client, args.command);
    let closed = client.disconnect();

    if succeeded && closed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run the requested command sequence on an open session
fn execute(client: &mut EciClient, command: Commands) -> bool {
    match command {
        Commands::Ping => true,
        Commands::Attention => client.send_attention(),
        Commands::Synch { timestamp_ms } => client.send_synch(timestamp_ms),
        Commands::Trigger {
            code,
            timestamp_ms,
            duration_ms,
        } => {
            if !client.begin_recording() {
                return false;
            }
            let sent = client.send_trigger(code, timestamp_ms, duration_ms);
            client.end_recording() && sent
        }
        Commands::Record {
            seconds,
            interval_ms,
            code,
        } => record(client, Duration::from_secs(seconds), interval_ms, code),
    }
}

fn record(client: &mut EciClient, length: Duration, interval_ms: u64, code: EventCode) -> bool {
    if !client.begin_recording() {
        return false;
    }

    let start = Instant::now();
    let mut sent = 0u64;
    let mut all_sent = client.send_attention() && client.send_synch(0);

    while all_sent && start.elapsed() < length {
        thread::sleep(Duration::from_millis(interval_ms));

        let timestamp_ms = i32::try_from(start.elapsed().as_millis()).unwrap_or(i32::MAX);
        all_sent = client.send_trigger(code, timestamp_ms, 1);
        sent += 1;
    }

    tracing::info!("Sent {} triggers over {:?}", sent, start.elapsed());
    client.end_recording() && all_sent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_options() {
        let args = Args::try_parse_from([
            "netstation-cli",
            "--address",
            "10.0.0.42",
            "--port",
            "1234",
            "--byte-order",
            "UNIX",
            "ping",
        ])
        .unwrap();

        assert_eq!(args.address, "10.0.0.42");
        assert_eq!(args.port, 1234);
        assert_eq!(args.byte_order, Some(ByteOrderSpec::BIG_ENDIAN));
        assert!(matches!(args.command, Commands::Ping));
    }

    #[test]
    fn test_byte_order_must_be_four_bytes() {
        assert!(Args::try_parse_from(["netstation-cli", "--byte-order", "BIG", "ping"]).is_err());
    }

    #[test]
    fn test_parse_trigger() {
        let args =
            Args::try_parse_from(["netstation-cli", "trigger", "STIM", "1000", "-d", "5"]).unwrap();

        match args.command {
            Commands::Trigger {
                code,
                timestamp_ms,
                duration_ms,
            } => {
                assert_eq!(code.as_bytes(), b"STIM");
                assert_eq!(timestamp_ms, 1000);
                assert_eq!(duration_ms, 5);
            }
            _ => panic!("Expected trigger subcommand"),
        }
        assert!(Args::try_parse_from(["netstation-cli", "trigger", "STIMULUS", "1"]).is_err());
    }

    #[test]
    fn test_record_interval_must_be_positive() {
        assert!(
            Args::try_parse_from(["netstation-cli", "record", "--interval-ms", "0"]).is_err()
        );

        let args =
            Args::try_parse_from(["netstation-cli", "record", "--interval-ms", "1"]).unwrap();
        assert!(matches!(args.command, Commands::Record { interval_ms: 1, .. }));
    }
}
