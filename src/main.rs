//! Command line control for a Novo curtain motor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use novo_curtain_lib::{CoverState, Curtain, CurtainProtocol, CurtainSettings, PositionPoller};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port, e.g. /dev/ttyUSB0
    #[arg(short, long)]
    port: Option<String>,

    /// Motor bus address (decimal or 0x-prefixed hex)
    #[arg(short, long, value_parser = parse_address)]
    address: Option<u16>,

    /// Motor channel (1-254)
    #[arg(long)]
    channel: Option<u8>,

    /// Response timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Verbose logging (repeat for frame dumps)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Fully open the curtain
    Open,
    /// Fully close the curtain
    Close,
    /// Move to a position, 0 (closed) to 100 (open)
    Set {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        position: u8,
    },
    /// Print the current position
    Position,
    /// Poll the position and print each state change as JSON
    Watch {
        /// Poll interval in seconds (overrides the settings file)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn parse_address(value: &str) -> std::result::Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", value, e))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    // RUST_LOG, when set, takes precedence over -v.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn resolve_settings(args: &Args) -> Result<CurtainSettings> {
    let mut settings = match &args.config {
        Some(path) => CurtainSettings::load_from_file(path)
            .with_context(|| format!("Failed to load settings from {:?}", path))?,
        None => {
            let (Some(port), Some(address), Some(channel)) =
                (&args.port, args.address, args.channel)
            else {
                bail!("--port, --address and --channel are required without --config");
            };
            CurtainSettings::new(port.clone(), address, channel)
        }
    };

    if let Some(port) = &args.port {
        settings.serial_path = port.clone();
    }
    if let Some(address) = args.address {
        settings.address = address;
    }
    if let Some(channel) = args.channel {
        settings.channel = channel;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.response_timeout_ms = timeout_ms;
    }

    settings.validate()?;
    Ok(settings)
}

async fn watch(curtain: Arc<dyn Curtain>, interval: Duration) -> Result<()> {
    let poller = PositionPoller::spawn(curtain, interval);
    let mut state = poller.state();

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current: CoverState = state.borrow_and_update().clone();
                println!("{}", serde_json::to_string(&current)?);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = resolve_settings(&args)?;
    let protocol = CurtainProtocol::open(&settings)
        .with_context(|| format!("Failed to open {}", settings.serial_path))?;
    log::info!(
        "Controlling curtain {}/{} on {}",
        protocol.address(),
        protocol.channel(),
        settings.serial_path
    );

    match args.command {
        Action::Open => Curtain::open(&protocol).await?,
        Action::Close => Curtain::close(&protocol).await?,
        Action::Set { position } => protocol.set_position(position).await?,
        Action::Position => println!("{}", protocol.query_position().await?),
        Action::Watch { interval } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| settings.poll_interval());
            if interval.is_zero() {
                bail!("--interval must be positive");
            }
            watch(Arc::new(protocol), interval).await?;
        }
    }

    Ok(())
}
