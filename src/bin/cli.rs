//! Payterm CLI - terminal diagnostics from the command line
//!
//! Lists channel addresses and runs device-check / card-inquiry
//! round-trips against a connected terminal.

use anyhow::Context;
use clap::{Parser, Subcommand};
use payterm_core::{
    build_card_inquiry_request, build_device_check_request, decode_response, list_ports,
    LinkConfig, ModuleStatus, ResponsePayload, TerminalLink,
};

/// Payterm CLI
#[derive(Parser, Debug)]
#[command(
    name = "payterm",
    version,
    about = "TL3600 payment terminal diagnostics",
    long_about = None
)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    ListPorts,

    /// Run a device self-check round-trip
    Check {
        /// Serial port name (e.g., COM3, /dev/ttyUSB0)
        #[arg(short, long)]
        port: String,

        /// Baud rate override
        #[arg(short, long)]
        baud: Option<u32>,
    },

    /// Query the presented card
    Inquiry {
        /// Serial port name (e.g., COM3, /dev/ttyUSB0)
        #[arg(short, long)]
        port: String,

        /// Baud rate override
        #[arg(short, long)]
        baud: Option<u32>,
    },
}

fn status_label(status: ModuleStatus) -> &'static str {
    match status {
        ModuleStatus::Normal => "ok",
        ModuleStatus::Faulted => "FAULT",
        ModuleStatus::Unknown(_) => "unknown",
    }
}

async fn round_trip(
    port: &str,
    baud: Option<u32>,
    config: LinkConfig,
    frame: Vec<u8>,
) -> anyhow::Result<()> {
    let link = TerminalLink::connect(port, baud, config)
        .await
        .with_context(|| format!("connecting to {port}"))?;

    let response = link
        .send_packet(&frame, true)
        .await
        .context("terminal exchange failed")?
        .context("terminal sent no response")?;

    match decode_response(&response)? {
        ResponsePayload::DeviceCheck(check) => {
            println!("card reader: {}", status_label(check.card_reader));
            println!("printer:     {}", status_label(check.printer));
            println!("display:     {}", status_label(check.display));
            println!("network:     {}", status_label(check.network));
            if !check.all_normal() {
                anyhow::bail!("device reports a faulted module");
            }
        }
        ResponsePayload::CardInquiry(card) => {
            println!("card:    {}", card.card_number);
            println!("type:    {}", card.card_type);
            println!("balance: {}", card.card_balance);
            println!("last:    {} ({})", card.last_transaction_amount, card.last_transaction_datetime);
        }
        other => anyhow::bail!("unexpected response: {other:?}"),
    }

    link.disconnect().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::ListPorts => {
            let ports = list_ports().context("enumerating serial ports")?;
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                match port.description {
                    Some(desc) => println!("{}  {}", port.name, desc),
                    None => println!("{}", port.name),
                }
            }
            Ok(())
        }
        Commands::Check { port, baud } => {
            let config = LinkConfig::load().unwrap_or_default();
            let frame = build_device_check_request(&config.terminal_id)?;
            round_trip(&port, baud, config, frame).await
        }
        Commands::Inquiry { port, baud } => {
            let config = LinkConfig::load().unwrap_or_default();
            let frame = build_card_inquiry_request(&config.terminal_id)?;
            round_trip(&port, baud, config, frame).await
        }
    }
}
