use std::{fmt::Display, num::ParseIntError, path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand, ValueEnum};
use modbus_master::{consts::BAUD_RATES, Protocol};

#[derive(Parser, Debug)]
#[command(version, about = "Build Modbus request frames and decode responses offline", long_about = None)]
pub struct Cli {
    /// Framing of built frames and expected responses
    #[arg(short, long, value_enum, default_value = "tcp")]
    pub protocol: ProtocolArg,

    /// Slave / unit id
    #[arg(short, long, default_value = "1")]
    pub unit_id: u8,

    /// Device host, shown in status only
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Device TCP port, shown in status only
    #[arg(long, default_value = "502")]
    pub port: u16,

    /// Serial port, shown in status only
    #[arg(long, default_value = "COM1")]
    pub serial_port: String,

    /// Serial baud rate, shown in status only
    #[arg(long, default_value = "9600", value_parser = parse_baud_rate)]
    pub baud_rate: u32,

    /// Transport timeout in ms
    #[arg(short, long, default_value = "2000", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, PartialEq, Clone, Copy, ValueEnum)]
#[value(rename_all = "lower")]
pub enum ProtocolArg {
    Tcp,
    Rtu,
}

impl From<ProtocolArg> for Protocol {
    fn from(value: ProtocolArg) -> Self {
        match value {
            ProtocolArg::Tcp => Protocol::Tcp,
            ProtocolArg::Rtu => Protocol::Rtu,
        }
    }
}

#[derive(Parser, Debug)]
#[command()]
pub struct Interactive {
    #[command(subcommand)]
    pub command: InteractiveCommands,
}

#[derive(Subcommand, Debug)]
pub enum InteractiveCommands {
    /// Build a request frame
    Build(BuildArgs),

    /// Decode a response to the pending request
    Decode(DecodeArgs),

    /// Give up on the pending request, as if the link timed out
    Cancel,

    /// Show configuration and the pending request
    Status,

    /// Export the previously printed table
    Export(ExportArgs),

    /// Set configuration
    Set(SetArgs),

    /// Exit the program
    Exit,
}

impl Display for InteractiveCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractiveCommands::Build(_) => write!(f, "Build"),
            InteractiveCommands::Decode(_) => write!(f, "Decode"),
            InteractiveCommands::Cancel => write!(f, "Cancel"),
            InteractiveCommands::Status => write!(f, "Status"),
            InteractiveCommands::Export(_) => write!(f, "Export"),
            InteractiveCommands::Set(_) => write!(f, "Set"),
            InteractiveCommands::Exit => write!(f, "Exit"),
        }
    }
}

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
pub struct BuildArgs {
    /// Function code, 01 to 06
    pub function: String,

    /// Start address
    #[arg(value_parser = parse_u16)]
    pub address: u16,

    /// Quantity for reads, value for writes (on/off for coils)
    pub argument: Option<String>,

    /// Use this transaction id instead of the next one (TCP only)
    #[arg(long, value_parser = parse_u16)]
    pub transaction_id: Option<u16>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Response bytes in hex, e.g. "00 01 00 00 00 05 01 03 02 00 0A"
    #[arg(required = true)]
    pub bytes: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// The file to write to
    pub filename: PathBuf,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[command(subcommand)]
    pub command: SetCommands,
}

#[derive(Subcommand, Debug)]
pub enum SetCommands {
    /// Set the framing
    Protocol {
        #[arg(value_enum)]
        protocol: ProtocolArg,
    },

    /// Set the unit-id
    UnitId { unit_id: u8 },

    /// Set the next TCP transaction id
    TransactionId {
        #[arg(value_parser = parse_u16)]
        transaction_id: u16,
    },

    /// Set timeout
    Timeout {
        #[arg(value_parser = parse_duration)]
        timeout: Duration,
    },
}

/// Decimal or `0x` prefixed hex.
pub fn parse_u16(input: &str) -> Result<u16, ParseIntError> {
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => input.parse(),
    }
}

fn parse_duration(input: &str) -> Result<Duration, ParseIntError> {
    let ms = input.parse()?;
    Ok(Duration::from_millis(ms))
}

fn parse_baud_rate(input: &str) -> Result<u32, String> {
    let baud_rate: u32 = input.parse().map_err(|e: ParseIntError| e.to_string())?;
    if !BAUD_RATES.contains(&baud_rate) {
        return Err(format!("Baud rate must be one of {BAUD_RATES:?}"));
    }
    Ok(baud_rate)
}
