//! CLI definitions.

pub mod commands;
mod wiring;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use trailguard_core::types::{Side, Venue};

#[derive(Parser)]
#[command(name = "trailguard")]
#[command(author, version, about = "Post-entry risk supervision engine for multi-venue trading")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => Side::Buy,
            SideArg::Sell => Side::Sell,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select and size trades from a candidate file
    Allocate(AllocateArgs),
    /// Place a risk-managed entry order
    Execute(ExecuteArgs),
    /// Run the supervision daemon
    Run,
    /// Flatten every open position on every configured venue
    CloseAll(CloseAllArgs),
    /// Show venue metadata and configuration status
    Venues,
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct AllocateArgs {
    /// JSON file with an array of trade candidates
    #[arg(short = 'f', long)]
    pub candidates: PathBuf,

    /// Capital budget to split
    #[arg(long, default_value = "10000")]
    pub capital: Decimal,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}

#[derive(clap::Args)]
pub struct ExecuteArgs {
    /// Instrument symbol, in the venue's notation
    #[arg(short, long)]
    pub symbol: String,

    /// Venue to execute on
    #[arg(short, long)]
    pub venue: Venue,

    /// Order side
    #[arg(long)]
    pub side: SideArg,

    /// Order quantity
    #[arg(short, long)]
    pub quantity: Decimal,

    /// Reference entry price for protective level computation
    #[arg(short, long)]
    pub price: Decimal,

    /// Requested leverage (clamped to the venue maximum)
    #[arg(long)]
    pub leverage: Option<Decimal>,

    /// JSON file with recent candles for ATR-based levels
    #[arg(long)]
    pub candles: Option<PathBuf>,

    /// Queue a trailing-stop supervisor for the position
    #[arg(long)]
    pub trail: bool,
}

#[derive(clap::Args)]
pub struct CloseAllArgs {
    /// Print what would be closed without placing orders
    #[arg(long)]
    pub dry_run: bool,
}
