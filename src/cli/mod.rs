//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quantcore")]
#[command(author, version, about = "Quantitative trading core: signal scans, risk gates and backtests")]
pub struct Cli {
    /// Configuration file path (defaults to config/default.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level; overrides the configured one
    #[arg(short, long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration override, e.g. --set risk.max_daily_loss=-0.03 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    pub overrides: Vec<String>,

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
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Backtest strategies on one symbol
    Backtest(BacktestArgs),
    /// Scan the configured symbols for signals
    Scan(ScanArgs),
    /// Replay a backtest's trades through the risk manager
    Risk(RiskArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Symbol to backtest
    #[arg(short = 'S', long, default_value = "SPY")]
    pub symbol: String,

    /// Number of most recent bars to replay
    #[arg(short, long, default_value_t = 500)]
    pub days: usize,

    /// Only this strategy (default: every enabled strategy)
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save results to file (JSON)
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write the first result's equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Scan regardless of market hours
    #[arg(long)]
    pub ignore_hours: bool,

    /// Override the configured scan interval
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Stop after this many seconds (default: until Ctrl-C)
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

#[derive(clap::Args)]
pub struct RiskArgs {
    /// Symbol whose backtest trades feed the risk manager
    #[arg(short = 'S', long, default_value = "SPY")]
    pub symbol: String,

    #[arg(short, long, default_value_t = 500)]
    pub days: usize,

    /// Strategy producing the trades
    #[arg(short, long, default_value = "mean_reversion")]
    pub strategy: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}
