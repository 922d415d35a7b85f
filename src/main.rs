//! quantcore CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use quant_config::{load_config_with_overrides, parse_overrides, AppConfig};
use quant_monitor::{setup_logging, LogFormat};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "config/default.toml";

fn load(cli: &Cli) -> Result<AppConfig> {
    let path: Option<PathBuf> = cli
        .config
        .clone()
        .or_else(|| Path::new(DEFAULT_CONFIG).is_file().then(|| PathBuf::from(DEFAULT_CONFIG)));
    let overrides = parse_overrides(&cli.overrides)?;
    load_config_with_overrides(path.as_deref(), &overrides).with_context(|| match &path {
        Some(path) => format!("Invalid configuration in {}", path.display()),
        None => "Invalid configuration".to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    // Setup logging
    let level = cli.log_level.map(|l| l.as_str()).unwrap_or(config.logging.level.as_str());
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        config.logging.format.parse()?
    };
    let _guard = setup_logging(level, format, config.logging.file.as_deref().map(Path::new))?;

    // Execute command
    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, &config).await,
        Commands::Scan(args) => cli::commands::scan::run(args, &config).await,
        Commands::Risk(args) => cli::commands::risk::run(args, &config).await,
        Commands::Strategies => cli::commands::strategies::run(&config).await,
        Commands::ValidateConfig => cli::commands::validate::run(&config).await,
    }
}
