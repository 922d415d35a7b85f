//! Validate configuration command.

use anyhow::Result;
use quant_config::AppConfig;

/// Loading already validated `config`; print what took effect.
pub async fn run(config: &AppConfig) -> Result<()> {
    println!("Configuration is valid!");
    println!();
    println!("App: {} ({})", config.app.name, config.app.environment);
    println!("Capital: {}", config.app.capital);
    println!("Log level: {}", config.logging.level);
    println!("Max daily loss: {}", config.risk.max_daily_loss);
    println!("Max drawdown: {}", config.risk.max_total_drawdown);
    println!(
        "Scanning {} symbols every {}s",
        config.engine.symbols.len(),
        config.engine.scan_interval_secs
    );
    println!(
        "Enabled strategies: {}",
        config
            .strategies
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Effective configuration:");
    println!("{}", config.to_toml()?);

    Ok(())
}
