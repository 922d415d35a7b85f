//! List strategies command.

use anyhow::Result;
use quant_config::AppConfig;
use quant_strategies::StrategyRegistry;

pub async fn run(config: &AppConfig) -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("{:<20} {:<26} {:<9} DESCRIPTION", "ID", "NAME", "STATUS");
    for info in registry.list() {
        let configured = config.strategies.iter().find(|s| s.id == info.id);
        let status = match configured {
            Some(s) if s.enabled => "enabled",
            Some(_) => "disabled",
            None => "unlisted",
        };
        println!("{:<20} {:<26} {:<9} {}", info.id, info.name, status, info.description);

        match configured.filter(|s| !s.params.is_null()) {
            Some(s) => println!("{:>20} params:   {}", "", s.params),
            None => println!("{:>20} defaults: {}", "", info.default_config),
        }
    }

    Ok(())
}
