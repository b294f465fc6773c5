//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use trailguard_config::load_config;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    trailguard_config::validate(&config)?;

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!(
        "Venues: {}",
        if config.venues.paper_only {
            "paper only".to_string()
        } else {
            config
                .configured_venues()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    println!("Trailing distance: {}%", config.risk.trailing_pct);
    println!("Poll interval: {}s", config.supervisor.poll_interval_secs);
    println!(
        "Task retries: {} attempts, {}s apart",
        config.supervisor.max_attempts, config.supervisor.retry_delay_secs
    );
    println!("Store: {}", config.store.data_dir);

    Ok(())
}
