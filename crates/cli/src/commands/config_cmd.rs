//! `pocketline config`: show the process configuration.

use pocketline_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let config_path = AppConfig::config_dir().join("config.toml");

    println!("📱 pocketline Configuration");
    println!("==========================");
    println!("  Config file:     {}", config_path.display());
    println!("  Data dir:        {}", config.data_dir().display());
    println!("  Temperature:     {}", config.temperature);
    println!("  Request timeout: {}s", config.request_timeout_secs);
    println!("  History limit:   {} (new characters)", config.default_history_limit);
    println!(
        "  Delivery:        {}ms first, {}ms per bubble",
        config.delivery.first_delay_ms, config.delivery.step_delay_ms
    );
    println!("  Backup cap:      {} messages per timeline", config.backup.message_cap);
    println!("  Summary scope:   {} messages", config.summary.default_scope);
    println!(
        "  API key:         {}",
        if config.api_key.is_some() { "set (fallback)" } else { "not set" }
    );
    println!(
        "  Model:           {}",
        config.model.as_deref().unwrap_or("(from settings)")
    );

    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, run `pocketline onboard` first");
    }

    Ok(())
}
