//! `pocketline models`: list models offered by the configured endpoint.

use super::{App, CmdResult};
use pocketline_providers::list_models_or_fallback;

pub async fn run() -> CmdResult {
    let app = App::open().await?;
    let mut api = app.store.settings().await.api.clone();
    if !api.has_api_key() {
        if let Some(key) = &app.config.api_key {
            api.api_key = key.clone();
        }
    }

    let provider = app.provider();
    let models = list_models_or_fallback(provider.as_ref(), &api, &app.config.fallback_models).await;

    println!("📋 Models at {}", api.endpoint);
    println!("================\n");
    for model in &models {
        let marker = if *model == api.model { "✅" } else { "  " };
        println!("  {marker} {model}");
    }
    println!("\n  Switch with: pocketline settings set model <name>");

    Ok(())
}
