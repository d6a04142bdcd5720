//! `pocketline settings`: in-app settings (API endpoint, persona, look).

use super::{App, CmdResult};
use clap::Subcommand;
use pocketline_core::settings::AppSettings;

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print the current settings
    Show,

    /// Change one setting
    Set {
        /// endpoint, api_key, model, persona.name, persona.description,
        /// persona.avatar, wallpaper or font
        key: String,
        value: String,
    },
}

pub async fn run(command: SettingsCommand) -> CmdResult {
    let app = App::open().await?;
    match command {
        SettingsCommand::Show => show(&*app.store.settings().await),
        SettingsCommand::Set { key, value } => {
            let mut settings = (*app.store.settings().await).clone();
            apply_setting(&mut settings, &key, &value)?;
            app.store.replace_settings(settings).await?;
            println!("✅ {key} updated");
        }
    }
    Ok(())
}

fn show(settings: &AppSettings) {
    println!("📱 Settings");
    println!("===========");
    println!("  Endpoint:    {}", settings.api.endpoint);
    println!("  API key:     {}", mask_key(&settings.api.api_key));
    println!("  Model:       {}", settings.api.model);
    println!("  Persona:     {}", settings.persona.name);
    if !settings.persona.description.is_empty() {
        println!("  About you:   {}", settings.persona.description);
    }
    println!("  Wallpaper:   {}", settings.wallpaper.as_deref().unwrap_or("-"));
    println!("  Font:        {}", settings.font.as_deref().unwrap_or("-"));
    println!("  Diary pages: {}", settings.user_diaries.len());
}

fn mask_key(key: &str) -> String {
    let key = key.trim();
    if key.is_empty() {
        return "(not set)".into();
    }
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{tail}")
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Apply a `key = value` edit to the settings.
pub fn apply_setting(settings: &mut AppSettings, key: &str, value: &str) -> Result<(), String> {
    match key {
        "endpoint" => settings.api.endpoint = value.trim().trim_end_matches('/').to_string(),
        "api_key" | "key" => settings.api.api_key = value.trim().to_string(),
        "model" => settings.api.model = value.trim().to_string(),
        "persona.name" => {
            let name = value.trim();
            if name.is_empty() {
                return Err("persona name cannot be empty".into());
            }
            settings.persona.name = name.to_string();
        }
        "persona.description" => settings.persona.description = value.to_string(),
        "persona.avatar" => settings.persona.avatar = optional(value),
        "wallpaper" => settings.wallpaper = optional(value),
        "font" => settings.font = optional(value),
        other => return Err(format!("unknown setting '{other}'")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_loses_trailing_slash() {
        let mut s = AppSettings::default();
        apply_setting(&mut s, "endpoint", " https://api.example.com/v1/ ").unwrap();
        assert_eq!(s.api.endpoint, "https://api.example.com/v1");
    }

    #[test]
    fn blank_optional_settings_clear() {
        let mut s = AppSettings::default();
        apply_setting(&mut s, "wallpaper", "rain.png").unwrap();
        assert_eq!(s.wallpaper.as_deref(), Some("rain.png"));
        apply_setting(&mut s, "wallpaper", "  ").unwrap();
        assert!(s.wallpaper.is_none());
    }

    #[test]
    fn rejects_unknown_keys_and_empty_persona() {
        let mut s = AppSettings::default();
        assert!(apply_setting(&mut s, "volume", "11").is_err());
        assert!(apply_setting(&mut s, "persona.name", " ").is_err());
    }

    #[test]
    fn key_is_masked() {
        assert_eq!(mask_key(""), "(not set)");
        assert_eq!(mask_key("sk-abcdef1234"), "****1234");
    }
}
