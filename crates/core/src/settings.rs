//! Process-wide in-app settings: API access, appearance, the user's persona.

use crate::character::DiaryEntry;
use serde::{Deserialize, Serialize};

/// Completion endpoint access.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            model: "gpt-4o-mini".into(),
        }
    }
}

impl ApiSettings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("endpoint", &self.endpoint)
            .field(
                "api_key",
                &if self.has_api_key() { "[REDACTED]" } else { "None" },
            )
            .field("model", &self.model)
            .finish()
    }
}

/// The user's own global identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalPersona {
    pub name: String,
    pub avatar: Option<String>,
    pub description: String,
}

impl Default for GlobalPersona {
    fn default() -> Self {
        Self {
            name: "Me".into(),
            avatar: None,
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub api: ApiSettings,
    pub wallpaper: Option<String>,
    pub font: Option<String>,
    pub persona: GlobalPersona,
    /// The user's own diary pages
    pub user_diaries: Vec<DiaryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let api = ApiSettings {
            api_key: "sk-secret".into(),
            ..ApiSettings::default()
        };
        let out = format!("{api:?}");
        assert!(!out.contains("sk-secret"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn older_settings_backfill() {
        let s: AppSettings = serde_json::from_str(r#"{"api":{"api_key":"k"}}"#).unwrap();
        assert_eq!(s.api.api_key, "k");
        assert_eq!(s.api.model, ApiSettings::default().model);
        assert_eq!(s.persona.name, "Me");
    }
}
