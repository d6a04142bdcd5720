//! Backup export and restore.
//!
//! An export bundles settings and characters into one versioned document.
//! Message lists are capped to their most recent entries so the file stays
//! portable. Restoring overwrites current state wholesale; the caller is
//! responsible for asking the user first.

use crate::store::Store;
use chrono::{DateTime, Utc};
use pocketline_core::character::Character;
use pocketline_core::error::StoreError;
use pocketline_core::message::Message;
use pocketline_core::settings::AppSettings;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const BACKUP_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<AppSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<Vec<Character>>,
}

fn default_version() -> u32 {
    BACKUP_VERSION
}

fn keep_last(messages: &mut Vec<Message>, cap: usize) {
    if messages.len() > cap {
        messages.drain(..messages.len() - cap);
    }
}

impl BackupDocument {
    /// Build a document from snapshots, capping every message list to `cap`.
    pub fn from_snapshot(settings: &AppSettings, characters: &[Character], cap: usize) -> Self {
        let characters = characters
            .iter()
            .cloned()
            .map(|mut c| {
                keep_last(&mut c.messages, cap);
                for scenario in &mut c.scenarios {
                    keep_last(&mut scenario.messages, cap);
                }
                c
            })
            .collect();

        Self {
            version: BACKUP_VERSION,
            exported_at: Utc::now(),
            settings: Some(settings.clone()),
            characters: Some(characters),
        }
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Encode {
            what: "backup".into(),
            reason: e.to_string(),
        })
    }
}

/// Parse and minimally validate a backup file.
///
/// The document must be a JSON object carrying `settings` or `characters`.
/// Characters missing sub-structures are backfilled with defaults.
pub fn parse_backup(text: &str) -> Result<BackupDocument, StoreError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| StoreError::InvalidBackup(format!("not valid JSON: {e}")))?;

    let Some(object) = value.as_object() else {
        return Err(StoreError::InvalidBackup("expected a JSON object".into()));
    };
    if !object.contains_key("settings") && !object.contains_key("characters") {
        return Err(StoreError::InvalidBackup(
            "document has neither settings nor characters".into(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| StoreError::InvalidBackup(format!("unexpected structure: {e}")))
}

impl Store {
    /// Export current state.
    pub async fn export(&self, message_cap: usize) -> BackupDocument {
        let settings = self.settings().await;
        let characters = self.characters().await;
        BackupDocument::from_snapshot(&settings, &characters, message_cap)
    }

    /// Overwrite current state with a parsed backup.
    ///
    /// Absent `characters` leaves an empty collection; absent `settings`
    /// leaves the current settings untouched.
    ///
    /// Settings are written first. If the characters then fail to save, the
    /// previous settings are put back so a failed restore changes nothing.
    pub async fn restore(&self, document: BackupDocument) -> Result<(), StoreError> {
        let characters = document.characters.unwrap_or_default();
        let count = characters.len();
        let previous = match document.settings {
            Some(settings) => {
                let previous = self.settings().await;
                self.replace_settings(settings).await?;
                Some(previous)
            }
            None => None,
        };
        if let Err(e) = self.replace_characters(characters).await {
            if let Some(previous) = previous {
                if let Err(rollback) = self.replace_settings((*previous).clone()).await {
                    warn!(error = %rollback, "Could not roll back settings after a failed restore");
                }
            }
            return Err(e);
        }
        info!(characters = count, version = document.version, "Backup restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Persistence;
    use crate::in_memory::InMemoryBackend;
    use async_trait::async_trait;
    use pocketline_core::character::Scenario;
    use pocketline_core::message::ModeTag;
    use std::sync::Arc;

    fn chatty_character(n: usize) -> Character {
        let mut c = Character::new("Lin");
        for i in 0..n {
            c.messages.push(Message::user(format!("msg {i}"), ModeTag::Online));
        }
        let mut s = Scenario::new("Cafe", "", false);
        for i in 0..n {
            s.messages.push(Message::user(format!("scene {i}"), ModeTag::Theater));
        }
        c.scenarios.push(s);
        c
    }

    #[test]
    fn export_caps_message_lists() {
        let doc = BackupDocument::from_snapshot(&AppSettings::default(), &[chatty_character(80)], 50);
        let c = &doc.characters.as_ref().unwrap()[0];
        assert_eq!(c.messages.len(), 50);
        assert_eq!(c.messages[0].content, "msg 30");
        assert_eq!(c.messages[49].content, "msg 79");
        assert_eq!(c.scenarios[0].messages.len(), 50);
    }

    #[test]
    fn short_lists_are_untouched() {
        let doc = BackupDocument::from_snapshot(&AppSettings::default(), &[chatty_character(3)], 50);
        assert_eq!(doc.characters.unwrap()[0].messages.len(), 3);
    }

    #[test]
    fn rejects_documents_without_known_fields() {
        assert!(matches!(
            parse_backup(r#"{"version":1}"#),
            Err(StoreError::InvalidBackup(_))
        ));
        assert!(matches!(parse_backup("[1,2]"), Err(StoreError::InvalidBackup(_))));
        assert!(matches!(parse_backup("not json"), Err(StoreError::InvalidBackup(_))));
    }

    #[test]
    fn backfills_missing_character_sub_structures() {
        let doc = parse_backup(r#"{"characters":[{"id":"c1","name":"Lin"}]}"#).unwrap();
        let c = &doc.characters.unwrap()[0];
        assert!(c.messages.is_empty());
        assert!(c.scenarios.is_empty());
        assert!(c.memories.is_empty());
        assert!(c.diaries.is_empty());
        assert_eq!(c.furnace.summary_scope, 30);
        assert!(!c.offline.system_prompt.is_empty());
    }

    #[tokio::test]
    async fn restore_without_characters_empties_collection() {
        let store = Store::open(Arc::new(InMemoryBackend::new())).await.unwrap();
        store.insert_character(Character::new("Lin")).await.unwrap();
        store
            .update_settings(|s| s.persona.name = "Kept".into())
            .await
            .unwrap();

        let doc = parse_backup(r#"{"settings":{"font":"mono"}}"#).unwrap();
        store.restore(doc).await.unwrap();

        assert!(store.characters().await.is_empty());
        assert_eq!(store.settings().await.font.as_deref(), Some("mono"));
    }

    #[tokio::test]
    async fn restore_without_settings_keeps_settings() {
        let store = Store::open(Arc::new(InMemoryBackend::new())).await.unwrap();
        store
            .update_settings(|s| s.persona.name = "Kept".into())
            .await
            .unwrap();

        let doc = parse_backup(r#"{"characters":[{"id":"c9","name":"Ada"}]}"#).unwrap();
        store.restore(doc).await.unwrap();

        assert_eq!(store.settings().await.persona.name, "Kept");
        assert_eq!(store.characters().await[0].name, "Ada");
    }

    #[tokio::test]
    async fn export_then_restore_keeps_characters() {
        let store = Store::open(Arc::new(InMemoryBackend::new())).await.unwrap();
        store.insert_character(chatty_character(5)).await.unwrap();
        let json = store.export(50).await.to_json().unwrap();

        let other = Store::open(Arc::new(InMemoryBackend::new())).await.unwrap();
        other.restore(parse_backup(&json).unwrap()).await.unwrap();
        assert_eq!(other.characters().await[0].messages.len(), 5);
    }

    /// Starts with one character named Lin. Character saves always fail;
    /// settings saves fail unless `settings_ok` is set.
    struct CharactersReadOnly {
        settings_ok: bool,
    }

    #[async_trait]
    impl Persistence for CharactersReadOnly {
        fn name(&self) -> &str {
            "characters_read_only"
        }
        async fn load_settings(&self) -> Result<Option<AppSettings>, StoreError> {
            Ok(None)
        }
        async fn save_settings(&self, _: &AppSettings) -> Result<(), StoreError> {
            if self.settings_ok {
                Ok(())
            } else {
                Err(StoreError::Storage("disk full".into()))
            }
        }
        async fn load_characters(&self) -> Result<Option<Vec<Character>>, StoreError> {
            Ok(Some(vec![Character::new("Lin")]))
        }
        async fn save_characters(&self, _: &[Character]) -> Result<(), StoreError> {
            Err(StoreError::Storage("disk full".into()))
        }
    }

    const FULL_BACKUP: &str =
        r#"{"settings":{"persona":{"name":"Restored"}},"characters":[{"id":"c9","name":"Ada"}]}"#;

    #[tokio::test]
    async fn failed_settings_save_leaves_characters_alone() {
        let backend = CharactersReadOnly { settings_ok: false };
        let store = Store::open(Arc::new(backend)).await.unwrap();

        assert!(store.restore(parse_backup(FULL_BACKUP).unwrap()).await.is_err());
        assert_eq!(store.characters().await[0].name, "Lin");
        assert_eq!(store.settings().await.persona.name, "Me");
    }

    #[tokio::test]
    async fn failed_character_save_rolls_settings_back() {
        let backend = CharactersReadOnly { settings_ok: true };
        let store = Store::open(Arc::new(backend)).await.unwrap();

        assert!(store.restore(parse_backup(FULL_BACKUP).unwrap()).await.is_err());
        assert_eq!(store.characters().await[0].name, "Lin");
        assert_eq!(store.settings().await.persona.name, "Me");
    }
}
