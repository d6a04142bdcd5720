//! File-based persistence: one pretty-printed JSON document per record.
//!
//! Storage location: `<data_dir>/settings.json` and `<data_dir>/characters.json`.
//! The directory is created on first write. Documents are decoded with
//! serde defaults, so files written by older builds load with every missing
//! field backfilled.

use crate::backend::Persistence;
use async_trait::async_trait;
use pocketline_core::character::Character;
use pocketline_core::error::StoreError;
use pocketline_core::settings::AppSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SETTINGS_FILE: &str = "settings.json";
pub const CHARACTERS_FILE: &str = "characters.json";

/// A JSON-file persistence backend rooted at a data directory.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>, StoreError> {
        let path = self.dir.join(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let value = serde_json::from_str(&content).map_err(|e| {
            StoreError::Storage(format!("Failed to decode {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded document");
        Ok(Some(value))
    }

    async fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoreError::Storage(format!("Failed to create data directory: {e}"))
        })?;

        let content = serde_json::to_string_pretty(value).map_err(|e| StoreError::Encode {
            what: file.into(),
            reason: e.to_string(),
        })?;

        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to replace {}: {e}", path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl Persistence for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn load_settings(&self) -> Result<Option<AppSettings>, StoreError> {
        self.read(SETTINGS_FILE).await
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StoreError> {
        self.write(SETTINGS_FILE, settings).await
    }

    async fn load_characters(&self) -> Result<Option<Vec<Character>>, StoreError> {
        self.read(CHARACTERS_FILE).await
    }

    async fn save_characters(&self, characters: &[Character]) -> Result<(), StoreError> {
        self.write(CHARACTERS_FILE, characters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketline_core::message::{Message, ModeTag};

    #[tokio::test]
    async fn missing_files_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("nested"));
        assert!(backend.load_settings().await.unwrap().is_none());
        assert!(backend.load_characters().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn characters_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Character::new("Lin");
        c.messages.push(Message::user("hello", ModeTag::Online));

        FileBackend::new(dir.path())
            .save_characters(&[c.clone()])
            .await
            .unwrap();

        let loaded = FileBackend::new(dir.path())
            .load_characters()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, c.id);
        assert_eq!(loaded[0].messages[0].content, "hello");
    }

    #[tokio::test]
    async fn old_documents_are_backfilled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CHARACTERS_FILE),
            r#"[{"id":"c1","name":"Lin","messages":[]}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), r#"{"font":"serif"}"#).unwrap();

        let backend = FileBackend::new(dir.path());
        let chars = backend.load_characters().await.unwrap().unwrap();
        assert_eq!(chars[0].history_limit, 20);
        assert_eq!(chars[0].offline.word_count, 300);

        let settings = backend.load_settings().await.unwrap().unwrap();
        assert_eq!(settings.font.as_deref(), Some("serif"));
        assert_eq!(settings.persona.name, "Me");
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        let err = FileBackend::new(dir.path()).load_settings().await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }
}
