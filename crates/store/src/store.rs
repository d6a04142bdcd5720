//! The single owner of settings and characters.
//!
//! Readers take an `Arc` snapshot that never changes underneath them.
//! Writers build a new structure and swap it in after the backend has
//! accepted it; the write lock is held across the save so writes are
//! serialized and a failed save leaves the previous state in place.

use crate::backend::Persistence;
use pocketline_core::character::Character;
use pocketline_core::error::StoreError;
use pocketline_core::settings::AppSettings;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub struct Store {
    backend: Arc<dyn Persistence>,
    settings: RwLock<Arc<AppSettings>>,
    characters: RwLock<Arc<Vec<Character>>>,
}

impl Store {
    /// Rehydrate both records from the backend, defaulting whatever is absent.
    pub async fn open(backend: Arc<dyn Persistence>) -> Result<Self, StoreError> {
        let settings = backend.load_settings().await?.unwrap_or_default();
        let characters = backend.load_characters().await?.unwrap_or_default();
        info!(
            backend = backend.name(),
            characters = characters.len(),
            "Store opened"
        );
        Ok(Self {
            backend,
            settings: RwLock::new(Arc::new(settings)),
            characters: RwLock::new(Arc::new(characters)),
        })
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub async fn settings(&self) -> Arc<AppSettings> {
        self.settings.read().await.clone()
    }

    pub async fn characters(&self) -> Arc<Vec<Character>> {
        self.characters.read().await.clone()
    }

    pub async fn character(&self, id: &str) -> Option<Character> {
        self.characters
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    // ── Settings writes ────────────────────────────────────────────────

    pub async fn replace_settings(&self, settings: AppSettings) -> Result<(), StoreError> {
        let mut guard = self.settings.write().await;
        self.backend.save_settings(&settings).await?;
        *guard = Arc::new(settings);
        Ok(())
    }

    pub async fn update_settings<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut AppSettings),
    {
        let mut guard = self.settings.write().await;
        let mut next = (**guard).clone();
        f(&mut next);
        self.backend.save_settings(&next).await?;
        *guard = Arc::new(next);
        Ok(())
    }

    // ── Character writes ───────────────────────────────────────────────

    pub async fn replace_characters(&self, characters: Vec<Character>) -> Result<(), StoreError> {
        let mut guard = self.characters.write().await;
        self.backend.save_characters(&characters).await?;
        *guard = Arc::new(characters);
        Ok(())
    }

    pub async fn insert_character(&self, character: Character) -> Result<(), StoreError> {
        let mut guard = self.characters.write().await;
        let mut next = (**guard).clone();
        next.push(character);
        self.backend.save_characters(&next).await?;
        *guard = Arc::new(next);
        Ok(())
    }

    /// Remove a character and everything it owns. Returns whether it existed.
    pub async fn delete_character(&self, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.characters.write().await;
        if !guard.iter().any(|c| c.id == id) {
            return Ok(false);
        }
        let next: Vec<Character> = guard.iter().filter(|c| c.id != id).cloned().collect();
        self.backend.save_characters(&next).await?;
        *guard = Arc::new(next);
        debug!(character = %id, "Character deleted");
        Ok(true)
    }

    /// Clone-modify-replace one character.
    ///
    /// Returns `None` without writing when the character does not exist.
    pub async fn update_character<F, R>(&self, id: &str, f: F) -> Result<Option<R>, StoreError>
    where
        F: FnOnce(&mut Character) -> R,
    {
        let mut guard = self.characters.write().await;
        let Some(index) = guard.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let mut next = (**guard).clone();
        let out = f(&mut next[index]);
        self.backend.save_characters(&next).await?;
        *guard = Arc::new(next);
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryBackend;
    use async_trait::async_trait;

    async fn empty_store() -> (Store, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Store::open(backend.clone()).await.unwrap();
        (store, backend)
    }

    #[tokio::test]
    async fn open_defaults_missing_records() {
        let (store, _) = empty_store().await;
        assert!(store.characters().await.is_empty());
        assert_eq!(store.settings().await.persona.name, "Me");
    }

    #[tokio::test]
    async fn snapshots_do_not_see_later_writes() {
        let (store, _) = empty_store().await;
        let c = Character::new("Lin");
        let id = c.id.clone();
        store.insert_character(c).await.unwrap();

        let before = store.characters().await;
        store
            .update_character(&id, |c| c.name = "Renamed".into())
            .await
            .unwrap();

        assert_eq!(before[0].name, "Lin");
        assert_eq!(store.character(&id).await.unwrap().name, "Renamed");
    }

    #[tokio::test]
    async fn update_missing_character_writes_nothing() {
        let (store, backend) = empty_store().await;
        let out = store.update_character("nope", |_| ()).await.unwrap();
        assert!(out.is_none());
        assert_eq!(backend.writes(), 0);
    }

    #[tokio::test]
    async fn delete_cascades_whole_record() {
        let (store, backend) = empty_store().await;
        let mut c = Character::new("Lin");
        c.scenarios
            .push(pocketline_core::character::Scenario::new("Cafe", "", false));
        let id = c.id.clone();
        store.insert_character(c).await.unwrap();

        assert!(store.delete_character(&id).await.unwrap());
        assert!(!store.delete_character(&id).await.unwrap());
        assert!(store.character(&id).await.is_none());
        let saved = backend.load_characters().await.unwrap().unwrap();
        assert!(saved.is_empty());
    }

    struct FailingBackend;

    #[async_trait]
    impl Persistence for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }
        async fn load_settings(&self) -> Result<Option<AppSettings>, StoreError> {
            Ok(None)
        }
        async fn save_settings(&self, _: &AppSettings) -> Result<(), StoreError> {
            Err(StoreError::Storage("disk full".into()))
        }
        async fn load_characters(&self) -> Result<Option<Vec<Character>>, StoreError> {
            Ok(None)
        }
        async fn save_characters(&self, _: &[Character]) -> Result<(), StoreError> {
            Err(StoreError::Storage("disk full".into()))
        }
    }

    #[tokio::test]
    async fn failed_save_keeps_previous_state() {
        let store = Store::open(Arc::new(FailingBackend)).await.unwrap();
        assert!(store.insert_character(Character::new("Lin")).await.is_err());
        assert!(store.characters().await.is_empty());

        let err = store
            .update_settings(|s| s.persona.name = "Changed".into())
            .await;
        assert!(err.is_err());
        assert_eq!(store.settings().await.persona.name, "Me");
    }
}
