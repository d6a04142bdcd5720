//! In-memory backend for tests and ephemeral sessions.

use crate::backend::Persistence;
use async_trait::async_trait;
use pocketline_core::character::Character;
use pocketline_core::error::StoreError;
use pocketline_core::settings::AppSettings;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Keeps the last saved documents in memory and counts writes.
#[derive(Default)]
pub struct InMemoryBackend {
    settings: Arc<RwLock<Option<AppSettings>>>,
    characters: Arc<RwLock<Option<Vec<Character>>>>,
    writes: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from already-saved documents.
    pub fn seeded(settings: AppSettings, characters: Vec<Character>) -> Self {
        Self {
            settings: Arc::new(RwLock::new(Some(settings))),
            characters: Arc::new(RwLock::new(Some(characters))),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of save calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Persistence for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load_settings(&self) -> Result<Option<AppSettings>, StoreError> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StoreError> {
        *self.settings.write().await = Some(settings.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_characters(&self) -> Result<Option<Vec<Character>>, StoreError> {
        Ok(self.characters.read().await.clone())
    }

    async fn save_characters(&self, characters: &[Character]) -> Result<(), StoreError> {
        *self.characters.write().await = Some(characters.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
