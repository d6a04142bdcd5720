//! Persistence trait: where the two top-level records are kept.

use async_trait::async_trait;
use pocketline_core::character::Character;
use pocketline_core::error::StoreError;
use pocketline_core::settings::AppSettings;

/// A persistence backend for settings and characters.
///
/// `load_*` returns `None` when nothing has been saved yet.
#[async_trait]
pub trait Persistence: Send + Sync {
    fn name(&self) -> &str;

    async fn load_settings(&self) -> Result<Option<AppSettings>, StoreError>;

    async fn save_settings(&self, settings: &AppSettings) -> Result<(), StoreError>;

    async fn load_characters(&self) -> Result<Option<Vec<Character>>, StoreError>;

    async fn save_characters(&self, characters: &[Character]) -> Result<(), StoreError>;
}
