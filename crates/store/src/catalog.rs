//! Character, scenario and user-diary lifecycle.

use crate::store::Store;
use pocketline_core::character::{Character, DiaryEntry, Scenario};
use pocketline_core::error::StoreError;
use tracing::info;

impl Store {
    /// Create and persist a character. Returns the stored record.
    pub async fn create_character(
        &self,
        name: &str,
        history_limit: usize,
    ) -> Result<Character, StoreError> {
        let mut character = Character::new(name.trim());
        character.history_limit = history_limit;
        self.insert_character(character.clone()).await?;
        info!(character = %character.id, name = %character.name, "Character created");
        Ok(character)
    }

    /// Attach a scenario to a character. `None` when the character is unknown.
    pub async fn add_scenario(
        &self,
        character_id: &str,
        scenario: Scenario,
    ) -> Result<Option<Scenario>, StoreError> {
        let stored = scenario.clone();
        Ok(self
            .update_character(character_id, |c| c.scenarios.push(scenario))
            .await?
            .map(|_| stored))
    }

    /// Remove a scenario and its private timeline. Returns whether it existed.
    ///
    /// Messages a connected scenario left in the main timeline stay there.
    pub async fn remove_scenario(
        &self,
        character_id: &str,
        scenario_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .update_character(character_id, |c| {
                let before = c.scenarios.len();
                c.scenarios.retain(|s| s.id != scenario_id);
                c.scenarios.len() != before
            })
            .await?
            .unwrap_or(false))
    }

    /// Append a page to the user's own diary.
    pub async fn add_user_diary(&self, entry: DiaryEntry) -> Result<(), StoreError> {
        self.update_settings(|s| s.user_diaries.push(entry)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryBackend;
    use std::sync::Arc;

    async fn store() -> Store {
        Store::open(Arc::new(InMemoryBackend::new())).await.unwrap()
    }

    #[tokio::test]
    async fn created_character_uses_given_limit() {
        let store = store().await;
        let c = store.create_character("  Lin ", 12).await.unwrap();
        assert_eq!(c.name, "Lin");
        assert_eq!(store.character(&c.id).await.unwrap().history_limit, 12);
    }

    #[tokio::test]
    async fn scenarios_are_added_and_removed() {
        let store = store().await;
        let c = store.create_character("Lin", 20).await.unwrap();
        let s = store
            .add_scenario(&c.id, Scenario::new("Cafe", "", false))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.character(&c.id).await.unwrap().scenarios.len(), 1);
        assert!(store.remove_scenario(&c.id, &s.id).await.unwrap());
        assert!(!store.remove_scenario(&c.id, &s.id).await.unwrap());
        assert!(store
            .add_scenario("nobody", Scenario::new("X", "", true))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn user_diary_is_kept_in_settings() {
        let store = store().await;
        store
            .add_user_diary(DiaryEntry::new("Monday", "Long shift."))
            .await
            .unwrap();
        assert_eq!(store.settings().await.user_diaries[0].title, "Monday");
    }
}
