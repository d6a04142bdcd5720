//! Memory distillation and diary generation.
//!
//! These share the session's request plumbing and busy flag but not the
//! reply segmenter: their answers are single JSON envelopes.

use crate::context::ChatMode;
use crate::context::mode::{Timeline, belongs_to};
use crate::envelope;
use crate::prompts;
use crate::session::ChatSession;
use crate::template::{self, TemplateVars};
use chrono::Utc;
use pocketline_core::character::{Character, DiaryEntry, MemoryCard};
use pocketline_core::error::{ChatError, Result};
use pocketline_core::event::DomainEvent;
use pocketline_core::message::Message;
use pocketline_core::provider::PromptBlock;
use pocketline_core::settings::AppSettings;
use tracing::info;

/// Separator placed between card contents sent to fusion.
pub const FUSION_SEPARATOR: &str = "\n---\n";

const DEFAULT_FUSED_EVENT: &str = "Merged memory";
const DEFAULT_SUMMARY_EVENT: &str = "Conversation summary";

fn transcript(character: &Character, settings: &AppSettings, messages: &[&Message]) -> String {
    messages
        .iter()
        .map(|m| {
            format!(
                "{}: {}",
                character.speaker_label(m.role, settings),
                m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn card_from(env: envelope::SummaryEnvelope, default_event: &str) -> MemoryCard {
    let mut card = MemoryCard::new(
        env.event.unwrap_or_else(|| default_event.to_string()),
        env.summary,
    );
    card.location = env.location;
    card.status = env.status;
    card
}

impl ChatSession {
    fn memory_updated(&self, operation: &str) {
        self.events().publish(DomainEvent::MemoryUpdated {
            character_id: self.character_id().to_string(),
            operation: operation.into(),
            timestamp: Utc::now(),
        });
    }

    /// Distill the last K eligible messages of the current view into a new
    /// memory card. K is the character's summary scope.
    pub async fn summarize(&self) -> Result<MemoryCard> {
        let settings = self.store().settings().await;
        let api = self.api_settings(&settings)?;
        let _guard = self.acquire()?;

        let character = self.snapshot().await?;
        let mode = self.view().mode().unwrap_or(ChatMode::Online);
        let timeline = Timeline::resolve(&character, &mode)?;
        let eligible: Vec<&Message> = timeline
            .messages(&character)
            .unwrap_or_default()
            .iter()
            .filter(|m| m.is_context_eligible() && belongs_to(m, &mode, &timeline))
            .collect();
        if eligible.is_empty() {
            return Err(ChatError::EmptyInput("no messages to summarize".into()).into());
        }

        let scope = match character.furnace.summary_scope {
            0 => self.options().default_summary_scope,
            n => n,
        };
        let recent = &eligible[eligible.len().saturating_sub(scope)..];

        let vars = TemplateVars::new().set("char", character.name.as_str());
        let blocks = vec![
            PromptBlock::system(template::render(prompts::SUMMARY_PROMPT, &vars)),
            PromptBlock::user(transcript(&character, &settings, recent)),
        ];
        let response = self.complete(&api, blocks, "summarize").await?;
        let card = card_from(envelope::parse_summary(&response.content), DEFAULT_SUMMARY_EVENT);

        self.store()
            .update_character(self.character_id(), |c| c.memories.push(card.clone()))
            .await?
            .ok_or_else(|| ChatError::CharacterNotFound(self.character_id().to_string()))?;
        info!(
            character = %self.character_id(),
            messages = recent.len(),
            "Memory card created"
        );
        self.memory_updated("summarize");
        Ok(card)
    }

    /// Flip a card's merge selection. Returns the new state.
    pub async fn toggle_card_selection(&self, card_id: &str) -> Result<bool> {
        self.store()
            .update_character(self.character_id(), |c| {
                c.memories.iter_mut().find(|m| m.id == card_id).map(|m| {
                    m.selected = !m.selected;
                    m.selected
                })
            })
            .await?
            .flatten()
            .ok_or_else(|| ChatError::MemoryCardNotFound(card_id.to_string()).into())
    }

    /// Remove a memory card outright.
    pub async fn delete_card(&self, card_id: &str) -> Result<MemoryCard> {
        self.store()
            .update_character(self.character_id(), |c| {
                let index = c.memories.iter().position(|m| m.id == card_id)?;
                Some(c.memories.remove(index))
            })
            .await?
            .flatten()
            .ok_or_else(|| ChatError::MemoryCardNotFound(card_id.to_string()).into())
    }

    /// Merge every selected card into one. Needs at least two selected.
    pub async fn fuse_selected(&self) -> Result<MemoryCard> {
        let character = self.snapshot().await?;
        let selected: Vec<&MemoryCard> = character.memories.iter().filter(|m| m.selected).collect();
        if selected.len() < 2 {
            return Err(ChatError::NotEnoughCards {
                selected: selected.len(),
            }
            .into());
        }

        let settings = self.store().settings().await;
        let api = self.api_settings(&settings)?;
        let _guard = self.acquire()?;

        let ids: Vec<String> = selected.iter().map(|m| m.id.clone()).collect();
        let joined = selected
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(FUSION_SEPARATOR);

        let vars = TemplateVars::new().set("char", character.name.as_str());
        let blocks = vec![
            PromptBlock::system(template::render(prompts::FUSION_PROMPT, &vars)),
            PromptBlock::user(joined),
        ];
        let response = self.complete(&api, blocks, "fuse").await?;
        let fused = card_from(envelope::parse_summary(&response.content), DEFAULT_FUSED_EVENT);

        self.store()
            .update_character(self.character_id(), |c| {
                c.memories.retain(|m| !ids.contains(&m.id));
                c.memories.push(fused.clone());
            })
            .await?
            .ok_or_else(|| ChatError::CharacterNotFound(self.character_id().to_string()))?;
        info!(character = %self.character_id(), merged = ids.len(), "Memory cards fused");
        self.memory_updated("fuse");
        Ok(fused)
    }

    /// Have the character write a diary entry about recent online chat.
    pub async fn write_diary(&self) -> Result<DiaryEntry> {
        let settings = self.store().settings().await;
        let api = self.api_settings(&settings)?;
        let _guard = self.acquire()?;

        let character = self.snapshot().await?;
        let recent: Vec<&Message> = {
            let online: Vec<&Message> = character
                .messages
                .iter()
                .filter(|m| {
                    m.is_context_eligible() && belongs_to(m, &ChatMode::Online, &Timeline::Main)
                })
                .collect();
            let start = online.len().saturating_sub(character.history_limit);
            online[start..].to_vec()
        };

        let (user, _) = character.user_identity(&settings);
        let vars = TemplateVars::new()
            .set("char", character.name.as_str())
            .set("user", user);
        let mut blocks = vec![PromptBlock::system(template::render(
            prompts::DIARY_PROMPT,
            &vars,
        ))];
        let context = transcript(&character, &settings, &recent);
        if !context.is_empty() {
            blocks.push(PromptBlock::user(context));
        }

        let response = self.complete(&api, blocks, "diary").await?;
        let env = envelope::parse_diary(&response.content);
        let title = env
            .title
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
        let mut entry = DiaryEntry::new(title, env.content);
        entry.mood = env.mood;

        self.store()
            .update_character(self.character_id(), |c| c.diaries.push(entry.clone()))
            .await?
            .ok_or_else(|| ChatError::CharacterNotFound(self.character_id().to_string()))?;
        info!(character = %self.character_id(), "Diary entry written");
        self.memory_updated("diary");
        Ok(entry)
    }
}
