//! Character domain types: the persistent conversational partner.
//!
//! A [`Character`] owns everything that belongs to it: the online timeline,
//! scenarios with their private timelines, memory cards and diaries.
//! Deleting the character drops all of it.
//!
//! Every struct is `#[serde(default)]` so documents saved by older builds
//! rehydrate with defaults for the fields they lack.

use crate::message::{Message, Role};
use crate::settings::AppSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default history cutoff (messages included per request).
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Default number of trailing messages sent to summarization.
pub const DEFAULT_SUMMARY_SCOPE: usize = 30;

/// Placeholders: `{char}`, `{user}`, `{personality}`.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are {char}, texting {user} on your phone.\n\
Personality: {personality}\n\
Stay in character at all times. You are a real person, not an AI.";

/// Placeholders: `{char}`, `{user}`, `{style}`, `{word_count}`.
pub const DEFAULT_OFFLINE_PROMPT: &str = "You are {char}, meeting {user} in person.\n\
Write the scene as immersive prose in a {style} style, about {word_count} words.\n\
Describe actions, surroundings and dialogue from {char}'s side only.";

/// A user identity that overrides the global persona for one character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMask {
    pub name: String,
    pub avatar: Option<String>,
    pub description: String,
}

/// Offline ("face to face") mode configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    pub system_prompt: String,
    pub style: String,
    pub word_count: u32,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_OFFLINE_PROMPT.into(),
            style: "delicate, literary".into(),
            word_count: 300,
        }
    }
}

/// Memory distillation ("furnace") configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FurnaceConfig {
    /// How many trailing messages one summarization reads
    pub summary_scope: usize,
}

impl Default for FurnaceConfig {
    fn default() -> Self {
        Self {
            summary_scope: DEFAULT_SUMMARY_SCOPE,
        }
    }
}

/// A durable distilled memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCard {
    pub id: String,
    pub location: Option<String>,
    pub event: String,
    pub status: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Merge selection; never persisted
    #[serde(skip_serializing)]
    pub selected: bool,
}

impl MemoryCard {
    pub fn new(event: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event: event.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// One-line rendering used in prompts.
    pub fn render_line(&self) -> String {
        let mut line = String::from("- ");
        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            line.push_str(&format!("[{location}] "));
        }
        if !self.event.is_empty() {
            line.push_str(&self.event);
            if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
                line.push_str(&format!(" ({status})"));
            }
            line.push_str(": ");
        }
        line.push_str(&self.content);
        line
    }
}

impl Default for MemoryCard {
    fn default() -> Self {
        Self {
            id: String::new(),
            location: None,
            event: String::new(),
            status: None,
            content: String::new(),
            timestamp: Utc::now(),
            selected: false,
        }
    }
}

/// A diary page, written either by a character or by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaryEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub mood: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DiaryEntry {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            mood: None,
            timestamp: Utc::now(),
        }
    }
}

impl Default for DiaryEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            content: String::new(),
            mood: None,
            timestamp: Utc::now(),
        }
    }
}

/// A theater sub-conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub description: String,
    pub system_prompt: String,
    /// Shares the character's main timeline and durable memory when true
    #[serde(alias = "isConnected")]
    pub connected: bool,
    pub wallpaper: Option<String>,
    /// Private timeline, used only when not connected
    pub messages: Vec<Message>,
    /// Private context memory, used only when not connected
    pub context_memory: String,
}

impl Scenario {
    pub fn new(title: impl Into<String>, system_prompt: impl Into<String>, connected: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            system_prompt: system_prompt.into(),
            connected,
            ..Self::default()
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            description: String::new(),
            system_prompt: String::new(),
            connected: true,
            wallpaper: None,
            messages: Vec::new(),
            context_memory: String::new(),
        }
    }
}

/// A persistent conversational partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub id: String,
    pub name: String,
    /// Display remark shown instead of the name in the chat list
    pub remark: Option<String>,
    pub avatar: Option<String>,

    pub personality: String,
    pub system_prompt: String,
    /// Custom inner-monologue instruction block; built-in one when `None`
    pub inner_monologue_prompt: Option<String>,
    pub show_inner_monologue: bool,
    /// Inject the wall-clock time into online prompts
    pub real_time_aware: bool,

    pub use_mask: bool,
    pub mask: Option<UserMask>,

    /// Durable running summary injected into every prompt
    pub context_memory: String,
    pub history_limit: usize,

    pub memories: Vec<MemoryCard>,
    pub diaries: Vec<DiaryEntry>,
    pub messages: Vec<Message>,
    pub scenarios: Vec<Scenario>,

    pub offline: OfflineConfig,
    pub furnace: FurnaceConfig,

    pub created_at: DateTime<Utc>,
}

impl Character {
    /// Create a new character with default prompts.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name shown in lists: the remark if set, otherwise the name.
    pub fn display_name(&self) -> &str {
        self.remark
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn scenario_mut(&mut self, id: &str) -> Option<&mut Scenario> {
        self.scenarios.iter_mut().find(|s| s.id == id)
    }

    /// The user identity this character sees: the local mask when masking is
    /// on, otherwise the global persona.
    pub fn user_identity<'a>(&'a self, settings: &'a AppSettings) -> (&'a str, &'a str) {
        match (&self.mask, self.use_mask) {
            (Some(mask), true) => (mask.name.as_str(), mask.description.as_str()),
            _ => (
                settings.persona.name.as_str(),
                settings.persona.description.as_str(),
            ),
        }
    }

    /// Speaker label for a message authored in this character's chat.
    pub fn speaker_label<'a>(&'a self, role: Role, settings: &'a AppSettings) -> &'a str {
        match role {
            Role::Model => &self.name,
            Role::User => self.user_identity(settings).0,
            Role::System => "System",
        }
    }
}

impl Default for Character {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            remark: None,
            avatar: None,
            personality: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            inner_monologue_prompt: None,
            show_inner_monologue: false,
            real_time_aware: false,
            use_mask: false,
            mask: None,
            context_memory: String::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            memories: Vec::new(),
            diaries: Vec::new(),
            messages: Vec::new(),
            scenarios: Vec::new(),
            offline: OfflineConfig::default(),
            furnace: FurnaceConfig::default(),
            created_at: Utc::now(),
        }
    }
}
