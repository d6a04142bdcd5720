//! Timeline message domain types.
//!
//! Every chat mode shares one message shape. Messages are tagged with the
//! mode they were written in so the context assembler can slice a single
//! timeline into per-mode histories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text shown in place of a recalled message.
pub const RECALL_PLACEHOLDER: &str = "This message was recalled";

/// The role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person holding the phone
    User,
    /// The character, as voiced by the model
    #[serde(alias = "assistant")]
    Model,
    /// App-generated notices (nudges, departures)
    System,
}

/// Which conversational mode a message was written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeTag {
    /// Texting on the phone
    #[default]
    Online,
    /// Face-to-face prose roleplay
    Offline,
    /// Inside a scenario ("theater")
    Theater,
}

/// A reference to an earlier message the user is replying to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRef {
    pub message_id: String,
    pub snippet: String,
    pub speaker: String,
}

/// A single timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,

    pub role: Role,

    /// What the bubble displays. Replaced by [`RECALL_PLACEHOLDER`] on recall.
    pub content: String,

    /// Private thoughts attached to a model turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_thought: Option<String>,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub mode: ModeTag,

    /// Owning scenario for theater messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,

    #[serde(default)]
    pub recalled: bool,

    /// Pre-recall text, kept for reveal-on-demand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuoteRef>,

    /// Signal messages that are never displayed
    #[serde(default)]
    pub hidden: bool,

    /// Marks a system bubble produced from a nudge marker
    #[serde(default)]
    pub nudge: bool,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, mode: ModeTag) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            inner_thought: None,
            timestamp: Utc::now(),
            mode,
            scenario_id: None,
            recalled: false,
            original_content: None,
            quote: None,
            hidden: false,
            nudge: false,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>, mode: ModeTag) -> Self {
        Self::new(Role::User, content, mode)
    }

    /// Create a new model message.
    pub fn model(content: impl Into<String>, mode: ModeTag) -> Self {
        Self::new(Role::Model, content, mode)
    }

    /// Create a visible system notice.
    pub fn system(content: impl Into<String>, mode: ModeTag) -> Self {
        Self::new(Role::System, content, mode)
    }

    /// Create a nudge notice.
    pub fn nudge(content: impl Into<String>, mode: ModeTag) -> Self {
        Self {
            nudge: true,
            ..Self::new(Role::System, content, mode)
        }
    }

    /// Create a hidden system signal.
    pub fn hidden_signal(content: impl Into<String>, mode: ModeTag) -> Self {
        Self {
            hidden: true,
            ..Self::new(Role::System, content, mode)
        }
    }

    /// Builder-style scenario ownership.
    pub fn in_scenario(mut self, scenario_id: impl Into<String>) -> Self {
        self.scenario_id = Some(scenario_id.into());
        self
    }

    /// Replace the displayed content with the recall placeholder.
    ///
    /// Recalling twice keeps the first original.
    pub fn recall(&mut self) {
        if self.recalled {
            return;
        }
        let original = std::mem::replace(&mut self.content, RECALL_PLACEHOLDER.to_string());
        self.original_content = Some(original);
        self.recalled = true;
    }

    /// The text as it was before recall, or the current content.
    pub fn revealed(&self) -> &str {
        self.original_content.as_deref().unwrap_or(&self.content)
    }

    /// Whether this entry may enter any context-building history slice.
    pub fn is_context_eligible(&self) -> bool {
        !self.recalled && !self.hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("hi there", ModeTag::Online);
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hi there");
        assert!(msg.is_context_eligible());
    }

    #[test]
    fn recall_preserves_original() {
        let mut msg = Message::model("I miss you", ModeTag::Online);
        msg.recall();
        assert_eq!(msg.content, RECALL_PLACEHOLDER);
        assert_eq!(msg.revealed(), "I miss you");
        assert!(!msg.is_context_eligible());

        msg.recall();
        assert_eq!(msg.original_content.as_deref(), Some("I miss you"));
    }

    #[test]
    fn hidden_signal_is_excluded() {
        let msg = Message::hidden_signal("left the room", ModeTag::Online);
        assert_eq!(msg.role, Role::System);
        assert!(!msg.is_context_eligible());
    }

    #[test]
    fn legacy_document_backfills_defaults() {
        let json = r#"{"id":"m1","role":"assistant","content":"hey","timestamp":"2024-05-01T10:00:00Z"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::Model);
        assert_eq!(msg.mode, ModeTag::Online);
        assert!(!msg.recalled);
        assert!(msg.quote.is_none());
    }
}
