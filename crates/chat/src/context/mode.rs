//! Conversational modes and the timelines they write to.

use pocketline_core::character::Character;
use pocketline_core::error::ChatError;
use pocketline_core::message::{Message, ModeTag};
use serde::{Deserialize, Serialize};

/// The mode a reply is generated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ChatMode {
    Online,
    Offline,
    Theater { scenario_id: String },
}

impl ChatMode {
    pub fn tag(&self) -> ModeTag {
        match self {
            Self::Online => ModeTag::Online,
            Self::Offline => ModeTag::Offline,
            Self::Theater { .. } => ModeTag::Theater,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Theater { .. } => "theater",
        }
    }

    pub fn scenario_id(&self) -> Option<&str> {
        match self {
            Self::Theater { scenario_id } => Some(scenario_id),
            _ => None,
        }
    }
}

/// Where messages of a mode are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeline {
    /// The character's own message list
    Main,
    /// An independent scenario's private list
    Scenario(String),
}

impl Timeline {
    /// Resolve the timeline for `mode`. Connected scenarios write to the main
    /// timeline; independent ones keep their own.
    pub fn resolve(character: &Character, mode: &ChatMode) -> Result<Self, ChatError> {
        match mode {
            ChatMode::Online | ChatMode::Offline => Ok(Self::Main),
            ChatMode::Theater { scenario_id } => {
                let scenario = character
                    .scenario(scenario_id)
                    .ok_or_else(|| ChatError::ScenarioNotFound(scenario_id.clone()))?;
                Ok(if scenario.connected {
                    Self::Main
                } else {
                    Self::Scenario(scenario_id.clone())
                })
            }
        }
    }

    pub fn messages<'a>(&self, character: &'a Character) -> Option<&'a [Message]> {
        match self {
            Self::Main => Some(&character.messages),
            Self::Scenario(id) => character.scenario(id).map(|s| s.messages.as_slice()),
        }
    }

    pub fn messages_mut<'a>(&self, character: &'a mut Character) -> Option<&'a mut Vec<Message>> {
        match self {
            Self::Main => Some(&mut character.messages),
            Self::Scenario(id) => character.scenario_mut(id).map(|s| &mut s.messages),
        }
    }
}

/// Whether `message` belongs to the history visible in `mode`.
///
/// Eligibility (recalled or hidden) is checked separately.
pub fn belongs_to(message: &Message, mode: &ChatMode, timeline: &Timeline) -> bool {
    match (mode, timeline) {
        (ChatMode::Online, _) => message.mode == ModeTag::Online,
        (ChatMode::Offline, _) => message.mode == ModeTag::Offline,
        (ChatMode::Theater { scenario_id }, Timeline::Main) => {
            message.scenario_id.as_deref() == Some(scenario_id.as_str())
        }
        (ChatMode::Theater { .. }, Timeline::Scenario(_)) => true,
    }
}

/// Stamp a freshly created message with the mode it was written in.
pub fn tag_message(message: Message, mode: &ChatMode) -> Message {
    let message = Message {
        mode: mode.tag(),
        ..message
    };
    match mode.scenario_id() {
        Some(id) => message.in_scenario(id),
        None => message,
    }
}
