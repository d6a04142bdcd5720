//! Conversation view state machine.
//!
//! ```text
//!   chat <──> offline
//!    │  ╲       │
//!    │   theater_list <──> theater_room(id)
//! ```
//!
//! Any view can open chat, offline or the theater list. A room is entered
//! only from the list. Leaving a room (to any view) that shares the main
//! timeline leaves a hidden departure signal behind.

use crate::context::ChatMode;
use crate::prompts;
use crate::template::{self, TemplateVars};
use pocketline_core::character::Character;
use pocketline_core::error::ChatError;
use pocketline_core::message::{Message, ModeTag, QuoteRef};
use pocketline_core::settings::AppSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    Chat,
    Offline,
    TheaterList,
    TheaterRoom { scenario_id: String },
}

impl View {
    /// The reply mode for this view; the theater list has none.
    pub fn mode(&self) -> Option<ChatMode> {
        match self {
            Self::Chat => Some(ChatMode::Online),
            Self::Offline => Some(ChatMode::Offline),
            Self::TheaterList => None,
            Self::TheaterRoom { scenario_id } => Some(ChatMode::Theater {
                scenario_id: scenario_id.clone(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Offline => "offline",
            Self::TheaterList => "theater_list",
            Self::TheaterRoom { .. } => "theater_room",
        }
    }

    /// The reply mode, or `InvalidView` where replying makes no sense.
    pub fn require_mode(&self) -> Result<ChatMode, ChatError> {
        self.mode().ok_or_else(|| ChatError::InvalidView {
            view: self.name().into(),
        })
    }
}

/// A user navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    OpenChat,
    OpenOffline,
    OpenTheaterList,
    EnterRoom(String),
}

/// Per-session mutable state.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub view: View,
    /// Quote attached to the next outgoing user message
    pub staged_quote: Option<QuoteRef>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            view: View::Chat,
            staged_quote: None,
        }
    }
}

impl ConversationState {
    /// Move to a new view.
    ///
    /// Returns the hidden departure signal to append to the main timeline
    /// when a connected room is being left.
    pub fn apply(
        &mut self,
        transition: Transition,
        character: &Character,
        settings: &AppSettings,
    ) -> Result<Option<Message>, ChatError> {
        let next = match transition {
            Transition::OpenChat => View::Chat,
            Transition::OpenOffline => View::Offline,
            Transition::OpenTheaterList => View::TheaterList,
            Transition::EnterRoom(id) => {
                if self.view != View::TheaterList {
                    return Err(ChatError::InvalidView {
                        view: self.view.name().into(),
                    });
                }
                if character.scenario(&id).is_none() {
                    return Err(ChatError::ScenarioNotFound(id));
                }
                View::TheaterRoom { scenario_id: id }
            }
        };

        let departure = match &self.view {
            View::TheaterRoom { scenario_id } if next != self.view => {
                departure_signal(character, settings, scenario_id)
            }
            _ => None,
        };

        if next != self.view {
            self.staged_quote = None;
        }
        self.view = next;
        Ok(departure)
    }
}

fn departure_signal(
    character: &Character,
    settings: &AppSettings,
    scenario_id: &str,
) -> Option<Message> {
    let scenario = character.scenario(scenario_id).filter(|s| s.connected)?;
    let (user, _) = character.user_identity(settings);
    let vars = TemplateVars::new()
        .set("user", user)
        .set("char", character.name.as_str())
        .set("title", scenario.title.as_str());
    Some(Message::hidden_signal(
        template::render(prompts::DEPARTURE_SIGNAL, &vars),
        ModeTag::Online,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketline_core::character::Scenario;

    fn character() -> (Character, String, String) {
        let mut c = Character::new("Lin");
        let connected = Scenario::new("Cafe", "", true);
        let independent = Scenario::new("Castle", "", false);
        let ids = (connected.id.clone(), independent.id.clone());
        c.scenarios.push(connected);
        c.scenarios.push(independent);
        (c, ids.0, ids.1)
    }

    #[test]
    fn rooms_are_entered_from_the_list_only() {
        let (c, id, _) = character();
        let settings = AppSettings::default();
        let mut state = ConversationState::default();

        let err = state
            .apply(Transition::EnterRoom(id.clone()), &c, &settings)
            .unwrap_err();
        assert_eq!(err, ChatError::InvalidView { view: "chat".into() });

        state
            .apply(Transition::OpenTheaterList, &c, &settings)
            .unwrap();
        let signal = state
            .apply(Transition::EnterRoom(id.clone()), &c, &settings)
            .unwrap();
        assert!(signal.is_none());
        assert_eq!(state.view, View::TheaterRoom { scenario_id: id });
    }

    #[test]
    fn leaving_a_connected_room_leaves_a_hidden_signal() {
        let (c, id, _) = character();
        let settings = AppSettings::default();
        let mut state = ConversationState {
            view: View::TheaterRoom { scenario_id: id },
            staged_quote: None,
        };

        let signal = state
            .apply(Transition::OpenTheaterList, &c, &settings)
            .unwrap()
            .unwrap();
        assert!(signal.hidden);
        assert_eq!(signal.mode, ModeTag::Online);
        assert!(signal.content.contains("\"Cafe\""));
        assert!(signal.content.starts_with("Me and Lin"));
    }

    #[test]
    fn leaving_an_independent_room_is_silent() {
        let (c, _, id) = character();
        let mut state = ConversationState {
            view: View::TheaterRoom { scenario_id: id },
            staged_quote: None,
        };
        let signal = state
            .apply(Transition::OpenChat, &c, &AppSettings::default())
            .unwrap();
        assert!(signal.is_none());
        assert_eq!(state.view, View::Chat);
    }

    #[test]
    fn unknown_room_is_rejected() {
        let (c, _, _) = character();
        let mut state = ConversationState {
            view: View::TheaterList,
            staged_quote: None,
        };
        let err = state
            .apply(Transition::EnterRoom("gone".into()), &c, &AppSettings::default())
            .unwrap_err();
        assert_eq!(err, ChatError::ScenarioNotFound("gone".into()));
        assert_eq!(state.view, View::TheaterList);
    }

    #[test]
    fn theater_list_has_no_reply_mode() {
        assert!(View::TheaterList.mode().is_none());
        assert!(matches!(
            View::TheaterList.require_mode(),
            Err(ChatError::InvalidView { .. })
        ));
        assert_eq!(View::Offline.mode(), Some(ChatMode::Offline));
    }
}
