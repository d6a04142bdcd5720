//! History slicing and serialization.
//!
//! A slice is filtered first (mode membership, then eligibility) and cut
//! second, so recalled or hidden entries never use up the history limit.

use super::mode::{ChatMode, Timeline, belongs_to};
use crate::protocol;
use pocketline_core::character::Character;
use pocketline_core::message::{Message, Role};
use pocketline_core::provider::PromptBlock;

/// The most recent `limit` eligible messages for `mode`, oldest first.
pub fn slice<'a>(
    character: &'a Character,
    mode: &ChatMode,
    timeline: &Timeline,
    limit: usize,
) -> HistorySlice<'a> {
    let source = timeline.messages(character).unwrap_or_default();
    let eligible: Vec<&Message> = source
        .iter()
        .filter(|m| belongs_to(m, mode, timeline))
        .filter(|m| m.is_context_eligible())
        .collect();

    let available = eligible.len();
    let start = available.saturating_sub(limit);
    HistorySlice {
        messages: eligible[start..].to_vec(),
        available,
    }
}

/// A cut of history plus how much was eligible before the cut.
#[derive(Debug, Clone)]
pub struct HistorySlice<'a> {
    pub messages: Vec<&'a Message>,
    pub available: usize,
}

/// Convert one stored message into a prompt block.
///
/// Model turns have their bubble delimiters flattened and, when an inner
/// thought was recorded, are re-wrapped in the thought/reply tags. Quotes
/// become a one-line prefix.
pub fn serialize(message: &Message) -> PromptBlock {
    let body = match message.role {
        Role::Model => {
            let reply = protocol::flatten_delimiters(&message.content);
            match message.inner_thought.as_deref().filter(|t| !t.is_empty()) {
                Some(thought) => protocol::wrap_with_thought(thought, &reply),
                None => reply,
            }
        }
        Role::User | Role::System => message.content.clone(),
    };

    let content = match &message.quote {
        Some(q) => format!("[Replying to {}: \"{}\"]\n{body}", q.speaker, q.snippet),
        None => body,
    };

    PromptBlock {
        role: message.role,
        content,
    }
}
