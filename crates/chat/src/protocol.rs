//! The text protocol spoken with the model.
//!
//! Replies may carry an inner-thought block, a reply wrapper, bubble
//! delimiters and nudge markers. History serialization writes the same
//! tags back so the model sees its own earlier turns in the format it
//! is asked to produce.

/// Separates consecutive chat bubbles in one reply.
pub const BUBBLE_DELIMITER: &str = "|||";

pub const THOUGHT_OPEN: &str = "<os>";
pub const THOUGHT_CLOSE: &str = "</os>";
pub const REPLY_OPEN: &str = "<reply>";
pub const REPLY_CLOSE: &str = "</reply>";

/// Embedded "poke the user" marker. Matched case-insensitively.
pub const NUDGE_MARKER: &str = "[NUDGE]";

/// Text of the system bubble a nudge marker turns into.
pub fn nudge_notice(character_name: &str) -> String {
    format!("{character_name} nudged you")
}

/// Replace bubble delimiters with single spaces.
pub fn flatten_delimiters(text: &str) -> String {
    text.split(BUBBLE_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wrap a model turn that carried an inner thought.
pub fn wrap_with_thought(thought: &str, reply: &str) -> String {
    format!("{THOUGHT_OPEN}{thought}{THOUGHT_CLOSE}{REPLY_OPEN}{reply}{REPLY_CLOSE}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_turns_delimiters_into_spaces() {
        assert_eq!(flatten_delimiters("a|||b ||| c"), "a b c");
        assert_eq!(flatten_delimiters("no delimiter"), "no delimiter");
    }

    #[test]
    fn wrap_produces_adjacent_tags() {
        assert_eq!(wrap_with_thought("t", "r"), "<os>t</os><reply>r</reply>");
    }
}
