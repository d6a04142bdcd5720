//! Reply parsing and segmentation.
//!
//! Grammar, applied to the token stream from [`lexer`]:
//!
//! 1. **Thought**: the first `<os>` up to its `</os>` (or, when the close
//!    tag is missing, up to the next `<reply>`) is detached as the inner
//!    thought. An `<os>` with neither terminator stays literal text.
//! 2. **Wrappers**: remaining reply tags and stray thought tags are dropped.
//! 3. **Bubbles**: the body splits on `|||`, then on nudge markers. Each
//!    marker becomes its own nudge bubble. Text pieces are trimmed and
//!    empty pieces are dropped.
//!
//! Parsing is total; malformed input degrades to fewer structures, never
//! to an error.

pub mod lexer;

use crate::protocol;
use lexer::Token;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleKind {
    Text,
    Nudge,
}

/// One displayable unit of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bubble {
    pub kind: BubbleKind,
    pub content: String,
}

impl Bubble {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: BubbleKind::Text,
            content: content.into(),
        }
    }

    pub fn nudge(character_name: &str) -> Self {
        Self {
            kind: BubbleKind::Nudge,
            content: protocol::nudge_notice(character_name),
        }
    }
}

/// A decoded reply: the detached thought plus ordered bubbles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReply {
    pub inner_thought: Option<String>,
    pub bubbles: Vec<Bubble>,
}

impl ParsedReply {
    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn text_bubbles(&self) -> impl Iterator<Item = &Bubble> {
        self.bubbles.iter().filter(|b| b.kind == BubbleKind::Text)
    }
}

/// Decode one raw completion.
pub fn parse(raw: &str, character_name: &str) -> ParsedReply {
    let mut tokens = lexer::tokenize(raw);
    let inner_thought = extract_thought(&mut tokens);
    let bubbles = segment(&tokens, character_name);
    ParsedReply {
        inner_thought,
        bubbles,
    }
}

fn extract_thought(tokens: &mut Vec<Token<'_>>) -> Option<String> {
    let open = tokens.iter().position(|t| *t == Token::ThoughtOpen)?;
    let after = &tokens[open + 1..];

    let (end, drain_to) = if let Some(close) = after.iter().position(|t| *t == Token::ThoughtClose)
    {
        (open + 1 + close, open + 1 + close + 1)
    } else if let Some(reply) = after.iter().position(|t| *t == Token::ReplyOpen) {
        // Unclosed thought: it runs up to the reply wrapper, which stays.
        (open + 1 + reply, open + 1 + reply)
    } else {
        tokens[open] = Token::Text(protocol::THOUGHT_OPEN);
        return None;
    };

    let thought: String = tokens[open + 1..end].iter().map(Token::literal).collect();
    tokens.drain(open..drain_to);
    let thought = thought.trim();
    (!thought.is_empty()).then(|| thought.to_string())
}

fn segment(tokens: &[Token<'_>], character_name: &str) -> Vec<Bubble> {
    let mut bubbles = Vec::new();
    let mut buffer = String::new();

    let flush = |buffer: &mut String, bubbles: &mut Vec<Bubble>| {
        let piece = buffer.trim();
        if !piece.is_empty() {
            bubbles.push(Bubble::text(piece));
        }
        buffer.clear();
    };

    for token in tokens {
        match token {
            Token::Text(text) => buffer.push_str(text),
            Token::Delimiter => flush(&mut buffer, &mut bubbles),
            Token::Nudge => {
                flush(&mut buffer, &mut bubbles);
                bubbles.push(Bubble::nudge(character_name));
            }
            Token::ThoughtOpen | Token::ThoughtClose | Token::ReplyOpen | Token::ReplyClose => {}
        }
    }
    flush(&mut buffer, &mut bubbles);
    bubbles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(reply: &ParsedReply) -> Vec<&str> {
        reply.bubbles.iter().map(|b| b.content.as_str()).collect()
    }

    #[test]
    fn splits_on_delimiter_in_order() {
        let reply = parse("A|||B|||C", "Lin");
        assert_eq!(contents(&reply), ["A", "B", "C"]);
        assert!(reply.bubbles.iter().all(|b| b.kind == BubbleKind::Text));
        assert!(reply.inner_thought.is_none());
    }

    #[test]
    fn no_delimiter_is_one_bubble() {
        let reply = parse("  just one message  ", "Lin");
        assert_eq!(contents(&reply), ["just one message"]);
    }

    #[test]
    fn detaches_thought_and_strips_wrapper() {
        let reply = parse("<os>T</os><reply>Hello|||World</reply>", "Lin");
        assert_eq!(reply.inner_thought.as_deref(), Some("T"));
        assert_eq!(contents(&reply), ["Hello", "World"]);
    }

    #[test]
    fn nudge_mid_segment_splits_around_it() {
        let reply = parse("wake up[NUDGE]hello?", "Lin");
        assert_eq!(
            reply.bubbles,
            [
                Bubble::text("wake up"),
                Bubble::nudge("Lin"),
                Bubble::text("hello?")
            ]
        );
        assert_eq!(reply.bubbles[1].content, "Lin nudged you");
    }

    #[test]
    fn empty_fragments_next_to_nudge_are_dropped() {
        let reply = parse("hey|||  [NUDGE]  |||", "Lin");
        assert_eq!(reply.bubbles, [Bubble::text("hey"), Bubble::nudge("Lin")]);
    }

    #[test]
    fn empty_segments_are_discarded() {
        let reply = parse("|||a||| |||b|||", "Lin");
        assert_eq!(contents(&reply), ["a", "b"]);
    }

    #[test]
    fn unclosed_thought_runs_to_reply_tag() {
        let reply = parse("<os>thinking<reply>hi</reply>", "Lin");
        assert_eq!(reply.inner_thought.as_deref(), Some("thinking"));
        assert_eq!(contents(&reply), ["hi"]);
    }

    #[test]
    fn dangling_thought_tag_is_kept_as_text() {
        let reply = parse("<os>no end in sight", "Lin");
        assert!(reply.inner_thought.is_none());
        assert_eq!(contents(&reply), ["<os>no end in sight"]);
    }

    #[test]
    fn stray_tags_do_not_leak_into_bubbles() {
        let reply = parse("</os>hi</reply>", "Lin");
        assert_eq!(contents(&reply), ["hi"]);
    }

    #[test]
    fn thought_with_delimiter_inside_is_kept_whole() {
        let reply = parse("<os>a|||b</os>c", "Lin");
        assert_eq!(reply.inner_thought.as_deref(), Some("a|||b"));
        assert_eq!(contents(&reply), ["c"]);
    }

    #[test]
    fn empty_or_tag_only_input_yields_no_bubbles() {
        assert!(parse("", "Lin").is_empty());
        assert!(parse("<os></os><reply></reply>", "Lin").is_empty());
    }
}
