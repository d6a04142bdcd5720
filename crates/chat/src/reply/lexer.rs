//! Tokenizer for raw model replies.
//!
//! Recognizes the structural tags, the bubble delimiter and the nudge
//! marker; everything else is text. Tags and the marker match
//! case-insensitively. Tokenizing never fails.

use crate::protocol::{
    BUBBLE_DELIMITER, NUDGE_MARKER, REPLY_CLOSE, REPLY_OPEN, THOUGHT_CLOSE, THOUGHT_OPEN,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    ThoughtOpen,
    ThoughtClose,
    ReplyOpen,
    ReplyClose,
    Delimiter,
    Nudge,
    Text(&'a str),
}

impl Token<'_> {
    /// The source text a structural token stood for.
    pub fn literal(&self) -> &str {
        match self {
            Self::ThoughtOpen => THOUGHT_OPEN,
            Self::ThoughtClose => THOUGHT_CLOSE,
            Self::ReplyOpen => REPLY_OPEN,
            Self::ReplyClose => REPLY_CLOSE,
            Self::Delimiter => BUBBLE_DELIMITER,
            Self::Nudge => NUDGE_MARKER,
            Self::Text(t) => t,
        }
    }
}

const STRUCTURAL: [(&str, Token<'static>); 6] = [
    (THOUGHT_OPEN, Token::ThoughtOpen),
    (THOUGHT_CLOSE, Token::ThoughtClose),
    (REPLY_OPEN, Token::ReplyOpen),
    (REPLY_CLOSE, Token::ReplyClose),
    (BUBBLE_DELIMITER, Token::Delimiter),
    (NUDGE_MARKER, Token::Nudge),
];

/// Split `raw` into tokens, preserving source order.
///
/// Each pattern's next match offset is cached and only searched again once
/// the cursor has passed it, so the scan stays linear in the input.
pub fn tokenize(raw: &str) -> Vec<Token<'_>> {
    // ASCII lowercasing keeps byte offsets aligned with `raw`.
    let folded = raw.to_ascii_lowercase();
    let patterns: Vec<(String, &Token<'static>)> = STRUCTURAL
        .iter()
        .map(|(pattern, token)| (pattern.to_ascii_lowercase(), token))
        .collect();
    let mut next: Vec<Option<usize>> = patterns
        .iter()
        .map(|(pattern, _)| folded.find(pattern.as_str()))
        .collect();

    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < raw.len() {
        let earliest = next
            .iter()
            .enumerate()
            .filter_map(|(i, start)| start.map(|s| (s, i)))
            .min();

        let Some((start, i)) = earliest else {
            tokens.push(Token::Text(&raw[pos..]));
            break;
        };
        if start > pos {
            tokens.push(Token::Text(&raw[pos..start]));
        }
        let (pattern, token) = &patterns[i];
        tokens.push((*token).clone());
        pos = start + pattern.len();

        for ((pattern, _), slot) in patterns.iter().zip(next.iter_mut()) {
            if matches!(slot, Some(s) if *s < pos) {
                *slot = folded[pos..].find(pattern.as_str()).map(|offset| pos + offset);
            }
        }
    }
    tokens
}
