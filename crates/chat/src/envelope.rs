//! Structured answers from extraction prompts.
//!
//! Models often wrap the requested JSON object in prose or code fences.
//! The reader takes the outermost `{...}` span and decodes it; when that
//! fails the whole raw text becomes the primary field instead.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Answer to the summary and fusion prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SummaryEnvelope {
    pub location: Option<String>,
    pub event: Option<String>,
    pub status: Option<String>,
    pub summary: String,
}

/// Answer to the diary prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiaryEnvelope {
    pub title: Option<String>,
    pub content: String,
    pub mood: Option<String>,
}

fn decode<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end])
        .inspect_err(|e| debug!(error = %e, "Structured answer did not decode"))
        .ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn parse_summary(raw: &str) -> SummaryEnvelope {
    match decode::<SummaryEnvelope>(raw) {
        Some(env) if !env.summary.trim().is_empty() => SummaryEnvelope {
            location: non_empty(env.location),
            event: non_empty(env.event),
            status: non_empty(env.status),
            summary: env.summary.trim().to_string(),
        },
        _ => SummaryEnvelope {
            summary: raw.trim().to_string(),
            ..SummaryEnvelope::default()
        },
    }
}

pub fn parse_diary(raw: &str) -> DiaryEnvelope {
    match decode::<DiaryEnvelope>(raw) {
        Some(env) if !env.content.trim().is_empty() => DiaryEnvelope {
            title: non_empty(env.title),
            content: env.content.trim().to_string(),
            mood: non_empty(env.mood),
        },
        _ => DiaryEnvelope {
            content: raw.trim().to_string(),
            ..DiaryEnvelope::default()
        },
    }
}
