//! Error types for the pocketline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all pocketline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Chat errors ---
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid backup document: {0}")]
    InvalidBackup(String),

    #[error("Failed to encode {what}: {reason}")]
    Encode { what: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("A reply is already being generated")]
    Busy,

    #[error("No API key configured; set one in settings first")]
    MissingApiKey,

    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Memory card not found: {0}")]
    MemoryCardNotFound(String),

    #[error("Operation not available in the {view} view")]
    InvalidView { view: String },

    #[error("Select at least two memory cards to fuse (selected: {selected})")]
    NotEnoughCards { selected: usize },

    #[error("Nothing to send: {0}")]
    EmptyInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 502,
            message: "Bad gateway".into(),
        });
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad gateway"));
    }

    #[test]
    fn chat_error_converts_into_top_level() {
        let err: Error = ChatError::NotEnoughCards { selected: 1 }.into();
        assert!(matches!(err, Error::Chat(ChatError::NotEnoughCards { selected: 1 })));
        assert!(err.to_string().contains("at least two"));
    }
}
