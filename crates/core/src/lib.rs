//! # pocketline core
//!
//! Domain types, traits, and error definitions for the pocketline virtual
//! phone. This crate has **zero framework dependencies**: it defines the
//! character/message model and the completion-client seam that every other
//! crate builds on.
//!
//! - [`character`] owns the persistent conversational partner and everything
//!   that hangs off it (scenarios, memory cards, diaries).
//! - [`message`] is the timeline entry shared by every mode.
//! - [`provider`] is the contract the chat engine uses to reach a model.

pub mod character;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod settings;

// Re-export key types at crate root for ergonomics
pub use character::{
    Character, DiaryEntry, FurnaceConfig, MemoryCard, OfflineConfig, Scenario, UserMask,
};
pub use error::{ChatError, Error, ProviderError, Result, StoreError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, ModeTag, QuoteRef, Role};
pub use provider::{CompletionRequest, PromptBlock, Provider, ProviderResponse, Usage};
pub use settings::{ApiSettings, AppSettings, GlobalPersona};
