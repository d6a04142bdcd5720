//! Chat-completion provider implementations for pocketline.
//!
//! All providers implement the `pocketline_core::Provider` trait.

pub mod models;
pub mod openai_compat;

pub use models::list_models_or_fallback;
pub use openai_compat::OpenAiCompatProvider;
