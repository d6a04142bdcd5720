//! # pocketline chat engine
//!
//! Everything between a user action and the bubbles it produces:
//!
//! - [`template`] renders `{placeholder}` prompt templates
//! - [`context`] slices per-mode history and assembles the request
//! - [`reply`] tokenizes and segments a raw completion into bubbles
//! - [`delivery`] paces bubbles into a timeline one at a time
//! - [`state`] is the view state machine (chat, offline, theater)
//! - [`session`] drives the pipeline under the application busy flag
//! - [`memory_ops`] summarizes, fuses memory cards and writes diaries

pub mod busy;
pub mod context;
pub mod delivery;
pub mod envelope;
pub mod memory_ops;
pub mod prompts;
pub mod protocol;
pub mod reply;
pub mod session;
pub mod state;
pub mod template;

pub use busy::{BusyFlag, BusyGuard};
pub use context::{AssembledContext, AssemblyInput, ChatMode, ContextAssembler, Timeline};
pub use delivery::{DeliveryPacing, DeliveryPlan};
pub use reply::{Bubble, BubbleKind, ParsedReply};
pub use session::{ChatSession, SessionOptions};
pub use state::{ConversationState, Transition, View};
