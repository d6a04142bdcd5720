//! Domain events published by the chat engine for front ends to render.
//!
//! The engine publishes an event as each bubble lands so a UI can reveal
//! replies incrementally without polling the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A reply request was sent to the provider
    GenerationStarted {
        character_id: String,
        mode: String,
        timestamp: DateTime<Utc>,
    },

    /// One bubble was committed to a timeline
    BubbleDelivered {
        character_id: String,
        message_id: String,
        index: usize,
        timestamp: DateTime<Utc>,
    },

    /// All bubbles from one reply were delivered
    GenerationFinished {
        character_id: String,
        bubbles: usize,
        timestamp: DateTime<Utc>,
    },

    /// The provider call failed; nothing was committed
    GenerationFailed {
        character_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The conversation view changed
    ViewChanged {
        character_id: String,
        view: String,
        timestamp: DateTime<Utc>,
    },

    /// Memory cards or diaries were added, fused or removed
    MemoryUpdated {
        character_id: String,
        operation: String, // "summarize", "fuse", "diary"
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
