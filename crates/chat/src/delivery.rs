//! Paced bubble delivery.
//!
//! A parsed reply becomes a [`DeliveryPlan`]: a queue of messages, each
//! with the delay to wait before it is committed. The first step waits a
//! short "read" delay, later steps a longer "typing" delay. The plan is
//! consumed as a stream that sleeps between items and yields strictly in
//! order.

use crate::context::ChatMode;
use crate::context::mode::tag_message;
use crate::reply::{BubbleKind, ParsedReply};
use futures::Stream;
use pocketline_config::DeliveryConfig;
use pocketline_core::message::Message;
use std::collections::VecDeque;
use std::time::Duration;

/// Delays between committed bubbles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPacing {
    pub first_delay: Duration,
    pub step_delay: Duration,
}

impl DeliveryPacing {
    /// No waiting at all.
    pub fn immediate() -> Self {
        Self {
            first_delay: Duration::ZERO,
            step_delay: Duration::ZERO,
        }
    }
}

impl Default for DeliveryPacing {
    fn default() -> Self {
        Self::from(&DeliveryConfig::default())
    }
}

impl From<&DeliveryConfig> for DeliveryPacing {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            first_delay: config.first_delay(),
            step_delay: config.step_delay(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryStep {
    pub delay: Duration,
    pub message: Message,
}

/// Ordered steps for one reply.
#[derive(Debug, Clone, Default)]
pub struct DeliveryPlan {
    steps: VecDeque<DeliveryStep>,
}

impl DeliveryPlan {
    /// Turn parsed bubbles into tagged messages for `mode`.
    ///
    /// The inner thought rides on the first text bubble only.
    pub fn build(reply: ParsedReply, mode: &ChatMode, pacing: DeliveryPacing) -> Self {
        let mut thought = reply.inner_thought;
        let steps = reply
            .bubbles
            .into_iter()
            .enumerate()
            .map(|(i, bubble)| {
                let message = match bubble.kind {
                    BubbleKind::Text => {
                        let mut m = Message::model(bubble.content, mode.tag());
                        m.inner_thought = thought.take();
                        m
                    }
                    BubbleKind::Nudge => Message::nudge(bubble.content, mode.tag()),
                };
                DeliveryStep {
                    delay: if i == 0 {
                        pacing.first_delay
                    } else {
                        pacing.step_delay
                    },
                    message: tag_message(message, mode),
                }
            })
            .collect();
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn next_step(&mut self) -> Option<DeliveryStep> {
        self.steps.pop_front()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.steps.iter().map(|s| s.delay).collect()
    }

    /// Yield each message after its delay has elapsed.
    pub fn into_stream(self) -> impl Stream<Item = Message> {
        futures::stream::unfold(self, |mut plan| async move {
            let step = plan.next_step()?;
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            Some((step.message, plan))
        })
    }
}
