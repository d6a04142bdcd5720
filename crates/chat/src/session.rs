//! A conversation with one character.
//!
//! [`ChatSession`] ties the pieces together: it reads snapshots from the
//! store, assembles context, calls the provider, parses the reply and
//! delivers bubbles back into the right timeline. Every generating
//! operation holds the shared [`BusyFlag`] until its last bubble lands.
//!
//! # Failure semantics
//!
//! A provider failure commits nothing. Regeneration truncates history only
//! after a reply has arrived, so a failed regenerate leaves the timeline
//! exactly as it was.

use crate::busy::{BusyFlag, BusyGuard};
use crate::context::mode::{belongs_to, tag_message};
use crate::context::{AssemblyInput, ChatMode, ContextAssembler, Timeline};
use crate::delivery::{DeliveryPacing, DeliveryPlan};
use crate::reply;
use crate::state::{ConversationState, Transition, View};
use chrono::{Local, Utc};
use futures::StreamExt;
use pocketline_config::AppConfig;
use pocketline_core::character::{Character, DEFAULT_SUMMARY_SCOPE};
use pocketline_core::error::{ChatError, Result};
use pocketline_core::event::{DomainEvent, EventBus};
use pocketline_core::message::{Message, QuoteRef, Role};
use pocketline_core::provider::{CompletionRequest, PromptBlock, Provider, ProviderResponse};
use pocketline_core::settings::{ApiSettings, AppSettings};
use pocketline_store::Store;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Length of the snippet stored with a staged quote, in characters.
pub const QUOTE_SNIPPET_CHARS: usize = 40;

/// Knobs taken from process configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub temperature: f32,
    pub pacing: DeliveryPacing,
    /// Summarization scope for characters without one
    pub default_summary_scope: usize,
    /// Used when the in-app settings carry no key
    pub fallback_api_key: Option<String>,
    /// Used when the in-app settings carry no model
    pub fallback_model: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            pacing: DeliveryPacing::default(),
            default_summary_scope: DEFAULT_SUMMARY_SCOPE,
            fallback_api_key: None,
            fallback_model: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            temperature: config.temperature,
            pacing: DeliveryPacing::from(&config.delivery),
            default_summary_scope: config.summary.default_scope,
            fallback_api_key: config.api_key.clone(),
            fallback_model: config.model.clone(),
        }
    }
}

/// Where a regenerate cuts history, resolved by message id so the cut can
/// be applied to both the request snapshot and the live record.
#[derive(Debug, Clone)]
struct Rewind {
    mode: ChatMode,
    timeline: Timeline,
    /// First message to discard, `None` when nothing follows the target
    from_id: Option<String>,
}

impl Rewind {
    /// Discard the cut message and every later message of the same mode.
    /// Entries of other modes sharing the timeline are kept.
    fn apply(&self, character: &mut Character) {
        let Some(from_id) = &self.from_id else {
            return;
        };
        let Some(list) = self.timeline.messages_mut(character) else {
            return;
        };
        let Some(cut) = list.iter().position(|m| &m.id == from_id) else {
            return;
        };
        let mut index = 0;
        list.retain(|m| {
            let keep = index < cut || !belongs_to(m, &self.mode, &self.timeline);
            index += 1;
            keep
        });
    }
}

fn is_reply_part(message: &Message) -> bool {
    message.role == Role::Model || (message.role == Role::System && message.nudge)
}

/// Index of the first message to discard when regenerating at `target`.
///
/// For a reply bubble this is the start of the contiguous run of reply
/// bubbles ending at the target. For a user message it is the message right
/// after it.
pub fn rewind_point(messages: &[&Message], target: usize) -> usize {
    if !is_reply_part(messages[target]) {
        return target + 1;
    }
    let mut start = target;
    while start > 0 && is_reply_part(messages[start - 1]) {
        start -= 1;
    }
    start
}

/// One open conversation.
pub struct ChatSession {
    character_id: String,
    provider: Arc<dyn Provider>,
    store: Arc<Store>,
    events: Arc<EventBus>,
    busy: BusyFlag,
    options: SessionOptions,
    assembler: ContextAssembler,
    state: Mutex<ConversationState>,
}

impl ChatSession {
    /// Open a conversation with an existing character, starting in the chat
    /// view.
    pub async fn open(
        character_id: impl Into<String>,
        provider: Arc<dyn Provider>,
        store: Arc<Store>,
        events: Arc<EventBus>,
        busy: BusyFlag,
        options: SessionOptions,
    ) -> Result<Self> {
        let character_id = character_id.into();
        if store.character(&character_id).await.is_none() {
            return Err(ChatError::CharacterNotFound(character_id).into());
        }
        debug!(character = %character_id, provider = provider.name(), "Session opened");
        Ok(Self {
            character_id,
            provider,
            store,
            events,
            busy,
            options,
            assembler: ContextAssembler::new(),
            state: Mutex::new(ConversationState::default()),
        })
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    pub fn view(&self) -> View {
        self.state().view.clone()
    }

    pub fn staged_quote(&self) -> Option<QuoteRef> {
        self.state().staged_quote.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub(crate) fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    // The lock is never held across an await point.
    fn state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) async fn snapshot(&self) -> Result<Character> {
        self.store
            .character(&self.character_id)
            .await
            .ok_or_else(|| ChatError::CharacterNotFound(self.character_id.clone()).into())
    }

    /// Effective API access: in-app settings first, configured fallbacks second.
    pub(crate) fn api_settings(&self, settings: &AppSettings) -> Result<ApiSettings> {
        let mut api = settings.api.clone();
        if !api.has_api_key() {
            if let Some(key) = &self.options.fallback_api_key {
                api.api_key = key.clone();
            }
        }
        if api.model.trim().is_empty() {
            if let Some(model) = &self.options.fallback_model {
                api.model = model.clone();
            }
        }
        if !api.has_api_key() {
            return Err(ChatError::MissingApiKey.into());
        }
        Ok(api)
    }

    pub(crate) fn acquire(&self) -> Result<BusyGuard> {
        self.busy.try_acquire().ok_or_else(|| {
            debug!(character = %self.character_id, "Rejected: generation in flight");
            ChatError::Busy.into()
        })
    }

    /// One provider round trip. Failures are published and logged here.
    pub(crate) async fn complete(
        &self,
        api: &ApiSettings,
        blocks: Vec<PromptBlock>,
        mode: &str,
    ) -> Result<ProviderResponse> {
        let request = CompletionRequest::new(api, blocks).with_temperature(self.options.temperature);
        self.events.publish(DomainEvent::GenerationStarted {
            character_id: self.character_id.clone(),
            mode: mode.into(),
            timestamp: Utc::now(),
        });

        match self.provider.complete(request).await {
            Ok(response) => {
                debug!(
                    character = %self.character_id,
                    model = %response.model,
                    chars = response.content.len(),
                    "Completion received"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(character = %self.character_id, error = %e, "Completion failed");
                self.events.publish(DomainEvent::GenerationFailed {
                    character_id: self.character_id.clone(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e.into())
            }
        }
    }

    // ── Navigation ────────────────────────────────────────────────────────

    /// Apply a view transition, committing a departure signal if one is due.
    pub async fn navigate(&self, transition: Transition) -> Result<View> {
        let character = self.snapshot().await?;
        let settings = self.store.settings().await;

        // The view only changes once the departure signal is saved.
        let mut next = self.state().clone();
        let departure = next.apply(transition, &character, &settings)?;

        if let Some(signal) = departure {
            debug!(character = %self.character_id, "Recording scenario departure");
            self.store
                .update_character(&self.character_id, |c| c.messages.push(signal))
                .await?;
        }

        let view = next.view.clone();
        *self.state() = next;

        self.events.publish(DomainEvent::ViewChanged {
            character_id: self.character_id.clone(),
            view: view.name().into(),
            timestamp: Utc::now(),
        });
        Ok(view)
    }

    /// Visible messages of the current view, oldest first.
    pub async fn timeline(&self) -> Result<Vec<Message>> {
        let mode = self.view().require_mode()?;
        let character = self.snapshot().await?;
        let timeline = Timeline::resolve(&character, &mode)?;
        Ok(timeline
            .messages(&character)
            .unwrap_or_default()
            .iter()
            .filter(|m| !m.hidden && belongs_to(m, &mode, &timeline))
            .cloned()
            .collect())
    }

    // ── Generation ────────────────────────────────────────────────────────

    /// Commit a user message in the current view and deliver the reply.
    pub async fn send(&self, text: &str) -> Result<Vec<Message>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyInput("message is empty".into()).into());
        }
        let mode = self.view().require_mode()?;
        let settings = self.store.settings().await;
        let api = self.api_settings(&settings)?;
        let guard = self.acquire()?;

        let mut message = tag_message(Message::user(text, mode.tag()), &mode);
        message.quote = self.staged_quote();

        let committed = self
            .store
            .update_character(&self.character_id, |c| {
                let timeline = Timeline::resolve(c, &mode)?;
                timeline
                    .messages_mut(c)
                    .ok_or_else(|| ChatError::ScenarioNotFound(timeline_id(&timeline)))?
                    .push(message);
                Ok::<_, ChatError>(())
            })
            .await?
            .ok_or_else(|| ChatError::CharacterNotFound(self.character_id.clone()))?;
        committed?;
        self.state().staged_quote = None;

        self.generate(guard, mode, api, None).await
    }

    /// Ask for a reply without sending anything.
    pub async fn invite_reply(&self) -> Result<Vec<Message>> {
        let mode = self.view().require_mode()?;
        let settings = self.store.settings().await;
        let api = self.api_settings(&settings)?;
        let guard = self.acquire()?;
        self.generate(guard, mode, api, None).await
    }

    /// Re-run generation from `target` (the last visible message when
    /// `None`), replacing the reply it belongs to.
    pub async fn regenerate(&self, target: Option<&str>) -> Result<Vec<Message>> {
        let mode = self.view().require_mode()?;
        let settings = self.store.settings().await;
        let api = self.api_settings(&settings)?;
        let guard = self.acquire()?;

        let character = self.snapshot().await?;
        let timeline = Timeline::resolve(&character, &mode)?;
        let visible: Vec<&Message> = timeline
            .messages(&character)
            .unwrap_or_default()
            .iter()
            .filter(|m| !m.hidden && belongs_to(m, &mode, &timeline))
            .collect();

        let index = match target {
            Some(id) => visible
                .iter()
                .position(|m| m.id == id)
                .ok_or_else(|| ChatError::MessageNotFound(id.to_string()))?,
            None => visible
                .len()
                .checked_sub(1)
                .ok_or_else(|| ChatError::EmptyInput("no messages to regenerate".into()))?,
        };

        let cut = rewind_point(&visible, index);
        let rewind = Rewind {
            from_id: visible.get(cut).map(|m| m.id.clone()),
            mode: mode.clone(),
            timeline,
        };
        debug!(
            character = %self.character_id,
            discarded = visible.len() - cut,
            "Regenerating"
        );
        self.generate(guard, mode, api, Some(rewind)).await
    }

    async fn generate(
        &self,
        _guard: BusyGuard,
        mode: ChatMode,
        api: ApiSettings,
        rewind: Option<Rewind>,
    ) -> Result<Vec<Message>> {
        let settings = self.store.settings().await;
        let mut character = self.snapshot().await?;
        if let Some(rewind) = &rewind {
            rewind.apply(&mut character);
        }

        let assembled = self.assembler.assemble(&AssemblyInput {
            character: &character,
            settings: &settings,
            mode: &mode,
            now: Local::now().fixed_offset(),
        })?;
        debug!(
            character = %self.character_id,
            mode = assembled.metadata.mode,
            sections = ?assembled.metadata.sections,
            history = assembled.metadata.history_included,
            "Context assembled"
        );

        let response = self.complete(&api, assembled.blocks, mode.label()).await?;
        let parsed = reply::parse(&response.content, &character.name);

        if let Some(rewind) = rewind {
            self.store
                .update_character(&self.character_id, |c| rewind.apply(c))
                .await?;
        }

        let plan = DeliveryPlan::build(parsed, &mode, self.options.pacing);
        self.deliver(plan, &mode).await
    }

    /// Commit each planned bubble after its delay. Stops early if the
    /// character or target scenario disappears mid-delivery.
    async fn deliver(&self, plan: DeliveryPlan, mode: &ChatMode) -> Result<Vec<Message>> {
        let mut delivered = Vec::with_capacity(plan.len());
        let mut stream = std::pin::pin!(plan.into_stream());

        while let Some(message) = stream.next().await {
            let landed = self
                .store
                .update_character(&self.character_id, |c| {
                    let timeline = Timeline::resolve(c, mode).ok()?;
                    timeline.messages_mut(c)?.push(message.clone());
                    Some(())
                })
                .await?
                .flatten();

            if landed.is_none() {
                warn!(
                    character = %self.character_id,
                    delivered = delivered.len(),
                    "Conversation target is gone; stopping delivery"
                );
                break;
            }

            self.events.publish(DomainEvent::BubbleDelivered {
                character_id: self.character_id.clone(),
                message_id: message.id.clone(),
                index: delivered.len(),
                timestamp: Utc::now(),
            });
            delivered.push(message);
        }

        self.events.publish(DomainEvent::GenerationFinished {
            character_id: self.character_id.clone(),
            bubbles: delivered.len(),
            timestamp: Utc::now(),
        });
        info!(
            character = %self.character_id,
            mode = mode.label(),
            bubbles = delivered.len(),
            "Reply delivered"
        );
        Ok(delivered)
    }

    // ── Message edits ─────────────────────────────────────────────────────

    /// Timeline edits address the current view's timeline; the theater list
    /// addresses the main one.
    fn edit_target(&self, character: &Character) -> Result<Timeline> {
        match self.view().mode() {
            Some(mode) => Ok(Timeline::resolve(character, &mode)?),
            None => Ok(Timeline::Main),
        }
    }

    async fn with_message_list<F, R>(&self, id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<Message>, usize) -> R,
    {
        let target = self.edit_target(&self.snapshot().await?)?;
        self.store
            .update_character(&self.character_id, |c| {
                let list = target.messages_mut(c)?;
                let index = list.iter().position(|m| m.id == id)?;
                Some(f(list, index))
            })
            .await?
            .flatten()
            .ok_or_else(|| ChatError::MessageNotFound(id.to_string()).into())
    }

    pub async fn delete_message(&self, id: &str) -> Result<Message> {
        self.with_message_list(id, |list, i| list.remove(i)).await
    }

    /// Replace a message with the recall placeholder, keeping the original.
    pub async fn recall_message(&self, id: &str) -> Result<Message> {
        self.with_message_list(id, |list, i| {
            list[i].recall();
            list[i].clone()
        })
        .await
    }

    /// The pre-recall text of a message.
    pub async fn reveal_message(&self, id: &str) -> Result<String> {
        let character = self.snapshot().await?;
        let target = self.edit_target(&character)?;
        target
            .messages(&character)
            .and_then(|list| list.iter().find(|m| m.id == id))
            .map(|m| m.revealed().to_string())
            .ok_or_else(|| ChatError::MessageNotFound(id.to_string()).into())
    }

    /// Replace a message's content in place. Nothing is regenerated.
    pub async fn edit_message(&self, id: &str, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyInput("edited content is empty".into()).into());
        }
        self.with_message_list(id, |list, i| {
            list[i].content = content.to_string();
            list[i].clone()
        })
        .await
    }

    /// Stage a message as the quote for the next outgoing message.
    pub async fn quote_message(&self, id: &str) -> Result<QuoteRef> {
        let character = self.snapshot().await?;
        let settings = self.store.settings().await;
        let target = self.edit_target(&character)?;
        let message = target
            .messages(&character)
            .and_then(|list| list.iter().find(|m| m.id == id))
            .ok_or_else(|| ChatError::MessageNotFound(id.to_string()))?;

        let quote = QuoteRef {
            message_id: message.id.clone(),
            snippet: message.content.chars().take(QUOTE_SNIPPET_CHARS).collect(),
            speaker: character.speaker_label(message.role, &settings).to_string(),
        };
        self.state().staged_quote = Some(quote.clone());
        Ok(quote)
    }

    pub fn clear_quote(&self) {
        self.state().staged_quote = None;
    }
}

fn timeline_id(timeline: &Timeline) -> String {
    match timeline {
        Timeline::Main => "main".into(),
        Timeline::Scenario(id) => id.clone(),
    }
}
