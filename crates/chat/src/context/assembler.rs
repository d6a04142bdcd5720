//! Context assembly pipeline.
//!
//! Builds the ordered block list for one reply request:
//!
//! 1. **System** (the mode's prompt template plus injected sections)
//! 2. **History** (the trailing eligible slice for the mode, oldest first)
//! 3. **Closing** (a mode-specific format instruction)
//!
//! Each mode is a [`ModeStrategy`]; the strategies share the section
//! renderers and history helpers below.
//!
//! # Determinism
//!
//! Assembly reads only its inputs. The wall clock is passed in as
//! [`AssemblyInput::now`], so identical inputs always produce identical
//! blocks.

use super::history::{self, HistorySlice};
use super::mode::{ChatMode, Timeline};
use crate::prompts;
use crate::template::{self, TemplateVars};
use chrono::{DateTime, FixedOffset};
use pocketline_core::character::{Character, MemoryCard, Scenario};
use pocketline_core::error::ChatError;
use pocketline_core::message::{ModeTag, Role};
use pocketline_core::provider::PromptBlock;
use pocketline_core::settings::AppSettings;
use serde::{Deserialize, Serialize};

// ── Types ─────────────────────────────────────────────────────────────────

/// All inputs required for a single reply request.
pub struct AssemblyInput<'a> {
    /// Character snapshot taken when the request started.
    pub character: &'a Character,
    /// Settings snapshot taken when the request started.
    pub settings: &'a AppSettings,
    pub mode: &'a ChatMode,
    /// Local wall-clock time, used only by real-time-aware characters.
    pub now: DateTime<FixedOffset>,
}

/// The assembled request body.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub blocks: Vec<PromptBlock>,
    pub metadata: AssemblyMetadata,
}

/// What went into an assembled context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    pub mode: String,
    /// Names of the system sections included, in order.
    pub sections: Vec<String>,
    pub history_included: usize,
    /// Eligible history entries before the limit was applied.
    pub history_available: usize,
}

/// One named piece of the system block.
struct Section {
    name: &'static str,
    text: String,
}

impl Section {
    fn new(name: &'static str, text: impl Into<String>) -> Self {
        Self {
            name,
            text: text.into(),
        }
    }
}

// ── Strategy interface ────────────────────────────────────────────────────

/// One implementation per conversational mode.
trait ModeStrategy {
    fn timeline(&self) -> Timeline;

    fn system_sections(&self, input: &AssemblyInput<'_>, vars: &TemplateVars) -> Vec<Section>;

    fn closing(&self, input: &AssemblyInput<'_>, vars: &TemplateVars) -> String;
}

struct OnlineStrategy;
struct OfflineStrategy;
struct TheaterStrategy<'a> {
    scenario: &'a Scenario,
}

impl ModeStrategy for OnlineStrategy {
    fn timeline(&self) -> Timeline {
        Timeline::Main
    }

    fn system_sections(&self, input: &AssemblyInput<'_>, vars: &TemplateVars) -> Vec<Section> {
        let c = input.character;
        let mut prompt = c.system_prompt.clone();
        if c.show_inner_monologue {
            let block = c
                .inner_monologue_prompt
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(prompts::DEFAULT_INNER_MONOLOGUE);
            prompt.push_str("\n\n");
            prompt.push_str(block);
        }

        let mut sections = vec![Section::new("prompt", template::render(&prompt, vars))];
        sections.extend(persona_section(input));
        if c.real_time_aware {
            let now = input.now.format("%A, %Y-%m-%d %H:%M").to_string();
            let vars = TemplateVars::new().set("now", now);
            sections.push(Section::new(
                "real_time",
                template::render(prompts::REAL_TIME_SECTION, &vars),
            ));
        }
        sections.extend(memory_section(&c.memories));
        sections.extend(context_memory_section(&c.context_memory));
        sections.extend(return_notice_section(c));
        sections
    }

    fn closing(&self, _input: &AssemblyInput<'_>, vars: &TemplateVars) -> String {
        template::render(prompts::ONLINE_CLOSING, vars)
    }
}

impl ModeStrategy for OfflineStrategy {
    fn timeline(&self) -> Timeline {
        Timeline::Main
    }

    fn system_sections(&self, input: &AssemblyInput<'_>, vars: &TemplateVars) -> Vec<Section> {
        let c = input.character;
        let mut sections = vec![Section::new(
            "prompt",
            template::render(&c.offline.system_prompt, vars),
        )];
        sections.extend(memory_section(&c.memories));
        sections.extend(context_memory_section(&c.context_memory));
        sections
    }

    fn closing(&self, _input: &AssemblyInput<'_>, vars: &TemplateVars) -> String {
        template::render(prompts::OFFLINE_CLOSING, vars)
    }
}

impl ModeStrategy for TheaterStrategy<'_> {
    fn timeline(&self) -> Timeline {
        if self.scenario.connected {
            Timeline::Main
        } else {
            Timeline::Scenario(self.scenario.id.clone())
        }
    }

    fn system_sections(&self, input: &AssemblyInput<'_>, vars: &TemplateVars) -> Vec<Section> {
        let s = self.scenario;
        let mut header = format!("{} {}", prompts::SCENARIO_HEADER, s.title);
        if !s.description.trim().is_empty() {
            header.push('\n');
            header.push_str(s.description.trim());
        }
        if !s.system_prompt.trim().is_empty() {
            header.push_str("\n\n");
            header.push_str(&template::render(&s.system_prompt, vars));
        }

        let mut sections = vec![Section::new("scenario", header)];
        sections.extend(persona_section(input));
        if s.connected {
            sections.extend(memory_section(&input.character.memories));
            sections.extend(context_memory_section(&input.character.context_memory));
        } else {
            sections.extend(context_memory_section(&s.context_memory));
        }
        sections
    }

    fn closing(&self, _input: &AssemblyInput<'_>, vars: &TemplateVars) -> String {
        template::render(prompts::THEATER_CLOSING, vars)
    }
}

fn strategy_for<'a>(
    character: &'a Character,
    mode: &ChatMode,
) -> Result<Box<dyn ModeStrategy + 'a>, ChatError> {
    Ok(match mode {
        ChatMode::Online => Box::new(OnlineStrategy),
        ChatMode::Offline => Box::new(OfflineStrategy),
        ChatMode::Theater { scenario_id } => {
            let scenario = character
                .scenario(scenario_id)
                .ok_or_else(|| ChatError::ScenarioNotFound(scenario_id.clone()))?;
            Box::new(TheaterStrategy { scenario })
        }
    })
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless; create one and reuse it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the request blocks for `input.mode`.
    ///
    /// Fails only when a theater mode names a scenario the character no
    /// longer has.
    pub fn assemble(&self, input: &AssemblyInput<'_>) -> Result<AssembledContext, ChatError> {
        let strategy = strategy_for(input.character, input.mode)?;
        let vars = template_vars(input);

        let sections = strategy.system_sections(input, &vars);
        let system = sections
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        let timeline = strategy.timeline();
        let HistorySlice {
            messages,
            available,
        } = history::slice(
            input.character,
            input.mode,
            &timeline,
            input.character.history_limit,
        );

        let mut blocks = Vec::with_capacity(messages.len() + 2);
        blocks.push(PromptBlock::system(system));
        blocks.extend(messages.iter().map(|m| history::serialize(m)));
        blocks.push(PromptBlock::system(strategy.closing(input, &vars)));

        Ok(AssembledContext {
            blocks,
            metadata: AssemblyMetadata {
                mode: input.mode.label().into(),
                sections: sections.iter().map(|s| s.name.to_string()).collect(),
                history_included: messages.len(),
                history_available: available,
            },
        })
    }
}

// ── Shared section renderers ──────────────────────────────────────────────

fn template_vars(input: &AssemblyInput<'_>) -> TemplateVars {
    let c = input.character;
    let (user, _) = c.user_identity(input.settings);
    let vars = TemplateVars::new()
        .set("char", c.name.as_str())
        .set("user", user)
        .set("personality", c.personality.as_str())
        .set("style", c.offline.style.as_str())
        .set("word_count", c.offline.word_count.to_string());
    match input.mode {
        ChatMode::Theater { scenario_id } => {
            vars.set_opt("title", c.scenario(scenario_id).map(|s| s.title.as_str()))
        }
        _ => vars,
    }
}

fn persona_section(input: &AssemblyInput<'_>) -> Option<Section> {
    let (name, description) = input.character.user_identity(input.settings);
    let description = description.trim();
    (!description.is_empty())
        .then(|| Section::new("persona", format!("[About {name}]\n{description}")))
}

fn memory_section(cards: &[MemoryCard]) -> Option<Section> {
    if cards.is_empty() {
        return None;
    }
    let lines: Vec<String> = cards.iter().map(MemoryCard::render_line).collect();
    Some(Section::new(
        "memories",
        format!("{}\n{}", prompts::MEMORY_HEADER, lines.join("\n")),
    ))
}

fn context_memory_section(text: &str) -> Option<Section> {
    let text = text.trim();
    (!text.is_empty()).then(|| {
        Section::new(
            "context_memory",
            format!("{}\n{text}", prompts::CONTEXT_MEMORY_HEADER),
        )
    })
}

/// A hidden departure signal newer than any visible online entry means the
/// user just came back from a connected scenario.
fn return_notice_section(character: &Character) -> Option<Section> {
    let messages = &character.messages;
    let signal = messages
        .iter()
        .rposition(|m| m.hidden && m.role == Role::System)?;
    let last_visible = messages
        .iter()
        .rposition(|m| m.mode == ModeTag::Online && m.is_context_eligible());
    if last_visible.is_some_and(|i| i > signal) {
        return None;
    }
    Some(Section::new(
        "return_notice",
        format!(
            "{}\n{}",
            prompts::RETURN_NOTICE_HEADER,
            messages[signal].content
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketline_core::character::UserMask;
    use pocketline_core::message::Message;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-03-06T21:30:00+08:00").unwrap()
    }

    fn lin() -> Character {
        let mut c = Character::new("Lin");
        c.personality = "dry humor".into();
        c
    }

    fn assemble(c: &Character, settings: &AppSettings, mode: &ChatMode) -> AssembledContext {
        ContextAssembler::new()
            .assemble(&AssemblyInput {
                character: c,
                settings,
                mode,
                now: now(),
            })
            .unwrap()
    }

    #[test]
    fn online_blocks_are_system_history_closing() {
        let mut c = lin();
        c.messages.push(Message::user("hi", ModeTag::Online));
        c.messages.push(Message::model("hey", ModeTag::Online));
        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Online);

        assert_eq!(ctx.blocks.len(), 4);
        assert_eq!(ctx.blocks[0].role, Role::System);
        assert!(ctx.blocks[0].content.contains("You are Lin, texting Me"));
        assert!(ctx.blocks[0].content.contains("dry humor"));
        assert_eq!(ctx.blocks[1].content, "hi");
        assert_eq!(ctx.blocks[2].role, Role::Model);
        assert_eq!(ctx.blocks[3].role, Role::System);
        assert!(ctx.blocks[3].content.contains("|||"));
        assert_eq!(ctx.metadata.mode, "online");
        assert_eq!(ctx.metadata.history_included, 2);
    }

    #[test]
    fn online_injects_monologue_persona_time_and_memory() {
        let mut c = lin();
        c.show_inner_monologue = true;
        c.real_time_aware = true;
        c.context_memory = "They met at a bookshop.".into();
        c.memories.push(MemoryCard::new("First date", "Went for noodles"));
        let mut settings = AppSettings::default();
        settings.persona.description = "A night-shift nurse".into();

        let ctx = assemble(&c, &settings, &ChatMode::Online);
        let system = &ctx.blocks[0].content;
        assert!(system.contains("<os></os>"));
        assert!(system.contains("[About Me]\nA night-shift nurse"));
        assert!(system.contains("Friday, 2026-03-06 21:30"));
        assert!(system.contains("First date"));
        assert!(system.contains("[Context]\nThey met at a bookshop."));
        assert_eq!(
            ctx.metadata.sections,
            ["prompt", "persona", "real_time", "memories", "context_memory"]
        );
    }

    #[test]
    fn mask_overrides_global_persona() {
        let mut c = lin();
        c.use_mask = true;
        c.mask = Some(UserMask {
            name: "Rin".into(),
            avatar: None,
            description: "A violinist".into(),
        });
        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Online);
        assert!(ctx.blocks[0].content.contains("texting Rin"));
        assert!(ctx.blocks[0].content.contains("[About Rin]\nA violinist"));
    }

    #[test]
    fn offline_uses_prose_prompt_and_offline_history() {
        let mut c = lin();
        c.offline.word_count = 120;
        c.messages.push(Message::user("online", ModeTag::Online));
        c.messages.push(Message::user("walks in", ModeTag::Offline));
        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Offline);

        assert!(ctx.blocks[0].content.contains("meeting Me in person"));
        assert!(ctx.blocks[0].content.contains("about 120 words"));
        assert_eq!(ctx.blocks.len(), 3);
        assert_eq!(ctx.blocks[1].content, "walks in");
        assert!(ctx.blocks[2].content.contains("immersive prose"));
    }

    #[test]
    fn connected_theater_carries_character_memory() {
        let mut c = lin();
        c.context_memory = "Main memory".into();
        let mut room = Scenario::new("Rainy Cafe", "You run the cafe, {char}.", true);
        room.context_memory = "Room memory".into();
        let id = room.id.clone();
        c.scenarios.push(room);
        c.messages
            .push(Message::user("a latte please", ModeTag::Theater).in_scenario(&id));
        c.messages.push(Message::user("texting", ModeTag::Online));

        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Theater { scenario_id: id });
        let system = &ctx.blocks[0].content;
        assert!(system.starts_with("[Scenario] Rainy Cafe"));
        assert!(system.contains("You run the cafe, Lin."));
        assert!(system.contains("Main memory"));
        assert!(!system.contains("Room memory"));
        assert_eq!(ctx.blocks[1].content, "a latte please");
        assert_eq!(ctx.blocks.len(), 3);
        assert!(ctx.blocks[2].content.contains("\"Rainy Cafe\""));
    }

    #[test]
    fn independent_theater_uses_private_memory_and_list() {
        let mut c = lin();
        c.context_memory = "Main memory".into();
        c.memories.push(MemoryCard::new("Shared", "should not appear"));
        let mut room = Scenario::new("Castle", "", false);
        room.context_memory = "Room memory".into();
        room.messages.push(Message::user("knock knock", ModeTag::Theater));
        let id = room.id.clone();
        c.scenarios.push(room);

        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Theater { scenario_id: id });
        let system = &ctx.blocks[0].content;
        assert!(system.contains("Room memory"));
        assert!(!system.contains("Main memory"));
        assert!(!system.contains("should not appear"));
        assert_eq!(ctx.blocks[1].content, "knock knock");
    }

    #[test]
    fn missing_scenario_is_reported() {
        let c = lin();
        let err = ContextAssembler::new()
            .assemble(&AssemblyInput {
                character: &c,
                settings: &AppSettings::default(),
                mode: &ChatMode::Theater {
                    scenario_id: "gone".into(),
                },
                now: now(),
            })
            .unwrap_err();
        assert_eq!(err, ChatError::ScenarioNotFound("gone".into()));
    }

    #[test]
    fn departure_signal_adds_return_notice_until_next_online_turn() {
        let mut c = lin();
        c.messages.push(Message::user("hi", ModeTag::Online));
        c.messages
            .push(Message::hidden_signal("Me and Lin have left the scenario", ModeTag::Online));

        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Online);
        assert!(ctx.blocks[0].content.contains("[Recent change]"));
        assert_eq!(ctx.metadata.history_included, 1);

        c.messages.push(Message::user("back", ModeTag::Online));
        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Online);
        assert!(!ctx.blocks[0].content.contains("[Recent change]"));
    }

    #[test]
    fn history_limit_is_applied_after_filtering() {
        let mut c = lin();
        for i in 0..30 {
            c.messages.push(Message::user(format!("u{i}"), ModeTag::Online));
            c.messages.push(Message::user(format!("o{i}"), ModeTag::Offline));
        }
        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Online);
        assert_eq!(ctx.metadata.history_included, 20);
        assert_eq!(ctx.metadata.history_available, 30);
        assert_eq!(ctx.blocks[1].content, "u10");
        assert_eq!(ctx.blocks[20].content, "u29");
    }

    #[test]
    fn offline_history_keeps_the_latest_twenty_offline_turns() {
        let mut c = lin();
        for i in 0..30 {
            c.messages.push(Message::user(format!("o{i}"), ModeTag::Offline));
            c.messages.push(Message::user(format!("u{i}"), ModeTag::Online));
        }
        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Offline);
        assert_eq!(ctx.metadata.history_included, 20);
        assert_eq!(ctx.metadata.history_available, 30);
        assert_eq!(ctx.blocks.len(), 22);
        assert_eq!(ctx.blocks[1].content, "o10");
        assert_eq!(ctx.blocks[20].content, "o29");
    }

    #[test]
    fn connected_theater_history_keeps_the_latest_twenty_room_turns() {
        let mut c = lin();
        let room = Scenario::new("Rainy Cafe", "", true);
        let id = room.id.clone();
        c.scenarios.push(room);
        for i in 0..30 {
            c.messages
                .push(Message::user(format!("s{i}"), ModeTag::Theater).in_scenario(&id));
            c.messages
                .push(Message::user(format!("x{i}"), ModeTag::Theater).in_scenario("elsewhere"));
        }
        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Theater { scenario_id: id });
        assert_eq!(ctx.metadata.history_included, 20);
        assert_eq!(ctx.metadata.history_available, 30);
        assert_eq!(ctx.blocks[1].content, "s10");
        assert_eq!(ctx.blocks[20].content, "s29");
    }

    #[test]
    fn independent_theater_history_keeps_the_latest_twenty_room_turns() {
        let mut c = lin();
        let mut room = Scenario::new("Castle", "", false);
        for i in 0..25 {
            room.messages.push(Message::user(format!("k{i}"), ModeTag::Theater));
        }
        let id = room.id.clone();
        c.scenarios.push(room);
        c.messages.push(Message::user("texting", ModeTag::Online));

        let ctx = assemble(&c, &AppSettings::default(), &ChatMode::Theater { scenario_id: id });
        assert_eq!(ctx.metadata.history_included, 20);
        assert_eq!(ctx.metadata.history_available, 25);
        assert_eq!(ctx.blocks[1].content, "k5");
        assert_eq!(ctx.blocks[20].content, "k24");
    }
}
