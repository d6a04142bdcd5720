//! `pocketline character`: create, inspect, edit and delete characters.

use super::{App, CmdResult, confirm, parse_bool, short_id};
use clap::Subcommand;
use pocketline_core::character::{Character, UserMask};

#[derive(Subcommand)]
pub enum CharacterCommand {
    /// Create a character
    Create {
        name: String,

        /// Personality description, injected as {personality}
        #[arg(short, long, default_value = "")]
        personality: String,

        /// Name shown in listings instead of the real name
        #[arg(long)]
        remark: Option<String>,

        /// Messages included per request (defaults to the config value)
        #[arg(long)]
        history_limit: Option<usize>,
    },

    /// List all characters
    List,

    /// Show one character in detail
    Show { character: String },

    /// Change one field
    Set {
        character: String,
        /// name, remark, personality, system_prompt, inner_monologue_prompt,
        /// show_inner_monologue, real_time_aware, use_mask, mask.name,
        /// mask.description, context_memory, history_limit, offline.prompt,
        /// offline.style, offline.word_count or summary_scope
        key: String,
        value: String,
    },

    /// Delete a character and everything it owns
    Delete {
        character: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn run(command: CharacterCommand) -> CmdResult {
    let app = App::open().await?;
    match command {
        CharacterCommand::Create {
            name,
            personality,
            remark,
            history_limit,
        } => {
            if name.trim().is_empty() {
                return Err("character name cannot be empty".into());
            }
            let limit =
                checked_history_limit(history_limit.unwrap_or(app.config.default_history_limit))?;
            let created = app.store.create_character(&name, limit).await?;
            let id = created.id.clone();
            app.store
                .update_character(&id, |c| {
                    c.personality = personality;
                    c.remark = remark.filter(|r| !r.trim().is_empty());
                })
                .await?;
            println!("✅ Created {} ({})", created.name, short_id(&id));
        }
        CharacterCommand::List => {
            let characters = app.store.characters().await;
            if characters.is_empty() {
                println!("No characters yet. Create one with `pocketline character create <name>`.");
            }
            for c in characters.iter() {
                let last = c
                    .messages
                    .iter()
                    .rev()
                    .find(|m| !m.hidden)
                    .map(|m| preview(&m.content))
                    .unwrap_or_default();
                println!("  {}  {:<16} {}", short_id(&c.id), c.display_name(), last);
            }
        }
        CharacterCommand::Show { character } => show(&app.character(&character).await?),
        CharacterCommand::Set {
            character,
            key,
            value,
        } => {
            let target = app.character(&character).await?;
            let mut edited = target.clone();
            apply_field(&mut edited, &key, &value)?;
            app.store.update_character(&target.id, |c| *c = edited).await?;
            println!("✅ {key} updated for {}", target.name);
        }
        CharacterCommand::Delete { character, yes } => {
            let target = app.character(&character).await?;
            let question = format!(
                "Delete {} with {} messages, {} memories and {} scenarios?",
                target.name,
                target.messages.len(),
                target.memories.len(),
                target.scenarios.len()
            );
            if !yes && !confirm(&question).await? {
                println!("Cancelled.");
                return Ok(());
            }
            app.store.delete_character(&target.id).await?;
            println!("🗑️  Deleted {}", target.name);
        }
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut out: String = line.chars().take(40).collect();
    if line.chars().count() > 40 {
        out.push('…');
    }
    out
}

fn show(c: &Character) {
    println!("📇 {} ({})", c.name, c.id);
    if let Some(remark) = &c.remark {
        println!("  Remark:          {remark}");
    }
    println!("  Personality:     {}", c.personality);
    println!("  History limit:   {}", c.history_limit);
    println!("  Inner monologue: {}", if c.show_inner_monologue { "shown" } else { "hidden" });
    println!("  Real time:       {}", if c.real_time_aware { "on" } else { "off" });
    if let (true, Some(mask)) = (c.use_mask, &c.mask) {
        println!("  Mask:            {} ({})", mask.name, mask.description);
    }
    println!(
        "  Offline:         {} style, ~{} words",
        c.offline.style, c.offline.word_count
    );
    println!("  Summary scope:   {}", c.furnace.summary_scope);
    println!("  Messages:        {}", c.messages.len());
    if !c.context_memory.is_empty() {
        println!("  Context memory:  {}", c.context_memory);
    }

    println!("\n  Memories ({}):", c.memories.len());
    for card in &c.memories {
        println!("    {}", card.render_line());
    }

    println!("\n  Scenarios ({}):", c.scenarios.len());
    for s in &c.scenarios {
        let kind = if s.connected { "connected" } else { "independent" };
        println!("    {}  {} [{kind}]", short_id(&s.id), s.title);
    }

    println!("\n  Diary pages: {}", c.diaries.len());
    println!("\n  System prompt:\n{}", indent(&c.system_prompt));
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{key} expects a number, got '{value}'"))
}

fn checked_history_limit(limit: usize) -> Result<usize, String> {
    if limit == 0 {
        return Err("history_limit must be at least 1".into());
    }
    Ok(limit)
}

/// Apply a `key = value` edit to a character.
pub fn apply_field(c: &mut Character, key: &str, value: &str) -> Result<(), String> {
    match key {
        "name" => {
            let name = value.trim();
            if name.is_empty() {
                return Err("name cannot be empty".into());
            }
            c.name = name.to_string();
        }
        "remark" => c.remark = optional(value),
        "personality" => c.personality = value.to_string(),
        "system_prompt" => c.system_prompt = value.to_string(),
        "inner_monologue_prompt" => c.inner_monologue_prompt = optional(value),
        "show_inner_monologue" => c.show_inner_monologue = parse_bool(value)?,
        "real_time_aware" => c.real_time_aware = parse_bool(value)?,
        "use_mask" => c.use_mask = parse_bool(value)?,
        "mask.name" => c.mask.get_or_insert_with(UserMask::default).name = value.trim().to_string(),
        "mask.description" => {
            c.mask.get_or_insert_with(UserMask::default).description = value.to_string()
        }
        "context_memory" => c.context_memory = value.to_string(),
        "history_limit" => c.history_limit = checked_history_limit(number(key, value)?)?,
        "offline.prompt" => c.offline.system_prompt = value.to_string(),
        "offline.style" => c.offline.style = value.to_string(),
        "offline.word_count" => c.offline.word_count = number(key, value)?,
        "summary_scope" => {
            let scope: usize = number(key, value)?;
            if scope == 0 {
                return Err("summary_scope must be at least 1".into());
            }
            c.furnace.summary_scope = scope;
        }
        other => return Err(format!("unknown character field '{other}'")),
    }
    Ok(())
}
