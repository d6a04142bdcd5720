//! `pocketline chat`: an interactive phone session with one character.
//!
//! Plain lines are sent as messages; lines starting with `/` are commands.
//! The `[n]` labels printed next to messages are what the message commands
//! take as their argument.

use super::scenario::{find_scenario, print_list};
use super::{App, CmdResult};
use pocketline_chat::{BusyFlag, ChatSession, SessionOptions, Transition, View};
use pocketline_core::character::{Character, MemoryCard};
use pocketline_core::event::{DomainEvent, EventBus};
use pocketline_core::message::{Message, Role};
use pocketline_core::settings::AppSettings;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

const BANNER_HISTORY: usize = 12;

const HELP: &str = "  Views:     /online  /offline  /theater  /enter <n|title>  /exit
  Replies:   /reply  /regen [n]
  Messages:  /history  /recall <n>  /reveal <n>  /edit <n> <text>  /delete <n>
             /quote <n>  /unquote
  Memory:    /summarize  /cards  /select <n>  /forget <n>  /fuse  /diary
  Other:     /help  /quit
  Start a line with // to send a message that begins with a slash.";

/// One parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Empty,
    Say(String),
    Help,
    Quit,
    Online,
    Offline,
    Theater,
    Enter(String),
    Exit,
    Reply,
    Regen(Option<usize>),
    History,
    Recall(usize),
    Reveal(usize),
    Edit(usize, String),
    Delete(usize),
    Quote(usize),
    Unquote,
    Summarize,
    Cards,
    Select(usize),
    Forget(usize),
    Fuse,
    Diary,
    /// Malformed command; carries the usage line to show
    Usage(&'static str),
    Unknown(String),
}

fn position(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if let Some(literal) = line.strip_prefix("//") {
            return Self::Say(format!("/{literal}"));
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let indexed = |make: fn(usize) -> Self, usage: &'static str| match position(arg) {
            Some(n) => make(n),
            None => Self::Usage(usage),
        };

        match name.to_ascii_lowercase().as_str() {
            "help" | "?" => Self::Help,
            "quit" | "q" => Self::Quit,
            "online" | "chat" => Self::Online,
            "offline" => Self::Offline,
            "theater" => Self::Theater,
            "enter" if arg.is_empty() => Self::Usage("/enter <n|title>"),
            "enter" => Self::Enter(arg.to_string()),
            "exit" | "leave" => Self::Exit,
            "reply" => Self::Reply,
            "regen" if arg.is_empty() => Self::Regen(None),
            "regen" => indexed(|n| Self::Regen(Some(n)), "/regen [n]"),
            "history" => Self::History,
            "recall" => indexed(Self::Recall, "/recall <n>"),
            "reveal" => indexed(Self::Reveal, "/reveal <n>"),
            "delete" => indexed(Self::Delete, "/delete <n>"),
            "quote" => indexed(Self::Quote, "/quote <n>"),
            "unquote" => Self::Unquote,
            "edit" => match arg
                .split_once(char::is_whitespace)
                .and_then(|(n, text)| Some((position(n)?, text.trim())))
            {
                Some((n, text)) if !text.is_empty() => Self::Edit(n, text.to_string()),
                _ => Self::Usage("/edit <n> <text>"),
            },
            "summarize" => Self::Summarize,
            "cards" => Self::Cards,
            "select" => indexed(Self::Select, "/select <n>"),
            "forget" => indexed(Self::Forget, "/forget <n>"),
            "fuse" => Self::Fuse,
            "diary" => Self::Diary,
            other => Self::Unknown(other.to_string()),
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run(key: &str) -> CmdResult {
    let app = App::open().await?;
    let character = app.character(key).await?;
    let events = Arc::new(EventBus::default());
    let session = ChatSession::open(
        character.id.clone(),
        app.provider(),
        app.store.clone(),
        events.clone(),
        BusyFlag::new(),
        SessionOptions::from_config(&app.config),
    )
    .await?;
    let mut rx = events.subscribe();

    println!("📱 {}", character.display_name());
    println!("================");
    println!("  Type a message, or /help for commands.\n");
    if !app.store.settings().await.api.has_api_key() && app.config.api_key.is_none() {
        println!("  ⚠️  No API key set. Run `pocketline settings set api_key <key>`.\n");
    }
    print_history(&app, &session, Some(BANNER_HISTORY)).await?;

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        while rx.try_recv().is_ok() {}
        let prompt = prompt_label(&app, &session).await;
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match execute(&app, &session, &mut rx, ReplCommand::parse(&line)).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("  ⚠️  {e}"),
        }
    }

    println!("\n👋 Bye!");
    Ok(())
}

async fn execute(
    app: &App,
    session: &ChatSession,
    rx: &mut broadcast::Receiver<Arc<DomainEvent>>,
    command: ReplCommand,
) -> CmdResult<Flow> {
    match command {
        ReplCommand::Empty => {}
        ReplCommand::Quit => return Ok(Flow::Quit),
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Usage(usage) => println!("  Usage: {usage}"),
        ReplCommand::Unknown(name) => println!("  Unknown command /{name}. Try /help."),

        ReplCommand::Say(text) => {
            drive(session.send(&text), rx, app, session).await?;
        }
        ReplCommand::Reply => {
            drive(session.invite_reply(), rx, app, session).await?;
        }
        ReplCommand::Regen(target) => {
            let id = match target {
                Some(n) => Some(message_at(session, n).await?.id),
                None => None,
            };
            println!("  🔄 Regenerating…");
            drive(session.regenerate(id.as_deref()), rx, app, session).await?;
        }

        ReplCommand::Online => {
            session.navigate(Transition::OpenChat).await?;
            println!("  💬 Back on the phone");
            print_history(app, session, Some(BANNER_HISTORY)).await?;
        }
        ReplCommand::Offline => {
            session.navigate(Transition::OpenOffline).await?;
            println!("  ☕ Face to face");
            print_history(app, session, Some(BANNER_HISTORY)).await?;
        }
        ReplCommand::Theater => {
            session.navigate(Transition::OpenTheaterList).await?;
            println!("  🎭 Theater");
            print_list(&character(app, session).await?);
            println!("  Enter one with /enter <n|title>.");
        }
        ReplCommand::Enter(key) => {
            let owner = character(app, session).await?;
            let scenario = find_scenario(&owner, &key)
                .ok_or_else(|| format!("no scenario matches '{key}'"))?;
            session
                .navigate(Transition::EnterRoom(scenario.id.clone()))
                .await?;
            println!("  🎭 {}", scenario.title);
            if !scenario.description.is_empty() {
                println!("     {}", scenario.description);
            }
            print_history(app, session, Some(BANNER_HISTORY)).await?;
        }
        ReplCommand::Exit => {
            if !matches!(session.view(), View::TheaterRoom { .. }) {
                return Err("you are not in a scenario".into());
            }
            session.navigate(Transition::OpenTheaterList).await?;
            println!("  🎭 Back to the theater");
            print_list(&character(app, session).await?);
        }

        ReplCommand::History => print_history(app, session, None).await?,
        ReplCommand::Recall(n) => {
            let target = message_at(session, n).await?;
            session.recall_message(&target.id).await?;
            println!("  ↩️  Recalled [{n}]");
        }
        ReplCommand::Reveal(n) => {
            let target = message_at(session, n).await?;
            let original = session.reveal_message(&target.id).await?;
            println!("  🔍 [{n}] {original}");
        }
        ReplCommand::Edit(n, text) => {
            let target = message_at(session, n).await?;
            session.edit_message(&target.id, &text).await?;
            println!("  ✏️  Edited [{n}]");
        }
        ReplCommand::Delete(n) => {
            let target = message_at(session, n).await?;
            session.delete_message(&target.id).await?;
            println!("  🗑️  Deleted [{n}]");
        }
        ReplCommand::Quote(n) => {
            let target = message_at(session, n).await?;
            let quote = session.quote_message(&target.id).await?;
            println!("  ↳ Quoting {}: \"{}\"", quote.speaker, quote.snippet);
        }
        ReplCommand::Unquote => {
            session.clear_quote();
            println!("  Quote cleared");
        }

        ReplCommand::Summarize => {
            println!("  🧠 Summarizing…");
            let card = session.summarize().await?;
            println!("  🧠 New memory {}", card.render_line());
        }
        ReplCommand::Cards => {
            let owner = character(app, session).await?;
            print_cards(&owner.memories);
        }
        ReplCommand::Select(n) => {
            let card = card_at(app, session, n).await?;
            let selected = session.toggle_card_selection(&card.id).await?;
            println!(
                "  {} [{n}] {}",
                if selected { "●" } else { "○" },
                card.render_line()
            );
        }
        ReplCommand::Forget(n) => {
            let card = card_at(app, session, n).await?;
            session.delete_card(&card.id).await?;
            println!("  🗑️  Forgot [{n}]");
        }
        ReplCommand::Fuse => {
            println!("  🔥 Fusing…");
            let card = session.fuse_selected().await?;
            println!("  🔥 Fused into {}", card.render_line());
        }
        ReplCommand::Diary => {
            println!("  📔 Writing…");
            let entry = session.write_diary().await?;
            super::diary::print_entries(std::slice::from_ref(&entry));
        }
    }
    Ok(Flow::Continue)
}

/// Run a session call while printing events it publishes, then flush
/// whatever arrived after it finished.
async fn drive<T>(
    work: impl Future<Output = T>,
    rx: &mut broadcast::Receiver<Arc<DomainEvent>>,
    app: &App,
    session: &ChatSession,
) -> T {
    tokio::pin!(work);
    let out = loop {
        tokio::select! {
            out = &mut work => break out,
            event = rx.recv() => {
                if let Ok(event) = event {
                    show_event(&event, app, session).await;
                }
            }
        }
    };
    while let Ok(event) = rx.try_recv() {
        show_event(&event, app, session).await;
    }
    out
}

async fn show_event(event: &DomainEvent, app: &App, session: &ChatSession) {
    match event {
        DomainEvent::GenerationStarted { .. } => {
            if let Ok(c) = character(app, session).await {
                println!("  {} is typing…", c.name);
            }
        }
        DomainEvent::BubbleDelivered { message_id, .. } => {
            let (Ok(owner), Ok(timeline)) = (character(app, session).await, session.timeline().await)
            else {
                return;
            };
            let settings = app.store.settings().await;
            if let Some((i, m)) = timeline.iter().enumerate().find(|(_, m)| m.id == *message_id) {
                println!("{}", render_message(i + 1, m, &owner, &settings));
            }
        }
        _ => {}
    }
}

async fn character(app: &App, session: &ChatSession) -> CmdResult<Character> {
    app.store
        .character(session.character_id())
        .await
        .ok_or_else(|| "this character was deleted".into())
}

async fn message_at(session: &ChatSession, n: usize) -> CmdResult<Message> {
    let timeline = session.timeline().await?;
    n.checked_sub(1)
        .and_then(|i| timeline.get(i))
        .cloned()
        .ok_or_else(|| format!("no message [{n}] here").into())
}

async fn card_at(app: &App, session: &ChatSession, n: usize) -> CmdResult<MemoryCard> {
    let owner = character(app, session).await?;
    n.checked_sub(1)
        .and_then(|i| owner.memories.get(i))
        .cloned()
        .ok_or_else(|| format!("no memory card [{n}]").into())
}

async fn prompt_label(app: &App, session: &ChatSession) -> String {
    let quote = session
        .staged_quote()
        .map(|q| format!("  ↳ {}: \"{}\"\n", q.speaker, q.snippet))
        .unwrap_or_default();
    let place = match session.view() {
        View::Chat => String::new(),
        View::Offline => " (face to face)".into(),
        View::TheaterList => return format!("{quote}  Theater > "),
        View::TheaterRoom { scenario_id } => character(app, session)
            .await
            .ok()
            .and_then(|c| c.scenario(&scenario_id).map(|s| format!(" ({})", s.title)))
            .unwrap_or_default(),
    };
    format!("{quote}  You{place} > ")
}

async fn print_history(app: &App, session: &ChatSession, last: Option<usize>) -> CmdResult {
    if session.view() == View::TheaterList {
        return Ok(());
    }
    let owner = character(app, session).await?;
    let settings = app.store.settings().await;
    let timeline = session.timeline().await?;
    let skip = last.map_or(0, |n| timeline.len().saturating_sub(n));
    if skip > 0 {
        println!("  … {skip} earlier messages, /history shows all");
    }
    for (i, m) in timeline.iter().enumerate().skip(skip) {
        println!("{}", render_message(i + 1, m, &owner, &settings));
    }
    println!();
    Ok(())
}

fn print_cards(cards: &[MemoryCard]) {
    if cards.is_empty() {
        println!("  No memories yet. /summarize makes one.");
        return;
    }
    for (i, card) in cards.iter().enumerate() {
        let mark = if card.selected { "●" } else { "○" };
        println!("  {mark} [{}] {}", i + 1, card.render_line());
    }
}

/// One timeline entry as printed in the terminal.
pub fn render_message(
    number: usize,
    m: &Message,
    character: &Character,
    settings: &AppSettings,
) -> String {
    if m.nudge {
        return format!("  [{number}] ✦ {} ✦", m.content);
    }
    if m.role == Role::System {
        return format!("  [{number}] · {}", m.content);
    }

    let mut out = String::new();
    if let Some(quote) = &m.quote {
        out.push_str(&format!("        ↳ {}: \"{}\"\n", quote.speaker, quote.snippet));
    }
    let speaker = character.speaker_label(m.role, settings);
    let body = if m.recalled {
        format!("({})", m.content)
    } else {
        m.content.replace('\n', "\n        ")
    };
    out.push_str(&format!("  [{number}] {speaker} > {body}"));

    if character.show_inner_monologue && !m.recalled {
        if let Some(thought) = &m.inner_thought {
            out.push_str(&format!("\n        💭 {thought}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketline_core::message::{ModeTag, QuoteRef};

    #[test]
    fn plain_lines_are_messages() {
        assert_eq!(ReplCommand::parse("  hi there "), ReplCommand::Say("hi there".into()));
        assert_eq!(ReplCommand::parse("//shrug"), ReplCommand::Say("/shrug".into()));
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
    }

    #[test]
    fn commands_take_positions() {
        assert_eq!(ReplCommand::parse("/recall 3"), ReplCommand::Recall(3));
        assert_eq!(ReplCommand::parse("/REGEN"), ReplCommand::Regen(None));
        assert_eq!(ReplCommand::parse("/regen 2"), ReplCommand::Regen(Some(2)));
        assert_eq!(
            ReplCommand::parse("/edit 4 see you at 8"),
            ReplCommand::Edit(4, "see you at 8".into())
        );
        assert_eq!(ReplCommand::parse("/enter Rainy Cafe"), ReplCommand::Enter("Rainy Cafe".into()));
    }

    #[test]
    fn malformed_commands_show_usage() {
        assert_eq!(ReplCommand::parse("/recall"), ReplCommand::Usage("/recall <n>"));
        assert_eq!(ReplCommand::parse("/delete 0"), ReplCommand::Usage("/delete <n>"));
        assert_eq!(ReplCommand::parse("/edit 2"), ReplCommand::Usage("/edit <n> <text>"));
        assert_eq!(ReplCommand::parse("/enter"), ReplCommand::Usage("/enter <n|title>"));
        assert_eq!(ReplCommand::parse("/dance"), ReplCommand::Unknown("dance".into()));
    }

    fn lin() -> (Character, AppSettings) {
        let mut c = Character::new("Lin");
        c.show_inner_monologue = true;
        let mut s = AppSettings::default();
        s.persona.name = "Sam".into();
        (c, s)
    }

    #[test]
    fn model_message_shows_thought_when_enabled() {
        let (mut c, s) = lin();
        let mut m = Message::model("hey", ModeTag::Online);
        m.inner_thought = Some("finally".into());
        assert_eq!(render_message(2, &m, &c, &s), "  [2] Lin > hey\n        💭 finally");

        c.show_inner_monologue = false;
        assert_eq!(render_message(2, &m, &c, &s), "  [2] Lin > hey");
    }

    #[test]
    fn quote_and_recall_render() {
        let (c, s) = lin();
        let mut m = Message::user("sure", ModeTag::Online);
        m.quote = Some(QuoteRef {
            message_id: "x".into(),
            snippet: "dinner?".into(),
            speaker: "Lin".into(),
        });
        assert_eq!(
            render_message(1, &m, &c, &s),
            "        ↳ Lin: \"dinner?\"\n  [1] Sam > sure"
        );

        let mut r = Message::user("oops", ModeTag::Online);
        r.recall();
        assert!(render_message(1, &r, &c, &s).ends_with("Sam > (This message was recalled)"));
    }

    #[test]
    fn nudge_renders_as_notice() {
        let (c, s) = lin();
        let m = Message::nudge("Lin nudged you", ModeTag::Online);
        assert_eq!(render_message(5, &m, &c, &s), "  [5] ✦ Lin nudged you ✦");
    }
}
