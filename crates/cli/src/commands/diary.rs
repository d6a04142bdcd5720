//! `pocketline diary`: the user's own diary, and reading characters' diaries.

use super::{App, CmdResult};
use clap::Subcommand;
use pocketline_core::character::DiaryEntry;

#[derive(Subcommand)]
pub enum DiaryCommand {
    /// Write a page in your own diary
    Add {
        title: String,
        content: String,

        #[arg(short, long)]
        mood: Option<String>,
    },

    /// Read diary pages: yours, or a character's with --character
    List {
        #[arg(short, long)]
        character: Option<String>,
    },
}

pub async fn run(command: DiaryCommand) -> CmdResult {
    let app = App::open().await?;
    match command {
        DiaryCommand::Add {
            title,
            content,
            mood,
        } => {
            if content.trim().is_empty() {
                return Err("diary content cannot be empty".into());
            }
            let mut entry = DiaryEntry::new(title.trim(), content);
            entry.mood = mood.filter(|m| !m.trim().is_empty());
            app.store.add_user_diary(entry).await?;
            println!("✅ Diary page saved");
        }
        DiaryCommand::List { character } => match character {
            Some(key) => {
                let owner = app.character(&key).await?;
                println!("📔 {}'s diary", owner.name);
                print_entries(&owner.diaries);
            }
            None => {
                println!("📔 Your diary");
                print_entries(&app.store.settings().await.user_diaries);
            }
        },
    }
    Ok(())
}

pub fn print_entries(entries: &[DiaryEntry]) {
    if entries.is_empty() {
        println!("  (empty)");
        return;
    }
    for entry in entries {
        println!();
        println!("{}", render_entry(entry));
    }
}

fn render_entry(entry: &DiaryEntry) -> String {
    let mut header = format!("  {} · {}", entry.timestamp.format("%Y-%m-%d %H:%M"), entry.title);
    if let Some(mood) = &entry.mood {
        header.push_str(&format!(" ({mood})"));
    }
    let body: Vec<String> = entry.content.lines().map(|l| format!("    {l}")).collect();
    format!("{header}\n{}", body.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_renders_mood_and_indented_body() {
        let mut entry = DiaryEntry::new("Monday", "Long shift.\nRain again.");
        entry.mood = Some("tired".into());
        let text = render_entry(&entry);
        assert!(text.contains("Monday (tired)"));
        assert!(text.ends_with("    Long shift.\n    Rain again."));
    }
}
