//! `pocketline scenario`: theater scenarios attached to a character.

use super::{App, CmdResult, short_id};
use clap::Subcommand;
use pocketline_core::character::{Character, Scenario};

#[derive(Subcommand)]
pub enum ScenarioCommand {
    /// Add a scenario to a character
    Create {
        character: String,
        title: String,

        /// Scene setup given to the model
        #[arg(short, long, default_value = "")]
        prompt: String,

        /// Shown in listings only
        #[arg(short, long, default_value = "")]
        description: String,

        /// Keep a private timeline and memory instead of sharing the main one
        #[arg(long)]
        independent: bool,
    },

    /// List a character's scenarios
    List { character: String },

    /// Remove a scenario and its private timeline
    Delete { character: String, scenario: String },
}

pub async fn run(command: ScenarioCommand) -> CmdResult {
    let app = App::open().await?;
    match command {
        ScenarioCommand::Create {
            character,
            title,
            prompt,
            description,
            independent,
        } => {
            if title.trim().is_empty() {
                return Err("scenario title cannot be empty".into());
            }
            let owner = app.character(&character).await?;
            let mut scenario = Scenario::new(title.trim(), prompt, !independent);
            scenario.description = description;
            let id = scenario.id.clone();
            app.store.add_scenario(&owner.id, scenario).await?;
            println!("✅ Added \"{}\" to {} ({})", title.trim(), owner.name, short_id(&id));
        }
        ScenarioCommand::List { character } => {
            let owner = app.character(&character).await?;
            print_list(&owner);
        }
        ScenarioCommand::Delete {
            character,
            scenario,
        } => {
            let owner = app.character(&character).await?;
            let target = find_scenario(&owner, &scenario)
                .ok_or_else(|| format!("{} has no scenario '{scenario}'", owner.name))?;
            app.store.remove_scenario(&owner.id, &target.id).await?;
            println!("🗑️  Removed \"{}\"", target.title);
        }
    }
    Ok(())
}

pub fn print_list(owner: &Character) {
    if owner.scenarios.is_empty() {
        println!("  {} has no scenarios yet.", owner.name);
        return;
    }
    for (n, s) in owner.scenarios.iter().enumerate() {
        let kind = if s.connected { "connected" } else { "independent" };
        println!("  {}. {} [{kind}] {}", n + 1, s.title, s.description);
    }
}

/// Resolve a scenario by list position (1-based), id, id prefix or title.
pub fn find_scenario<'a>(owner: &'a Character, key: &str) -> Option<&'a Scenario> {
    let key = key.trim();
    if let Ok(n) = key.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| owner.scenarios.get(i));
    }
    owner
        .scenarios
        .iter()
        .find(|s| s.id == key || s.title.eq_ignore_ascii_case(key))
        .or_else(|| {
            let mut prefixed = owner.scenarios.iter().filter(|s| s.id.starts_with(key));
            match (prefixed.next(), prefixed.next()) {
                (Some(s), None) if key.len() >= 4 => Some(s),
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Character {
        let mut c = Character::new("Lin");
        let mut cafe = Scenario::new("Rainy Cafe", "", true);
        cafe.id = "cafe-0001".into();
        let mut castle = Scenario::new("Castle", "", false);
        castle.id = "castle-0002".into();
        c.scenarios = vec![cafe, castle];
        c
    }

    #[test]
    fn scenario_by_position_title_or_prefix() {
        let c = owner();
        assert_eq!(find_scenario(&c, "2").unwrap().title, "Castle");
        assert_eq!(find_scenario(&c, "rainy cafe").unwrap().id, "cafe-0001");
        assert_eq!(find_scenario(&c, "cast").unwrap().title, "Castle");
    }

    #[test]
    fn out_of_range_position_is_none() {
        let c = owner();
        assert!(find_scenario(&c, "0").is_none());
        assert!(find_scenario(&c, "3").is_none());
    }
}
