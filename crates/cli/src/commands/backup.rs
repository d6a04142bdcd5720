//! `pocketline backup`: one JSON document with settings and all characters.

use super::{App, CmdResult, confirm};
use clap::Subcommand;
use pocketline_store::parse_backup;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum BackupCommand {
    /// Write a backup document
    Export {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all data with a backup document
    Import {
        file: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn run(command: BackupCommand) -> CmdResult {
    let app = App::open().await?;
    match command {
        BackupCommand::Export { output } => {
            let document = app.store.export(app.config.backup.message_cap).await;
            let json = document.to_json()?;
            let count = document.characters.as_ref().map_or(0, Vec::len);
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    eprintln!("✅ Exported {count} characters to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        BackupCommand::Import { file, yes } => {
            let text = tokio::fs::read_to_string(&file).await?;
            // Validate before asking.
            let document = parse_backup(&text)?;
            let count = document.characters.as_ref().map_or(0, Vec::len);
            let question = format!(
                "Replace ALL current data with {count} characters from {}?",
                file.display()
            );
            if !yes && !confirm(&question).await? {
                println!("Cancelled.");
                return Ok(());
            }
            app.store.restore(document).await?;
            println!("✅ Backup restored ({count} characters)");
        }
    }
    Ok(())
}
