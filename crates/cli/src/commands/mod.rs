pub mod backup;
pub mod character;
pub mod chat;
pub mod config_cmd;
pub mod diary;
pub mod models;
pub mod onboard;
pub mod scenario;
pub mod settings;

use pocketline_config::AppConfig;
use pocketline_core::character::Character;
use pocketline_core::provider::Provider;
use pocketline_providers::openai_compat::OpenAiCompatProvider;
use pocketline_store::{FileBackend, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// What every command needs: the loaded config and the opened store.
pub struct App {
    pub config: AppConfig,
    pub store: Arc<Store>,
}

impl App {
    pub async fn open() -> CmdResult<Self> {
        let config = AppConfig::load()?;
        let backend = FileBackend::new(config.data_dir());
        let store = Arc::new(Store::open(Arc::new(backend)).await?);
        debug!(data_dir = %config.data_dir().display(), "Store opened");
        Ok(Self { config, store })
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        Arc::new(OpenAiCompatProvider::new(
            "openai_compat",
            Duration::from_secs(self.config.request_timeout_secs),
        ))
    }

    /// Look a character up by id, name or id prefix.
    pub async fn character(&self, key: &str) -> CmdResult<Character> {
        let characters = self.store.characters().await;
        find_character(&characters, key)
            .cloned()
            .ok_or_else(|| format!("No character matches '{key}'. Try `pocketline character list`.").into())
    }
}

/// Resolve a user-typed character reference.
///
/// Exact id first, then a case-insensitive name, then an unambiguous id
/// prefix of at least four characters.
pub fn find_character<'a>(characters: &'a [Character], key: &str) -> Option<&'a Character> {
    let key = key.trim();
    if let Some(c) = characters.iter().find(|c| c.id == key) {
        return Some(c);
    }
    if let Some(c) = characters.iter().find(|c| c.name.eq_ignore_ascii_case(key)) {
        return Some(c);
    }
    if key.len() < 4 {
        return None;
    }
    let mut prefixed = characters.iter().filter(|c| c.id.starts_with(key));
    match (prefixed.next(), prefixed.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Ask a yes/no question on stdin. Only `y` or `yes` counts as consent.
pub async fn confirm(question: &str) -> CmdResult<bool> {
    let mut stdout = io::stdout();
    stdout.write_all(format!("{question} [y/N] ").as_bytes()).await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(io::stdin()).lines();
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Parse a user-typed boolean.
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("expected true or false, got '{other}'")),
    }
}

/// Short form of an id for listings.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
