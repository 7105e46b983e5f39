//! # Configuration Module
//!
//! Runtime settings for the wave bot, read from the environment (a `.env`
//! file is loaded first by `main`).

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use teloxide::types::{ChatId, UserId};

pub const DEFAULT_CATALOG_PATH: &str = "data/catalog.json";
pub const DEFAULT_SAVE_PATH: &str = "json/waves.json";

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Who may open the wave wizard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessConfig {
    /// Groups whose administrators and owners are authorized
    pub admin_group_ids: Vec<ChatId>,
    /// Users authorized regardless of group membership
    pub allowed_user_ids: HashSet<UserId>,
}

/// Configuration structure for the bot process
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub catalog_path: PathBuf,
    pub save_path: PathBuf,
    pub access: AccessConfig,
    pub log_format: LogFormat,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            save_path: PathBuf::from(DEFAULT_SAVE_PATH),
            access: AccessConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl BotConfig {
    /// Read configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bot_token = env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set")?;

        let catalog_path = env::var("WAVES_CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_path);
        let save_path = env::var("WAVES_SAVE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.save_path);

        let admin_group_ids = parse_id_list(&env::var("WAVES_ADMIN_GROUP_IDS").unwrap_or_default())
            .context("Invalid WAVES_ADMIN_GROUP_IDS")?
            .into_iter()
            .map(ChatId)
            .collect();
        let allowed_user_ids = parse_id_list(&env::var("WAVES_ALLOWED_USER_IDS").unwrap_or_default())
            .context("Invalid WAVES_ALLOWED_USER_IDS")?
            .into_iter()
            .map(|id| u64::try_from(id).map(UserId))
            .collect::<Result<HashSet<_>, _>>()
            .context("User ids must be positive")?;

        let log_format = parse_log_format(&env::var("LOG_FORMAT").unwrap_or_default())?;

        Ok(Self {
            bot_token,
            catalog_path,
            save_path,
            access: AccessConfig {
                admin_group_ids,
                allowed_user_ids,
            },
            log_format,
        })
    }
}

/// Parse a comma separated list of numeric ids, ignoring blank entries
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>()
                .with_context(|| format!("'{item}' is not a numeric id"))
        })
        .collect()
}

pub fn parse_log_format(raw: &str) -> Result<LogFormat> {
    match raw.trim().to_lowercase().as_str() {
        "" | "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => bail!("Unknown LOG_FORMAT '{other}', expected 'text' or 'json'"),
    }
}
