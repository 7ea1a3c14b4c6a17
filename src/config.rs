//! TOML configuration with environment overrides.
//!
//! Every section is optional; a missing file falls back to
//! [`Config::minimal`]. Identifiers may come from the environment
//! (`NOTION_DATABASE_ID`, `MONTHLY_DB_ID`), credentials only come from it
//! (see [`Credentials`]).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub notion: NotionConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub vocabulary: Vocabulary,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotionConfig {
    #[serde(default)]
    pub database_id: Option<String>,
    #[serde(default)]
    pub monthly_database_id: Option<String>,
    #[serde(default = "default_notion_base")]
    pub api_base: String,
    #[serde(default = "default_notion_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            database_id: None,
            monthly_database_id: None,
            api_base: default_notion_base(),
            api_version: default_notion_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_notion_base() -> String {
    "https://api.notion.com".to_string()
}
fn default_notion_version() -> String {
    "2022-06-28".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_base")]
    pub api_base: String,
    /// Long-poll wait passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Messages must start with this to be recorded. Empty records all text.
    #[serde(default = "default_trigger_prefix")]
    pub trigger_prefix: String,
    #[serde(default)]
    pub webhook_bind: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_base(),
            poll_timeout_secs: default_poll_timeout(),
            trigger_prefix: default_trigger_prefix(),
            webhook_bind: None,
            webhook_secret: None,
        }
    }
}

fn default_telegram_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_trigger_prefix() -> String {
    "!".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParserConfig {
    #[serde(default = "default_expense_literal")]
    pub expense_literal: String,
    #[serde(default = "default_income_literal")]
    pub income_literal: String,
    /// Trailing tokens stripped from the amount, compared case-insensitively.
    #[serde(default = "default_currency_suffixes")]
    pub currency_suffixes: Vec<String>,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            expense_literal: default_expense_literal(),
            income_literal: default_income_literal(),
            currency_suffixes: default_currency_suffixes(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

fn default_expense_literal() -> String {
    "지출".to_string()
}
fn default_income_literal() -> String {
    "수입".to_string()
}
fn default_currency_suffixes() -> Vec<String> {
    vec!["원".to_string(), "krw".to_string(), "won".to_string()]
}
fn default_title_max_chars() -> usize {
    50
}

/// Name tokens the schema classifier looks for in column names.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    #[serde(default = "default_type_token")]
    pub type_token: String,
    #[serde(default = "default_category_token")]
    pub category_token: String,
    #[serde(default = "default_expense_token")]
    pub expense_token: String,
    #[serde(default = "default_income_token")]
    pub income_token: String,
    #[serde(default = "default_amount_token")]
    pub amount_token: String,
    /// Rich-text column that receives the whole message.
    #[serde(default = "default_content_token")]
    pub content_token: String,
    /// Rich-text column that receives the sender's name.
    #[serde(default = "default_sender_token")]
    pub sender_token: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            type_token: default_type_token(),
            category_token: default_category_token(),
            expense_token: default_expense_token(),
            income_token: default_income_token(),
            amount_token: default_amount_token(),
            content_token: default_content_token(),
            sender_token: default_sender_token(),
        }
    }
}

impl Vocabulary {
    /// English tokens, for databases with English column names.
    pub fn english() -> Self {
        Self {
            type_token: "type".to_string(),
            category_token: "category".to_string(),
            expense_token: "expense".to_string(),
            income_token: "income".to_string(),
            amount_token: "amount".to_string(),
            content_token: "content".to_string(),
            sender_token: "sender".to_string(),
        }
    }
}

fn default_type_token() -> String {
    "종류".to_string()
}
fn default_category_token() -> String {
    "카테고리".to_string()
}
fn default_expense_token() -> String {
    "지출".to_string()
}
fn default_income_token() -> String {
    "수입".to_string()
}
fn default_amount_token() -> String {
    "금액".to_string()
}
fn default_content_token() -> String {
    "내용".to_string()
}
fn default_sender_token() -> String {
    "발신자".to_string()
}

impl Config {
    /// All defaults, no database configured.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// The transaction database id, or an error naming how to set it.
    pub fn database_id(&self) -> Result<&str> {
        match self.notion.database_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => bail!("no database configured: set notion.database_id or NOTION_DATABASE_ID"),
        }
    }

    /// Apply `NOTION_DATABASE_ID` / `MONTHLY_DB_ID` when set and non-empty.
    pub fn apply_env(&mut self) {
        if let Some(id) = non_empty_env("NOTION_DATABASE_ID") {
            self.notion.database_id = Some(id);
        }
        if let Some(id) = non_empty_env("MONTHLY_DB_ID") {
            self.notion.monthly_database_id = Some(id);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.parser.title_max_chars == 0 {
            bail!("parser.title_max_chars must be > 0");
        }
        let expense = self.parser.expense_literal.trim();
        let income = self.parser.income_literal.trim();
        if expense.is_empty() || income.is_empty() {
            bail!("parser.expense_literal and parser.income_literal must not be empty");
        }
        if expense == income {
            bail!("parser.expense_literal and parser.income_literal must differ");
        }
        if self.notion.timeout_secs == 0 {
            bail!("notion.timeout_secs must be > 0");
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse and validate a config file. Environment overrides are not applied.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the file if given, else defaults, then apply environment overrides.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => load_config(p)?,
        None => Config::minimal(),
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// API credentials read from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub notion_api_key: String,
    pub telegram_token: Option<String>,
}

impl Credentials {
    /// Read `NOTION_API_KEY` (required) and `TELEGRAM_BOT_TOKEN` (optional).
    pub fn from_env() -> Result<Self> {
        let notion_api_key =
            non_empty_env("NOTION_API_KEY").context("NOTION_API_KEY environment variable not set")?;
        Ok(Self {
            notion_api_key,
            telegram_token: non_empty_env("TELEGRAM_BOT_TOKEN"),
        })
    }

    pub fn telegram_token(&self) -> Result<&str> {
        self.telegram_token
            .as_deref()
            .context("TELEGRAM_BOT_TOKEN environment variable not set")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("notion_api_key", &"<redacted>")
            .field(
                "telegram_token",
                &self.telegram_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.parser.expense_literal, "지출");
        assert_eq!(cfg.parser.title_max_chars, 50);
        assert_eq!(cfg.telegram.trigger_prefix, "!");
        assert_eq!(cfg.notion.api_version, "2022-06-28");
        assert_eq!(cfg.vocabulary.amount_token, "금액");
        assert_eq!(cfg.vocabulary.content_token, "내용");
        assert_eq!(cfg.vocabulary.sender_token, "발신자");
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[notion]
database_id = "abc"

[parser]
expense_literal = "expense"
income_literal = "income"
"#,
        )
        .unwrap();
        assert_eq!(cfg.database_id().unwrap(), "abc");
        assert_eq!(cfg.parser.income_literal, "income");
        assert_eq!(cfg.parser.currency_suffixes.len(), 3);
        assert_eq!(cfg.notion.api_base, "https://api.notion.com");
    }

    #[test]
    fn test_validate_rejects_identical_literals() {
        let mut cfg = Config::minimal();
        cfg.parser.income_literal = cfg.parser.expense_literal.clone();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_title_length() {
        let mut cfg = Config::minimal();
        cfg.parser.title_max_chars = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_missing_database_id_is_an_error() {
        let cfg = Config::minimal();
        let err = cfg.database_id().unwrap_err().to_string();
        assert!(err.contains("NOTION_DATABASE_ID"));
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(&path, "[telegram]\ntrigger_prefix = \"\"\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.telegram.trigger_prefix, "");
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let err = load_config(Path::new("/nonexistent/ledger.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_example_config_parses() {
        let cfg: Config = toml::from_str(include_str!("../config/ledger.example.toml")).unwrap();
        cfg.validate().unwrap();
        assert!(cfg.database_id().is_ok());
        assert!(cfg.notion.monthly_database_id.is_none());
    }
}
