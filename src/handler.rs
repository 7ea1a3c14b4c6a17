//! Chat message dispatch and reply formatting.
//!
//! | Input | Action |
//! |-------|--------|
//! | `/start` | welcome text |
//! | `/help` | command format and examples |
//! | `/list` | latest 10 rows |
//! | `/status` | connectivity check against the database |
//! | `/schema` | classified columns |
//! | `/reload` | drop the cached schema |
//! | `<prefix> title amount kind category [date]` | record a transaction |
//!
//! Every failure becomes a reply; nothing here ends the bot.

use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{ParseError, RelayError};
use crate::models::{ColumnRole, TransactionKind};
use crate::recorder::{Recorder, SavedRecord};

/// Rows shown by `/list`.
const LIST_LIMIT: usize = 10;

pub struct Handler {
    recorder: Arc<Recorder>,
    trigger_prefix: String,
}

impl Handler {
    pub fn new(recorder: Arc<Recorder>, config: &Config) -> Self {
        Self {
            recorder,
            trigger_prefix: config.telegram.trigger_prefix.clone(),
        }
    }

    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    /// Handle one text message. `None` means the message is not for us.
    pub async fn handle(&self, text: &str) -> Option<String> {
        self.handle_from(text, None).await
    }

    /// Like [`handle`](Self::handle), recording `sender` with the row.
    pub async fn handle_from(&self, text: &str, sender: Option<&str>) -> Option<String> {
        let text = text.trim();
        if let Some(command) = text.strip_prefix('/') {
            return self.command(command).await;
        }

        let line = if self.trigger_prefix.is_empty() {
            text
        } else {
            text.strip_prefix(self.trigger_prefix.as_str())?.trim()
        };
        Some(self.record(line, sender).await)
    }

    async fn command(&self, command: &str) -> Option<String> {
        // `/list@my_bot extra` → `list`
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default();

        let reply = match name {
            "start" => self.welcome(),
            "help" => self.help(),
            "list" => self.list().await,
            "status" => self.status().await,
            "schema" => self.schema().await,
            "reload" => {
                self.recorder.invalidate_schema();
                "🔄 Schema cache cleared. The next message reloads the columns.".to_string()
            }
            _ => return None,
        };
        Some(reply)
    }

    async fn record(&self, line: &str, sender: Option<&str>) -> String {
        match self.recorder.record_from(line, sender).await {
            Ok(saved) => self.saved_reply(&saved),
            Err(e) => {
                if !matches!(e, RelayError::Parse(_)) {
                    error!(error = %e, "failed to record message");
                }
                self.error_reply(&e)
            }
        }
    }

    fn saved_reply(&self, saved: &SavedRecord) -> String {
        let rec = &saved.record;
        let mut reply = format!(
            "✅ Saved to Notion\n{} · {} · {} · {}\n📅 {}",
            rec.title,
            group_thousands(rec.amount),
            self.recorder.parser().kind_literal(rec.kind),
            rec.category,
            rec.date.timestamp().format("%Y-%m-%d %H:%M"),
        );
        if saved.month_linked {
            reply.push_str(&format!("\n🗓 linked to {}", rec.date.month_key()));
        }
        reply
    }

    /// User-facing text for a failed message.
    pub fn error_reply(&self, err: &RelayError) -> String {
        match err {
            RelayError::Parse(ParseError::InvalidKind(token)) => {
                let parser = self.recorder.parser();
                format!(
                    "❌ Invalid kind '{}': use '{}' or '{}'.",
                    token,
                    parser.kind_literal(TransactionKind::Expense),
                    parser.kind_literal(TransactionKind::Income),
                )
            }
            RelayError::Parse(ParseError::EmptyInput) => format!(
                "❌ Enter something to save after {}.\n{}",
                display_prefix(&self.trigger_prefix),
                self.example()
            ),
            RelayError::Parse(e) => {
                format!("❌ {}.\n{}", capitalize(&e.to_string()), self.example())
            }
            RelayError::SchemaUnavailable(msg) => {
                format!("❌ Could not read the database columns:\n{}", msg)
            }
            RelayError::WriteFailed(msg) => format!("❌ Saving failed:\n{}", msg),
        }
    }

    fn example(&self) -> String {
        let parser = self.recorder.parser();
        let expense = parser.kind_literal(TransactionKind::Expense);
        format!(
            "Example: {}coffee 4,500 {} cafe 1/9",
            display_prefix_space(&self.trigger_prefix),
            expense
        )
    }

    fn welcome(&self) -> String {
        format!(
            "Welcome! I save your transactions to a Notion database.\n\n\
             Send: {}title amount kind category [date]\n\n\
             Commands:\n\
             /help - usage\n\
             /list - latest entries\n\
             /status - connection status\n\
             /schema - detected columns\n\
             /reload - reload the database columns",
            display_prefix_space(&self.trigger_prefix)
        )
    }

    fn help(&self) -> String {
        let parser = self.recorder.parser();
        let expense = parser.kind_literal(TransactionKind::Expense);
        let income = parser.kind_literal(TransactionKind::Income);
        let p = display_prefix_space(&self.trigger_prefix);
        format!(
            "How to record:\n\n\
             {p}title amount kind category [date]\n\n\
             • amount: digits, separators and a currency suffix are fine (4,500원)\n\
             • kind: '{expense}' or '{income}'\n\
             • date: Y/M/D, M/D or Y-M-D; anything else means now\n\n\
             Examples:\n\
             {p}lunch 9,000 {expense} food\n\
             {p}salary 3,000,000 {income} pay 2026/1/25\n\n\
             Commands: /start /help /list /status /schema /reload"
        )
    }

    async fn list(&self) -> String {
        match self.recorder.recent(LIST_LIMIT).await {
            Ok(entries) if entries.is_empty() => {
                "📭 Nothing saved yet. Send a transaction to get started!".to_string()
            }
            Ok(entries) => {
                let mut out = format!("📋 Latest entries (up to {}):\n\n", LIST_LIMIT);
                for (idx, entry) in entries.iter().enumerate() {
                    let date = entry
                        .date
                        .as_deref()
                        .map(format_short_date)
                        .unwrap_or_default();
                    out.push_str(&format!("{}. {}\n   📅 {}\n\n", idx + 1, entry.title, date));
                }
                out.push_str("💡 /help shows everything I can do.");
                out
            }
            Err(e) => {
                error!(error = %format!("{:#}", e), "list query failed");
                format!("❌ Could not load entries:\n{:#}", e)
            }
        }
    }

    async fn status(&self) -> String {
        match self.recorder.database_title().await {
            Ok(title) => {
                let title = if title.is_empty() { "Untitled" } else { &title };
                let cache = if self.recorder.schema_cached() {
                    "loaded"
                } else {
                    "not loaded yet"
                };
                format!(
                    "✅ Connection OK\n\nNotion database: {} ({})\nSchema: {}\nBot: running",
                    title,
                    self.recorder.database_id(),
                    cache
                )
            }
            Err(e) => format!("❌ Connection error:\n{:#}", e),
        }
    }

    async fn schema(&self) -> String {
        match self.recorder.resolve_schema().await {
            Ok(map) => {
                let mut out = String::from("🧭 Detected columns:\n");
                for (role, column) in map.roles() {
                    out.push_str(&format!("• {}: {}", role, column));
                    let options = map.options(role);
                    if !options.is_empty() {
                        out.push_str(&format!(" [{}]", options.join(", ")));
                    }
                    out.push('\n');
                }
                if map.column(ColumnRole::ExpenseAmount).is_none()
                    && map.column(ColumnRole::IncomeAmount).is_none()
                {
                    out.push_str("⚠️ No amount columns found; amounts will not be saved.\n");
                }
                out
            }
            Err(e) => self.error_reply(&e),
        }
    }
}

/// Entry point used by both delivery modes.
pub async fn reply_for(
    handler: &Handler,
    chat_id: i64,
    sender: Option<&str>,
    text: &str,
) -> Option<String> {
    let reply = handler.handle_from(text, sender).await?;
    info!(chat = chat_id, sender = sender.unwrap_or("unknown"), "handled message");
    Some(reply)
}

fn display_prefix(prefix: &str) -> String {
    if prefix.is_empty() {
        "the message".to_string()
    } else {
        format!("'{}'", prefix)
    }
}

fn display_prefix_space(prefix: &str) -> String {
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{} ", prefix)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `1234567` → `1,234,567`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Notion date `start` → `MM/DD HH:MM`, or `MM/DD` for date-only values.
pub fn format_short_date(start: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(start) {
        return dt.format("%m/%d %H:%M").to_string();
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(start, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%m/%d %H:%M").to_string();
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(start, "%Y-%m-%d") {
        return d.format("%m/%d").to_string();
    }
    start.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(4500), "4,500");
        assert_eq!(group_thousands(3_000_000), "3,000,000");
        assert_eq!(group_thousands(-12_345), "-12,345");
    }

    #[test]
    fn test_format_short_date() {
        assert_eq!(format_short_date("2026-01-09T08:30:00.000+09:00"), "01/09 08:30");
        assert_eq!(format_short_date("2026-01-09T08:30:00"), "01/09 08:30");
        assert_eq!(format_short_date("2026-01-09"), "01/09");
        assert_eq!(format_short_date("soon"), "soon");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("too few fields"), "Too few fields");
        assert_eq!(capitalize(""), "");
    }
}
