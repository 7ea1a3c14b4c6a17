//! Telegram Bot API client.
//!
//! Only the three methods the relay needs: `getMe`, `getUpdates` (long
//! polling) and `sendMessage`. Responses use the Bot API envelope
//! `{ "ok": bool, "result": ..., "description": ... }`.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::TelegramConfig;

/// Extra HTTP time on top of the long-poll wait.
const POLL_GRACE_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// "First Last (@username)", omitting whatever is missing.
    pub fn display_name(&self) -> String {
        let mut name = self.first_name.clone();
        if let Some(ref last) = self.last_name {
            name.push(' ');
            name.push_str(last);
        }
        let name = name.trim().to_string();
        match self.username {
            Some(ref u) if name.is_empty() => format!("@{}", u),
            Some(ref u) => format!("{} (@{})", name, u),
            None => name,
        }
    }
}

pub struct TelegramClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.poll_timeout_secs + POLL_GRACE_SECS,
            ))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/bot{}", config.api_base.trim_end_matches('/'), token),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        let url = format!("{}/{}", self.endpoint, method);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Telegram {} request failed", method))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let envelope: Envelope<T> = serde_json::from_str(&text).with_context(|| {
            format!(
                "Telegram {} returned HTTP {} with unreadable body: {}",
                method,
                status,
                text.chars().take(500).collect::<String>()
            )
        })?;

        if !envelope.ok {
            bail!(
                "Telegram {} failed (HTTP {}): {}",
                method,
                status,
                envelope.description.unwrap_or_default()
            );
        }
        envelope
            .result
            .with_context(|| format!("Telegram {} returned no result", method))
    }

    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({})).await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", &body).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "text": text });
        let _: Value = self.call("sendMessage", &body).await?;
        Ok(())
    }
}
