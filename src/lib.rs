//! # Ledger Relay
//!
//! Relays chat messages into rows of a Notion database.
//!
//! A message like `! 커피 4,500원 지출 카페 1/9` is parsed into a
//! transaction record, mapped onto the columns the database actually has
//! (discovered at runtime and classified by name), and written as a new
//! page. Column names are never hard-coded.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  Telegram   │──▶│   Handler    │──▶│   Recorder    │
//! │ poll / hook │   │ commands +   │   │ parse → map → │
//! └─────────────┘   │ replies      │   │ write         │
//!                   └──────────────┘   └──────┬────────┘
//!                                             │ DocumentStore
//!                                             ▼
//!                                      ┌──────────────┐
//!                                      │    Notion    │
//!                                      └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export NOTION_API_KEY=... TELEGRAM_BOT_TOKEN=... NOTION_DATABASE_ID=...
//! ledger schema                     # check which columns were recognised
//! ledger parse "! 점심 9000 지출 식비"
//! ledger run                        # start the bot
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment credentials |
//! | [`models`] | Core data types |
//! | [`error`] | Parse and relay error kinds |
//! | [`parser`] | Command-line grammar |
//! | [`schema`] | Column role classification and the schema cache |
//! | [`mapping`] | Record → page properties |
//! | [`store`] | Remote store trait |
//! | [`notion`] | Notion REST client |
//! | [`telegram`] | Telegram Bot API client |
//! | [`recorder`] | The parse → resolve → write pipeline |
//! | [`handler`] | Chat commands and reply text |
//! | [`bot`] | Long-polling loop |
//! | [`server`] | Webhook HTTP server |
//! | [`inspect`] | CLI reports |

pub mod bot;
pub mod config;
pub mod error;
pub mod handler;
pub mod inspect;
pub mod mapping;
pub mod models;
pub mod notion;
pub mod parser;
pub mod recorder;
pub mod schema;
pub mod server;
pub mod store;
pub mod telegram;
