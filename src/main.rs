//! # Ledger Relay CLI (`ledger`)
//!
//! ## Usage
//!
//! ```bash
//! ledger [--config ./config/ledger.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ledger run` | Start the bot (long polling) |
//! | `ledger serve` | Start the webhook server |
//! | `ledger schema [--raw]` | Show database columns and their roles |
//! | `ledger databases` | List databases shared with the integration |
//! | `ledger parse "<line>" [--preview]` | Parse a line; `--preview` prints the payload |
//! | `ledger record "<line>"` | Write one line to the database |
//! | `ledger completions <shell>` | Print shell completions |
//!
//! Credentials come from the environment (`NOTION_API_KEY`,
//! `TELEGRAM_BOT_TOKEN`); a `.env` file in the working directory is
//! loaded first.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ledger_relay::config::{resolve_config, Config, Credentials};
use ledger_relay::handler::Handler;
use ledger_relay::notion::NotionClient;
use ledger_relay::recorder::Recorder;
use ledger_relay::server::AppState;
use ledger_relay::telegram::TelegramClient;
use ledger_relay::{bot, inspect, server};

/// Ledger Relay: record chat messages as Notion database rows.
#[derive(Parser)]
#[command(name = "ledger", version)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot with long polling.
    Run,

    /// Run the webhook server.
    ///
    /// Binds to `[telegram].webhook_bind` unless `--bind` is given.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },

    /// Show the database columns and the role each is classified as.
    Schema {
        /// Print the raw property JSON instead.
        #[arg(long)]
        raw: bool,
    },

    /// List databases the integration can reach.
    Databases,

    /// Parse a command line without writing anything.
    Parse {
        line: String,

        /// Also resolve the schema and print the page properties.
        #[arg(long)]
        preview: bool,
    },

    /// Parse a command line and write it to the database.
    Record { line: String },

    /// Print shell completions.
    Completions { shell: Shell },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ledger_relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't need credentials
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "ledger", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Parse {
            line,
            preview: false,
        } => {
            let cfg = resolve_config(cli.config.as_deref())?;
            inspect::run_parse(&cfg, line)?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = resolve_config(cli.config.as_deref())?;
    let creds = Credentials::from_env()?;
    let store = Arc::new(NotionClient::new(&cfg.notion, &creds.notion_api_key)?);

    match cli.command {
        Commands::Schema { raw } => {
            inspect::run_schema(store.as_ref(), &cfg, raw).await?;
        }
        Commands::Databases => {
            inspect::run_databases(store.as_ref()).await?;
        }
        Commands::Parse { line, .. } => {
            inspect::run_parse(&cfg, &line)?;
            println!();
            let recorder = Recorder::new(store, &cfg)?;
            inspect::run_preview(&recorder, &cfg, &line).await?;
        }
        Commands::Record { line } => {
            let recorder = Recorder::new(store, &cfg)?;
            inspect::run_record(&recorder, &cfg, &line).await?;
        }
        Commands::Run => {
            let (client, handler) = bot_parts(&cfg, &creds, store)?;
            bot::run_bot(client, handler, cfg.telegram.poll_timeout_secs).await?;
        }
        Commands::Serve { bind } => {
            let bind = bind
                .or_else(|| cfg.telegram.webhook_bind.clone())
                .context("no bind address: pass --bind or set telegram.webhook_bind")?;
            let (client, handler) = bot_parts(&cfg, &creds, store)?;
            let state = AppState {
                handler,
                client,
                secret: cfg.telegram.webhook_secret.clone(),
            };
            server::run_server(&bind, state).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before credentials)
            unreachable!()
        }
    }

    Ok(())
}

fn bot_parts(
    cfg: &Config,
    creds: &Credentials,
    store: Arc<NotionClient>,
) -> Result<(Arc<TelegramClient>, Arc<Handler>)> {
    let client = TelegramClient::new(&cfg.telegram, creds.telegram_token()?)?;
    let recorder = Arc::new(Recorder::new(store, cfg)?);
    Ok((Arc::new(client), Arc::new(Handler::new(recorder, cfg))))
}
