//! CLI reports: schema dump, database listing, parse preview, one-shot record.

use anyhow::Result;

use crate::config::Config;
use crate::handler::group_thousands;
use crate::notion::encode_properties;
use crate::parser::CommandParser;
use crate::recorder::Recorder;
use crate::schema::Classifier;
use crate::store::DocumentStore;

/// Print the database columns with the role each one classifies to.
pub async fn run_schema(store: &dyn DocumentStore, config: &Config, raw: bool) -> Result<()> {
    let database_id = config.database_id()?;
    let meta = store.retrieve_database(database_id).await?;

    if raw {
        println!("{}", serde_json::to_string_pretty(&meta.raw_properties)?);
        return Ok(());
    }

    let classifier = Classifier::new(
        &config.vocabulary,
        config.notion.monthly_database_id.as_deref(),
    );

    println!("Database: {} ({})", meta.title, meta.id);
    println!();
    println!("{:<24} {:<14} {:<18} OPTIONS", "COLUMN", "TYPE", "ROLE");
    for column in &meta.columns {
        let role = classifier
            .classify_column(column)
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<14} {:<18} {}",
            column.name,
            column.column_type.as_str(),
            role,
            column.options.join(", ")
        );
    }
    println!();

    match classifier.classify(&meta.columns) {
        Ok(map) => {
            println!("--- Resolved roles ---");
            for (role, column) in map.roles() {
                println!("{:<18} {}", role.to_string(), column);
            }
        }
        Err(e) => println!("Schema unusable: {:#}", e),
    }
    Ok(())
}

/// List every database the integration can reach.
pub async fn run_databases(store: &dyn DocumentStore) -> Result<()> {
    let databases = store.search_databases().await?;
    if databases.is_empty() {
        println!("No databases shared with this integration.");
        return Ok(());
    }

    println!("{:<38} TITLE", "ID");
    for db in &databases {
        let title = if db.title.is_empty() {
            "Untitled"
        } else {
            db.title.as_str()
        };
        println!("{:<38} {}", db.id, title);
    }
    Ok(())
}

/// `line` without the chat trigger prefix, so `ledger parse "! coffee ..."`
/// reads the same as the chat message would.
pub fn strip_trigger<'a>(config: &Config, line: &'a str) -> &'a str {
    let line = line.trim();
    let prefix = config.telegram.trigger_prefix.as_str();
    if prefix.is_empty() {
        return line;
    }
    line.strip_prefix(prefix).map(str::trim).unwrap_or(line)
}

/// Show how `line` parses. Needs no network access.
pub fn run_parse(config: &Config, line: &str) -> Result<()> {
    let parser = CommandParser::new(&config.parser);
    let record = parser.parse(strip_trigger(config, line))?;

    println!("--- Parsed ---");
    println!("title:    {}", record.title);
    println!("amount:   {}", group_thousands(record.amount));
    println!("kind:     {}", parser.kind_literal(record.kind));
    println!("category: {}", record.category);
    println!(
        "date:     {}{}",
        record.date.iso(),
        if record.date.is_defaulted() {
            " (defaulted)"
        } else {
            ""
        }
    );
    println!("month:    {}", record.date.month_key());
    Ok(())
}

/// Print the page properties `line` would be written with.
pub async fn run_preview(recorder: &Recorder, config: &Config, line: &str) -> Result<()> {
    let (_, props) = recorder.prepare(strip_trigger(config, line)).await?;
    println!("{}", serde_json::to_string_pretty(&encode_properties(&props))?);
    Ok(())
}

/// Parse, map and write a single line.
pub async fn run_record(recorder: &Recorder, config: &Config, line: &str) -> Result<()> {
    let saved = recorder.record(strip_trigger(config, line)).await?;
    println!("Saved page {}", saved.page_id);
    if saved.month_linked {
        println!("Linked to month {}", saved.record.date.month_key());
    }
    Ok(())
}
