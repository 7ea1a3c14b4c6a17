//! The transaction recorder: parse → resolve schema → map → write.
//!
//! A [`Recorder`] owns the store handle, the schema cache and the parser.
//! It is shared (behind an `Arc`) by every message handler; the cache is
//! its only mutable state.

use anyhow::Result;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{RelayError, RelayResult};
use crate::mapping::build_properties;
use crate::models::{ColumnRole, Properties, PropertyValue, TransactionRecord};
use crate::parser::CommandParser;
use crate::schema::{Classifier, SchemaCache, SchemaMap};
use crate::store::DocumentStore;

/// Pages scanned when looking for the monthly summary page.
const MONTHLY_SCAN_LIMIT: usize = 200;

/// Outcome of a successful write.
#[derive(Debug, Clone)]
pub struct SavedRecord {
    pub page_id: String,
    pub record: TransactionRecord,
    /// Whether the monthly relation was attached.
    pub month_linked: bool,
}

/// A row shown by `/list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub title: String,
    pub date: Option<String>,
}

pub struct Recorder {
    store: Arc<dyn DocumentStore>,
    cache: SchemaCache,
    classifier: Classifier,
    parser: CommandParser,
    database_id: String,
    monthly_database_id: Option<String>,
    title_max_chars: usize,
}

impl Recorder {
    /// Fails when no transaction database is configured.
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Result<Self> {
        let database_id = config.database_id()?.to_string();
        let monthly_database_id = config.notion.monthly_database_id.clone();
        Ok(Self {
            store,
            cache: SchemaCache::new(),
            classifier: Classifier::new(&config.vocabulary, monthly_database_id.as_deref()),
            parser: CommandParser::new(&config.parser),
            database_id,
            monthly_database_id,
            title_max_chars: config.parser.title_max_chars,
        })
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// The cached schema, fetching and classifying it on first use.
    pub async fn resolve_schema(&self) -> RelayResult<Arc<SchemaMap>> {
        self.cache
            .get_or_resolve(|| async move {
                info!(database = %self.database_id, "resolving database schema");
                let meta = self.store.retrieve_database(&self.database_id).await?;
                let map = self.classifier.classify(&meta.columns)?;
                for (role, column) in map.roles() {
                    debug!(%role, %column, "classified column");
                }
                Ok(map)
            })
            .await
            .map_err(|e| {
                warn!(error = %format!("{:#}", e), "schema resolution failed");
                RelayError::SchemaUnavailable(format!("{:#}", e))
            })
    }

    /// Drop the cached schema; the next message refetches it.
    pub fn invalidate_schema(&self) {
        self.cache.invalidate();
        info!("schema cache invalidated");
    }

    pub fn schema_cached(&self) -> bool {
        self.cache.is_populated()
    }

    /// Parse and map `line` without writing anything.
    pub async fn prepare(&self, line: &str) -> RelayResult<(TransactionRecord, Properties)> {
        let record = self.parser.parse(line)?;
        let schema = self.resolve_schema().await?;
        let props = self.map(&record, &schema);
        Ok((record, props))
    }

    pub async fn record(&self, line: &str) -> RelayResult<SavedRecord> {
        self.record_from(line, None).await
    }

    /// Record `line` and attribute it to `sender` when a sender column exists.
    pub async fn record_from(&self, line: &str, sender: Option<&str>) -> RelayResult<SavedRecord> {
        let mut record = self.parser.parse(line)?;
        record.sender = sender.map(str::to_string);
        self.write(record).await
    }

    /// Like [`record`](Self::record) with an explicit reference time.
    pub async fn record_at(&self, line: &str, now: NaiveDateTime) -> RelayResult<SavedRecord> {
        let record = self.parser.parse_at(line, now)?;
        self.write(record).await
    }

    fn map(&self, record: &TransactionRecord, schema: &SchemaMap) -> Properties {
        build_properties(
            record,
            schema,
            self.parser.kind_literal(record.kind),
            self.title_max_chars,
        )
    }

    async fn write(&self, record: TransactionRecord) -> RelayResult<SavedRecord> {
        let schema = self.resolve_schema().await?;
        let mut props = self.map(&record, &schema);
        let month_linked = self.link_month(&schema, &record, &mut props).await;

        let page_id = self
            .store
            .create_page(&self.database_id, &props)
            .await
            .map_err(|e| {
                warn!(error = %format!("{:#}", e), "page create failed");
                RelayError::WriteFailed(format!("{:#}", e))
            })?;

        info!(
            page = %page_id,
            amount = record.amount,
            kind = ?record.kind,
            defaulted_date = record.date.is_defaulted(),
            "transaction recorded"
        );
        Ok(SavedRecord {
            page_id,
            record,
            month_linked,
        })
    }

    /// Attach the `YYYY-MM` monthly page when both sides are configured.
    /// Failures are logged and the write goes ahead without the link.
    async fn link_month(
        &self,
        schema: &SchemaMap,
        record: &TransactionRecord,
        props: &mut Properties,
    ) -> bool {
        let (Some(column), Some(monthly_db)) = (
            schema.column(ColumnRole::Month),
            self.monthly_database_id.as_deref(),
        ) else {
            return false;
        };

        let key = record.date.month_key();
        match self.find_monthly_page(monthly_db, &key).await {
            Ok(Some(page_id)) => {
                props.insert(column.to_string(), PropertyValue::Relation(vec![page_id]));
                true
            }
            Ok(None) => {
                warn!(month = %key, "no monthly page found; saving without relation");
                false
            }
            Err(e) => {
                warn!(month = %key, error = %format!("{:#}", e), "monthly lookup failed");
                false
            }
        }
    }

    async fn find_monthly_page(&self, monthly_db: &str, key: &str) -> Result<Option<String>> {
        let pages = self
            .store
            .query_database(monthly_db, None, MONTHLY_SCAN_LIMIT)
            .await?;
        Ok(pages
            .into_iter()
            .find(|p| p.any_title_text().as_deref() == Some(key))
            .map(|p| p.id))
    }

    /// Latest rows, newest first by the date column.
    pub async fn recent(&self, limit: usize) -> Result<Vec<RecentEntry>> {
        let schema = self.resolve_schema().await?;
        let pages = self
            .store
            .query_database(&self.database_id, Some(schema.date()), limit)
            .await?;

        Ok(pages
            .iter()
            .map(|p| RecentEntry {
                title: p.title_text(schema.title()).unwrap_or_default(),
                date: p.date_start(schema.date()),
            })
            .collect())
    }

    /// Title of the transaction database; doubles as a connectivity check.
    pub async fn database_title(&self) -> Result<String> {
        let meta = self.store.retrieve_database(&self.database_id).await?;
        Ok(meta.title)
    }
}
