//! Core data models used throughout the relay.
//!
//! These types describe the remote database as discovered at runtime, the
//! transaction records parsed from chat commands, and the typed property
//! values that flow into a page-create request.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Declared type of a remote database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Date,
    Relation,
    /// Any type the relay does not write to (formula, rollup, people, ...).
    Other(String),
}

impl ColumnType {
    /// Map a Notion property type string onto a [`ColumnType`].
    pub fn from_api(kind: &str) -> Self {
        match kind {
            "title" => ColumnType::Title,
            "rich_text" => ColumnType::RichText,
            "number" => ColumnType::Number,
            "select" => ColumnType::Select,
            "multi_select" => ColumnType::MultiSelect,
            "date" => ColumnType::Date,
            "relation" => ColumnType::Relation,
            other => ColumnType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Title => "title",
            ColumnType::RichText => "rich_text",
            ColumnType::Number => "number",
            ColumnType::Select => "select",
            ColumnType::MultiSelect => "multi_select",
            ColumnType::Date => "date",
            ColumnType::Relation => "relation",
            ColumnType::Other(s) => s,
        }
    }
}

/// Column metadata as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Exact display name; writes must use it verbatim.
    pub name: String,
    pub column_type: ColumnType,
    /// Ordered option labels for select columns. Empty otherwise.
    pub options: Vec<String>,
    /// Target database id for relation columns.
    pub relation_target: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            options: Vec::new(),
            relation_target: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relation_target(mut self, target: impl Into<String>) -> Self {
        self.relation_target = Some(target.into());
        self
    }
}

/// Database metadata: the plain-text title and every column.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseMeta {
    pub id: String,
    pub title: String,
    pub columns: Vec<ColumnDef>,
    /// The untouched `properties` object, kept for `ledger schema --raw`.
    #[serde(skip)]
    pub raw_properties: serde_json::Value,
}

/// A database reachable by the integration, as listed by search.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSummary {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
}

/// A page returned by a database query.
#[derive(Debug, Clone)]
pub struct PageSummary {
    pub id: String,
    /// Raw `properties` object of the page.
    pub properties: serde_json::Value,
}

impl PageSummary {
    /// Plain text of the first segment of a title property.
    pub fn title_text(&self, column: &str) -> Option<String> {
        self.properties
            .get(column)?
            .get("title")?
            .as_array()?
            .first()
            .and_then(|seg| {
                seg.get("plain_text")
                    .or_else(|| seg.get("text").and_then(|t| t.get("content")))
            })
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    /// Plain text of whichever property has type `title`.
    pub fn any_title_text(&self) -> Option<String> {
        let props = self.properties.as_object()?;
        let (name, _) = props
            .iter()
            .find(|(_, v)| v.get("type").and_then(|t| t.as_str()) == Some("title"))?;
        self.title_text(name)
    }

    /// `start` of a date property.
    pub fn date_start(&self, column: &str) -> Option<String> {
        self.properties
            .get(column)?
            .get("date")?
            .get("start")?
            .as_str()
            .map(str::to_string)
    }
}

/// Semantic role of a remote column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ColumnRole {
    Title,
    Date,
    ExpenseAmount,
    IncomeAmount,
    TransactionType,
    ExpenseCategory,
    IncomeCategory,
    /// Rich-text copy of the whole message.
    Content,
    /// Rich-text name of whoever sent the message.
    Sender,
    /// Relation to the monthly summary database.
    Month,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnRole::Title => "title",
            ColumnRole::Date => "date",
            ColumnRole::ExpenseAmount => "expense-amount",
            ColumnRole::IncomeAmount => "income-amount",
            ColumnRole::TransactionType => "transaction-type",
            ColumnRole::ExpenseCategory => "expense-category",
            ColumnRole::IncomeCategory => "income-category",
            ColumnRole::Content => "content",
            ColumnRole::Sender => "sender",
            ColumnRole::Month => "month",
        };
        f.write_str(s)
    }
}

/// Direction of money flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    Expense,
    Income,
}

/// Where a record's date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDate {
    /// The command carried a date token that parsed.
    Parsed(NaiveDateTime),
    /// No date token, or none of the accepted formats matched.
    Defaulted(NaiveDateTime),
}

impl RecordDate {
    pub fn timestamp(&self) -> NaiveDateTime {
        match *self {
            RecordDate::Parsed(ts) | RecordDate::Defaulted(ts) => ts,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, RecordDate::Defaulted(_))
    }

    /// ISO-8601 local date-time, second precision.
    pub fn iso(&self) -> String {
        self.timestamp().format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// `YYYY-MM` key used to find the monthly summary page.
    pub fn month_key(&self) -> String {
        self.timestamp().format("%Y-%m").to_string()
    }
}

/// A parsed transaction command, consumed immediately by the write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub title: String,
    pub amount: i64,
    pub kind: TransactionKind,
    pub category: String,
    pub date: RecordDate,
    /// The command line as received, before tokenizing.
    pub content: String,
    /// Display name of the sender, when the transport knows it.
    pub sender: Option<String>,
}

impl TransactionRecord {
    /// Title shortened to `max_chars` characters plus `...` when longer.
    pub fn display_title(&self, max_chars: usize) -> String {
        truncate_title(&self.title, max_chars)
    }
}

pub(crate) fn truncate_title(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// A typed value for one column of a page-create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    /// ISO-8601 start date or date-time.
    Date(String),
    Number(i64),
    /// Select option label.
    Select(String),
    /// Related page ids.
    Relation(Vec<String>),
}

/// Column name → value for a page-create request, in stable order.
pub type Properties = BTreeMap<String, PropertyValue>;
