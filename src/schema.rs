//! Schema discovery: classify remote columns by semantic role.
//!
//! Column names differ between ledger databases, so nothing is hard-coded.
//! Each column is matched against an ordered rule table of
//! `(type, required tokens, excluded token set, role)` entries built from
//! the configured [`Vocabulary`]. The first matching rule wins, which
//! means a column whose name satisfies two rules is classified by the
//! earlier one:
//!
//! | # | Type     | Requires            | Unless name has all of | Role              |
//! |---|----------|---------------------|------------------------|-------------------|
//! | 1 | title    |                     |                        | `Title`           |
//! | 2 | date     |                     |                        | `Date`            |
//! | 3 | number   | income, amount      |                        | `IncomeAmount`    |
//! | 4 | number   | expense, amount     |                        | `ExpenseAmount`   |
//! | 5 | select   | type                | expense, income        | `TransactionType` |
//! | 6 | select   | expense, category   |                        | `ExpenseCategory` |
//! | 7 | select   | income, category    |                        | `IncomeCategory`  |
//! | 8 | text     | content             |                        | `Content`         |
//! | 9 | text     | sender              |                        | `Sender`          |
//! |10 | relation | (target = monthly)  |                        | `Month`           |
//!
//! A select named e.g. "expense type category" therefore becomes
//! `TransactionType`, not `ExpenseCategory`.
//!
//! The resolved [`SchemaMap`] is memoized in a [`SchemaCache`] until
//! explicitly invalidated.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::config::Vocabulary;
use crate::models::{ColumnDef, ColumnRole, ColumnType};

/// One row of the classification table.
#[derive(Debug, Clone)]
pub struct RoleRule {
    pub column_type: ColumnType,
    /// Every token must appear in the column name.
    pub requires: Vec<String>,
    /// The rule is skipped when the name contains all of these. Empty = never.
    pub unless_all: Vec<String>,
    /// For relation rules: the target database id that must match.
    pub relation_target: Option<String>,
    pub role: ColumnRole,
}

impl RoleRule {
    fn new(column_type: ColumnType, requires: &[&str], role: ColumnRole) -> Self {
        Self {
            column_type,
            requires: requires.iter().map(|s| s.to_string()).collect(),
            unless_all: Vec::new(),
            relation_target: None,
            role,
        }
    }

    fn unless_all(mut self, tokens: &[&str]) -> Self {
        self.unless_all = tokens.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn matches(&self, column: &ColumnDef) -> bool {
        if column.column_type != self.column_type {
            return false;
        }
        if let Some(ref target) = self.relation_target {
            return column
                .relation_target
                .as_deref()
                .is_some_and(|t| same_notion_id(t, target));
        }
        let name = column.name.to_lowercase();
        let has = |tok: &String| name.contains(&tok.to_lowercase());
        if !self.requires.iter().all(has) {
            return false;
        }
        if !self.unless_all.is_empty() && self.unless_all.iter().all(has) {
            return false;
        }
        true
    }
}

/// Notion ids are accepted with or without dashes.
fn same_notion_id(a: &str, b: &str) -> bool {
    let norm = |s: &str| s.replace('-', "").to_lowercase();
    norm(a) == norm(b)
}

/// Ordered rule table plus the classification entry points.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<RoleRule>,
}

impl Classifier {
    pub fn new(vocab: &Vocabulary, monthly_database_id: Option<&str>) -> Self {
        let ty = vocab.type_token.as_str();
        let cat = vocab.category_token.as_str();
        let exp = vocab.expense_token.as_str();
        let inc = vocab.income_token.as_str();
        let amt = vocab.amount_token.as_str();
        let content = vocab.content_token.as_str();
        let sender = vocab.sender_token.as_str();

        let mut rules = vec![
            RoleRule::new(ColumnType::Title, &[], ColumnRole::Title),
            RoleRule::new(ColumnType::Date, &[], ColumnRole::Date),
            RoleRule::new(ColumnType::Number, &[inc, amt], ColumnRole::IncomeAmount),
            RoleRule::new(ColumnType::Number, &[exp, amt], ColumnRole::ExpenseAmount),
            RoleRule::new(ColumnType::Select, &[ty], ColumnRole::TransactionType)
                .unless_all(&[exp, inc]),
            RoleRule::new(ColumnType::Select, &[exp, cat], ColumnRole::ExpenseCategory),
            RoleRule::new(ColumnType::Select, &[inc, cat], ColumnRole::IncomeCategory),
            RoleRule::new(ColumnType::RichText, &[content], ColumnRole::Content),
            RoleRule::new(ColumnType::RichText, &[sender], ColumnRole::Sender),
        ];
        if let Some(target) = monthly_database_id {
            let mut rule = RoleRule::new(ColumnType::Relation, &[], ColumnRole::Month);
            rule.relation_target = Some(target.to_string());
            rules.push(rule);
        }
        Self { rules }
    }

    /// Role of a single column, judged on its own type and name.
    pub fn classify_column(&self, column: &ColumnDef) -> Option<ColumnRole> {
        self.rules
            .iter()
            .find(|r| r.matches(column))
            .map(|r| r.role)
    }

    /// Build a [`SchemaMap`] from a database's columns.
    ///
    /// Fails when no title or no date column exists. When several columns
    /// share a role the one whose name sorts first is kept, so the result
    /// never depends on the order of `columns`.
    pub fn classify(&self, columns: &[ColumnDef]) -> Result<SchemaMap> {
        let mut ordered: Vec<&ColumnDef> = columns.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        let mut map = SchemaMap::default();
        for column in ordered {
            let Some(role) = self.classify_column(column) else {
                continue;
            };
            if let Some(existing) = map.columns.get(&role) {
                warn!(
                    role = %role,
                    kept = %existing,
                    ignored = %column.name,
                    "several columns classify to the same role"
                );
                continue;
            }
            map.columns.insert(role, column.name.clone());
            if matches!(
                role,
                ColumnRole::TransactionType
                    | ColumnRole::ExpenseCategory
                    | ColumnRole::IncomeCategory
            ) {
                map.options.insert(role, column.options.clone());
            }
        }

        if !map.columns.contains_key(&ColumnRole::Title) {
            bail!("database has no title column");
        }
        if !map.columns.contains_key(&ColumnRole::Date) {
            bail!("database has no date column");
        }
        Ok(map)
    }
}

/// Resolved role → column-name mapping for one database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaMap {
    columns: BTreeMap<ColumnRole, String>,
    options: BTreeMap<ColumnRole, Vec<String>>,
}

impl SchemaMap {
    pub fn column(&self, role: ColumnRole) -> Option<&str> {
        self.columns.get(&role).map(String::as_str)
    }

    pub fn title(&self) -> &str {
        self.column(ColumnRole::Title).unwrap_or_default()
    }

    pub fn date(&self) -> &str {
        self.column(ColumnRole::Date).unwrap_or_default()
    }

    /// Option labels in remote order. Empty for roles without options.
    pub fn options(&self, role: ColumnRole) -> &[String] {
        self.options.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Classified roles and their columns, in role order.
    pub fn roles(&self) -> impl Iterator<Item = (ColumnRole, &str)> {
        self.columns.iter().map(|(r, c)| (*r, c.as_str()))
    }
}

/// Process-wide memo of the resolved schema, owned by the recorder.
///
/// Concurrent first calls may both fetch; the last writer wins and both
/// results are equal since classification is pure.
#[derive(Debug, Default)]
pub struct SchemaCache {
    slot: RwLock<Option<Arc<SchemaMap>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<SchemaMap>> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_populated(&self) -> bool {
        self.get().is_some()
    }

    pub fn invalidate(&self) {
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Return the cached map, or run `fetch` and cache its success.
    ///
    /// A failed fetch leaves the cache empty so the next call retries.
    pub async fn get_or_resolve<F, Fut>(&self, fetch: F) -> Result<Arc<SchemaMap>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SchemaMap>>,
    {
        if let Some(map) = self.get() {
            return Ok(map);
        }
        let map = Arc::new(fetch().await?);
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(map.clone());
        Ok(map)
    }
}
