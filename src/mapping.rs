//! Map a [`TransactionRecord`] onto the columns of a resolved schema.
//!
//! Title and date are always written. The type selector is written when the
//! schema has one. Amount and category go to the expense or income pair
//! depending on the record's kind; whichever of those columns the schema
//! lacks is left out of the request. The raw message and the sender go to
//! their rich-text columns when both the column and the value exist.

use crate::models::{ColumnRole, Properties, PropertyValue, TransactionKind, TransactionRecord};
use crate::schema::SchemaMap;

/// Build the column → value map for a page-create request.
///
/// `kind_literal` is the user-facing spelling of the record's kind and is
/// matched against the type selector's options.
pub fn build_properties(
    record: &TransactionRecord,
    schema: &SchemaMap,
    kind_literal: &str,
    title_max_chars: usize,
) -> Properties {
    let mut props = Properties::new();

    props.insert(
        schema.title().to_string(),
        PropertyValue::Title(record.display_title(title_max_chars)),
    );
    props.insert(
        schema.date().to_string(),
        PropertyValue::Date(record.date.iso()),
    );

    if let Some(column) = schema.column(ColumnRole::TransactionType) {
        let label = pick_option(schema.options(ColumnRole::TransactionType), kind_literal);
        props.insert(column.to_string(), PropertyValue::Select(label));
    }

    let (amount_role, category_role) = match record.kind {
        TransactionKind::Expense => (ColumnRole::ExpenseAmount, ColumnRole::ExpenseCategory),
        TransactionKind::Income => (ColumnRole::IncomeAmount, ColumnRole::IncomeCategory),
    };
    if let Some(column) = schema.column(amount_role) {
        props.insert(column.to_string(), PropertyValue::Number(record.amount));
    }
    if let Some(column) = schema.column(category_role) {
        props.insert(
            column.to_string(),
            PropertyValue::Select(record.category.clone()),
        );
    }

    if let Some(column) = schema.column(ColumnRole::Content) {
        props.insert(
            column.to_string(),
            PropertyValue::RichText(record.content.clone()),
        );
    }
    if let (Some(column), Some(sender)) = (schema.column(ColumnRole::Sender), &record.sender) {
        props.insert(column.to_string(), PropertyValue::RichText(sender.clone()));
    }

    props
}

/// Choose the option label for `literal`: an exact match, else the first
/// option containing it (e.g. `"💸 지출"`), else the literal itself.
pub fn pick_option(options: &[String], literal: &str) -> String {
    options
        .iter()
        .find(|o| o.as_str() == literal)
        .or_else(|| options.iter().find(|o| o.contains(literal)))
        .cloned()
        .unwrap_or_else(|| literal.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Vocabulary;
    use crate::models::{ColumnDef, ColumnType, RecordDate};
    use crate::schema::Classifier;
    use chrono::NaiveDate;

    fn schema(columns: Vec<ColumnDef>) -> SchemaMap {
        Classifier::new(&Vocabulary::english(), None)
            .classify(&columns)
            .unwrap()
    }

    fn full_schema() -> SchemaMap {
        schema(vec![
            ColumnDef::new("Name", ColumnType::Title),
            ColumnDef::new("Date", ColumnType::Date),
            ColumnDef::new("Expense Amount", ColumnType::Number),
            ColumnDef::new("Income Amount", ColumnType::Number),
            ColumnDef::new("Type", ColumnType::Select).with_options(["- expense", "+ income"]),
            ColumnDef::new("Expense Category", ColumnType::Select),
            ColumnDef::new("Income Category", ColumnType::Select),
        ])
    }

    fn record(kind: TransactionKind) -> TransactionRecord {
        TransactionRecord {
            title: "coffee".to_string(),
            amount: 4500,
            kind,
            category: "cafe".to_string(),
            date: RecordDate::Parsed(
                NaiveDate::from_ymd_opt(2026, 1, 9)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
            content: "coffee 4,500 expense cafe 1/9".to_string(),
            sender: None,
        }
    }

    #[test]
    fn test_expense_writes_expense_columns_only() {
        let props = build_properties(
            &record(TransactionKind::Expense),
            &full_schema(),
            "expense",
            50,
        );
        assert_eq!(
            props.get("Name"),
            Some(&PropertyValue::Title("coffee".to_string()))
        );
        assert_eq!(
            props.get("Date"),
            Some(&PropertyValue::Date("2026-01-09T00:00:00".to_string()))
        );
        assert_eq!(props.get("Expense Amount"), Some(&PropertyValue::Number(4500)));
        assert_eq!(
            props.get("Expense Category"),
            Some(&PropertyValue::Select("cafe".to_string()))
        );
        assert_eq!(
            props.get("Type"),
            Some(&PropertyValue::Select("- expense".to_string()))
        );
        assert!(!props.contains_key("Income Amount"));
        assert!(!props.contains_key("Income Category"));
        assert_eq!(props.len(), 5);
    }

    #[test]
    fn test_income_writes_income_columns_only() {
        let props = build_properties(
            &record(TransactionKind::Income),
            &full_schema(),
            "income",
            50,
        );
        assert_eq!(props.get("Income Amount"), Some(&PropertyValue::Number(4500)));
        assert!(props.contains_key("Income Category"));
        assert!(!props.contains_key("Expense Amount"));
    }

    #[test]
    fn test_missing_category_column_is_omitted() {
        let s = schema(vec![
            ColumnDef::new("Name", ColumnType::Title),
            ColumnDef::new("Date", ColumnType::Date),
            ColumnDef::new("Expense Amount", ColumnType::Number),
        ]);
        let props = build_properties(&record(TransactionKind::Expense), &s, "expense", 50);
        assert_eq!(props.len(), 3);
        assert!(props.values().all(|v| !matches!(v, PropertyValue::Select(_))));
    }

    #[test]
    fn test_minimal_schema_writes_title_and_date() {
        let s = schema(vec![
            ColumnDef::new("Name", ColumnType::Title),
            ColumnDef::new("Date", ColumnType::Date),
        ]);
        let props = build_properties(&record(TransactionKind::Income), &s, "income", 50);
        assert_eq!(props.keys().collect::<Vec<_>>(), ["Date", "Name"]);
    }

    #[test]
    fn test_long_title_is_truncated_in_write() {
        let mut rec = record(TransactionKind::Expense);
        rec.title = "x".repeat(80);
        let props = build_properties(&rec, &full_schema(), "expense", 50);
        let PropertyValue::Title(title) = &props["Name"] else {
            panic!("title column missing");
        };
        assert_eq!(title.len(), 53);
    }

    #[test]
    fn test_content_and_sender_fill_text_columns() {
        let s = schema(vec![
            ColumnDef::new("Name", ColumnType::Title),
            ColumnDef::new("Date", ColumnType::Date),
            ColumnDef::new("Content", ColumnType::RichText),
            ColumnDef::new("Sender", ColumnType::RichText),
        ]);
        let mut rec = record(TransactionKind::Expense);
        let props = build_properties(&rec, &s, "expense", 50);
        assert_eq!(
            props.get("Content"),
            Some(&PropertyValue::RichText("coffee 4,500 expense cafe 1/9".to_string()))
        );
        assert!(!props.contains_key("Sender"));

        rec.sender = Some("Alice".to_string());
        let props = build_properties(&rec, &s, "expense", 50);
        assert_eq!(
            props.get("Sender"),
            Some(&PropertyValue::RichText("Alice".to_string()))
        );
    }

    #[test]
    fn test_pick_option() {
        let opts = vec!["지출".to_string(), "💰 수입".to_string()];
        assert_eq!(pick_option(&opts, "지출"), "지출");
        assert_eq!(pick_option(&opts, "수입"), "💰 수입");
        assert_eq!(pick_option(&opts, "이체"), "이체");
        assert_eq!(pick_option(&[], "지출"), "지출");
    }
}
