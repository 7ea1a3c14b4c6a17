//! Command-line parsing for transaction messages.
//!
//! ```text
//! title amount kind category [date]
//! 커피 4,500원 지출 식비 1/9
//! ```
//!
//! Tokens are whitespace-separated; anything after the fifth is ignored.
//! The date accepts `Y/M/D`, `M/D` (current year) or `Y-M-D`, with a
//! four-digit year and unsigned one- or two-digit month and day. A date
//! that matches none of them is not an error: the record falls back to
//! the current time and carries [`RecordDate::Defaulted`].

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};

use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::models::{RecordDate, TransactionKind, TransactionRecord};

const MIN_FIELDS: usize = 4;
const MAX_FIELDS: usize = 5;

#[derive(Debug, Clone)]
pub struct CommandParser {
    expense_literal: String,
    income_literal: String,
    currency_suffixes: Vec<String>,
}

impl CommandParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            expense_literal: config.expense_literal.trim().to_string(),
            income_literal: config.income_literal.trim().to_string(),
            currency_suffixes: config
                .currency_suffixes
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Parse `line`, defaulting a missing date to the local current time.
    pub fn parse(&self, line: &str) -> Result<TransactionRecord, ParseError> {
        self.parse_at(line, Local::now().naive_local())
    }

    /// Parse `line` with `now` as the reference instant.
    pub fn parse_at(
        &self,
        line: &str,
        now: NaiveDateTime,
    ) -> Result<TransactionRecord, ParseError> {
        let tokens: Vec<&str> = line.split_whitespace().take(MAX_FIELDS).collect();
        if tokens.is_empty() {
            return Err(ParseError::EmptyInput);
        }
        if tokens.len() < MIN_FIELDS {
            return Err(ParseError::TooFewFields);
        }

        let amount = self
            .parse_amount(tokens[1])
            .ok_or_else(|| ParseError::InvalidAmount(tokens[1].to_string()))?;
        let kind = self
            .parse_kind(tokens[2])
            .ok_or_else(|| ParseError::InvalidKind(tokens[2].to_string()))?;
        let date = match tokens.get(4) {
            Some(token) => parse_date(token, now),
            None => RecordDate::Defaulted(now),
        };

        Ok(TransactionRecord {
            title: tokens[0].to_string(),
            amount,
            kind,
            category: tokens[3].to_string(),
            date,
            content: line.trim().to_string(),
            sender: None,
        })
    }

    /// Digits with optional `,` separators and one trailing currency suffix.
    pub fn parse_amount(&self, token: &str) -> Option<i64> {
        let lowered = token.to_lowercase();
        let mut digits = lowered.as_str();
        for suffix in &self.currency_suffixes {
            if let Some(stripped) = digits.strip_suffix(suffix.as_str()) {
                digits = stripped;
                break;
            }
        }
        let digits: String = digits.chars().filter(|c| *c != ',').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn parse_kind(&self, token: &str) -> Option<TransactionKind> {
        if token == self.expense_literal {
            Some(TransactionKind::Expense)
        } else if token == self.income_literal {
            Some(TransactionKind::Income)
        } else {
            None
        }
    }

    /// The literal users type for `kind`.
    pub fn kind_literal(&self, kind: TransactionKind) -> &str {
        match kind {
            TransactionKind::Expense => &self.expense_literal,
            TransactionKind::Income => &self.income_literal,
        }
    }
}

/// Parse a date token, falling back to `now` when no format matches.
///
/// A parsed date is placed at midnight.
pub fn parse_date(token: &str, now: NaiveDateTime) -> RecordDate {
    match try_parse_date(token, now.year()).and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(ts) => RecordDate::Parsed(ts),
        None => RecordDate::Defaulted(now),
    }
}

fn try_parse_date(token: &str, current_year: i32) -> Option<NaiveDate> {
    let slash: Vec<&str> = token.split('/').collect();
    match slash.as_slice() {
        [y, m, d] => {
            if let Some(date) = ymd(year(y)?, m, d) {
                return Some(date);
            }
        }
        [m, d] => {
            if let Some(date) = ymd(current_year, m, d) {
                return Some(date);
            }
        }
        _ => {}
    }
    match token.split('-').collect::<Vec<_>>().as_slice() {
        [y, m, d] => ymd(year(y)?, m, d),
        _ => None,
    }
}

/// Exactly four ASCII digits.
fn year(token: &str) -> Option<i32> {
    if token.len() != 4 {
        return None;
    }
    unsigned(token, 4).map(|y| y as i32)
}

/// One to `max_len` ASCII digits, no sign.
fn unsigned(token: &str, max_len: usize) -> Option<u32> {
    if token.is_empty() || token.len() > max_len || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn ymd(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, unsigned(month, 2)?, unsigned(day, 2)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> CommandParser {
        CommandParser::new(&ParserConfig {
            expense_literal: "expense".to_string(),
            income_literal: "income".to_string(),
            ..ParserConfig::default()
        })
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_four_fields_default_date() {
        let rec = english()
            .parse_at("coffee 4500 expense transit", now())
            .unwrap();
        assert_eq!(rec.title, "coffee");
        assert_eq!(rec.amount, 4500);
        assert_eq!(rec.kind, TransactionKind::Expense);
        assert_eq!(rec.category, "transit");
        assert_eq!(rec.date, RecordDate::Defaulted(now()));
    }

    #[test]
    fn test_income_with_full_date() {
        let rec = english()
            .parse_at("salary 3,000,000 income pay 2026/1/25", now())
            .unwrap();
        assert_eq!(rec.kind, TransactionKind::Income);
        assert_eq!(rec.amount, 3_000_000);
        assert_eq!(rec.date.iso(), "2026-01-25T00:00:00");
        assert!(!rec.date.is_defaulted());
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert_eq!(english().parse_at("", now()), Err(ParseError::EmptyInput));
        assert_eq!(english().parse_at("   ", now()), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_too_few_fields() {
        assert_eq!(
            english().parse_at("coffee 4500 expense", now()),
            Err(ParseError::TooFewFields)
        );
    }

    #[test]
    fn test_invalid_amount_echoes_token() {
        assert_eq!(
            english().parse_at("coffee four-five expense transit", now()),
            Err(ParseError::InvalidAmount("four-five".to_string()))
        );
    }

    #[test]
    fn test_invalid_kind_echoes_token() {
        assert_eq!(
            english().parse_at("coffee 4500 invalidkind transit", now()),
            Err(ParseError::InvalidKind("invalidkind".to_string()))
        );
    }

    #[test]
    fn test_amount_is_checked_before_kind() {
        assert_eq!(
            english().parse_at("coffee abc nope transit", now()),
            Err(ParseError::InvalidAmount("abc".to_string()))
        );
    }

    #[test]
    fn test_amount_separators_and_suffixes() {
        let p = CommandParser::new(&ParserConfig::default());
        assert_eq!(p.parse_amount("4500"), Some(4500));
        assert_eq!(p.parse_amount("4,500"), Some(4500));
        assert_eq!(p.parse_amount("4,500원"), Some(4500));
        assert_eq!(p.parse_amount("12000KRW"), Some(12000));
        assert_eq!(p.parse_amount("-4500"), None);
        assert_eq!(p.parse_amount("원"), None);
        assert_eq!(p.parse_amount(",,"), None);
        assert_eq!(p.parse_amount("4.5"), None);
        assert_eq!(p.parse_amount("99999999999999999999"), None);
    }

    #[test]
    fn test_korean_literals() {
        let p = CommandParser::new(&ParserConfig::default());
        let rec = p.parse_at("점심 9,000원 지출 식비", now()).unwrap();
        assert_eq!(rec.kind, TransactionKind::Expense);
        assert_eq!(rec.amount, 9000);
        assert_eq!(p.kind_literal(TransactionKind::Income), "수입");
        assert!(p.parse_at("점심 9000 expense 식비", now()).is_err());
    }

    #[test]
    fn test_month_day_uses_current_year() {
        let d = parse_date("1/9", now());
        assert_eq!(
            d,
            RecordDate::Parsed(
                NaiveDate::from_ymd_opt(2026, 1, 9)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_iso_date() {
        let d = parse_date("2025-12-31", now());
        assert_eq!(d.iso(), "2025-12-31T00:00:00");
    }

    #[test]
    fn test_unparseable_date_defaults_to_now() {
        assert_eq!(parse_date("not-a-date", now()), RecordDate::Defaulted(now()));
        assert_eq!(parse_date("2/30", now()), RecordDate::Defaulted(now()));
        assert_eq!(parse_date("13/1", now()), RecordDate::Defaulted(now()));
        assert_eq!(parse_date("2026/1", now()), RecordDate::Defaulted(now()));
        assert_eq!(parse_date("26/1/9", now()), RecordDate::Defaulted(now()));
        assert_eq!(parse_date("-5/1/1", now()), RecordDate::Defaulted(now()));
        assert_eq!(parse_date("+1/+9", now()), RecordDate::Defaulted(now()));
        assert_eq!(parse_date("02026/1/9", now()), RecordDate::Defaulted(now()));
        assert_eq!(parse_date("-0005-01-01", now()), RecordDate::Defaulted(now()));
        assert_eq!(parse_date("26-01-09", now()), RecordDate::Defaulted(now()));
    }

    #[test]
    fn test_padded_month_and_day_parse() {
        assert_eq!(parse_date("2026/01/09", now()).iso(), "2026-01-09T00:00:00");
        assert_eq!(parse_date("03/07", now()).iso(), "2026-03-07T00:00:00");
        assert_eq!(parse_date("2025-1-5", now()).iso(), "2025-01-05T00:00:00");
    }

    #[test]
    fn test_extra_tokens_are_ignored() {
        let rec = english()
            .parse_at("coffee 4500 expense transit 3/1 and more", now())
            .unwrap();
        assert_eq!(rec.date.iso(), "2026-03-01T00:00:00");
        assert_eq!(rec.content, "coffee 4500 expense transit 3/1 and more");
        assert_eq!(rec.sender, None);
    }

    #[test]
    fn test_amount_round_trips_for_many_values() {
        let p = english();
        for n in [0_i64, 7, 1_000, 45_000, 1_234_567] {
            let line = format!("x {} income pay", n);
            assert_eq!(p.parse_at(&line, now()).unwrap().amount, n);
        }
    }
}
