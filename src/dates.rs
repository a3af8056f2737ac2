use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// a date value as it arrives from the store or a caller
///
/// Stored records carry dates in several textual encodings plus a
/// pre-parsed epoch-seconds object, so the input side is a sum type
/// rather than a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    /// pre-parsed timestamp object, seconds since the unix epoch
    Epoch { seconds: i64 },
    /// any of the supported textual encodings
    Text(String),
}

impl DateInput {
    /// empty text carries no date at all
    pub fn is_empty(&self) -> bool {
        matches!(self, DateInput::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

/// one textual encoding the parser understands
///
/// Strategies are tried in declaration order; each is independently
/// testable via [`ParseStrategy::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// `2025-08-20`
    IsoDate,
    /// `August 20, 2025 at 14:30`
    LongFormWithTime,
    /// `August 20, 2025`
    LongForm,
    /// `08/20/2025 at 14:30`
    SlashWithTime,
}

impl ParseStrategy {
    /// all strategies in priority order
    pub const ALL: [ParseStrategy; 4] = [
        ParseStrategy::IsoDate,
        ParseStrategy::LongFormWithTime,
        ParseStrategy::LongForm,
        ParseStrategy::SlashWithTime,
    ];

    /// attempt this single strategy against the text
    ///
    /// Date-only encodings normalize to midnight so that day-difference
    /// arithmetic is stable.
    pub fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        match self {
            ParseStrategy::IsoDate => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(at_midnight),
            ParseStrategy::LongFormWithTime => {
                NaiveDateTime::parse_from_str(text, "%B %d, %Y at %H:%M").ok()
            }
            ParseStrategy::LongForm => NaiveDate::parse_from_str(text, "%B %d, %Y")
                .ok()
                .map(at_midnight),
            ParseStrategy::SlashWithTime => {
                NaiveDateTime::parse_from_str(text, "%m/%d/%Y at %H:%M").ok()
            }
        }
    }
}

fn at_midnight(d: NaiveDate) -> NaiveDateTime {
    d.and_time(NaiveTime::MIN)
}

/// parse any supported date encoding
///
/// # Errors
///
/// Returns [`LedgerError::InvalidDate`] when no strategy matches; callers
/// that want a fallback use [`parse_or_today`] instead.
pub fn parse_flexible(input: &DateInput) -> Result<NaiveDateTime> {
    match input {
        DateInput::Epoch { seconds } => DateTime::from_timestamp(*seconds, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| LedgerError::InvalidDate {
                input: format!("epoch {seconds}"),
            }),
        DateInput::Text(text) => ParseStrategy::ALL
            .iter()
            .find_map(|s| s.parse(text))
            .ok_or_else(|| LedgerError::InvalidDate {
                input: text.clone(),
            }),
    }
}

/// parse result with an explicit fallback marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub value: NaiveDateTime,
    /// true when parsing failed and `today` was substituted
    pub fell_back: bool,
}

/// parse with a last-resort fallback to the provided current date
///
/// The fallback is flagged, never silent; callers decide whether a
/// fallback date is acceptable for their operation.
pub fn parse_or_today(input: &DateInput, today: NaiveDate) -> ParsedDate {
    match parse_flexible(input) {
        Ok(value) => ParsedDate {
            value,
            fell_back: false,
        },
        Err(_) => ParsedDate {
            value: at_midnight(today),
            fell_back: true,
        },
    }
}

/// render as `Month D, YYYY`
pub fn format_display_date(dt: NaiveDateTime) -> String {
    dt.format("%B %-d, %Y").to_string()
}

/// render as `HH:MM`
pub fn format_display_time(dt: NaiveDateTime) -> String {
    dt.format("%H:%M").to_string()
}

/// display formatting that degrades to a sentinel instead of erroring
pub fn display_date_lenient(input: &DateInput) -> String {
    match parse_flexible(input) {
        Ok(dt) => format_display_date(dt),
        Err(_) => "N/A".to_string(),
    }
}
