use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Format used both for parsing the `date` column and for display.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Names of the columns every source must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "source", "dish", "comment"];

/// One feedback entry as loaded from the source.
///
/// `date` is `None` when the source text could not be parsed; such rows are
/// kept but never match a date-bounded filter.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub date: Option<NaiveDate>,
    /// Restaurant identifier.
    pub source: String,
    pub dish: String,
    pub comment: Option<String>,
}

impl FeedbackRecord {
    pub fn new(
        date: Option<NaiveDate>,
        source: impl Into<String>,
        dish: impl Into<String>,
        comment: Option<String>,
    ) -> Self {
        FeedbackRecord {
            date,
            source: source.into(),
            dish: dish.into(),
            comment,
        }
    }

    /// Builds a record from raw cell text, nulling an unparseable date.
    pub fn from_cells(date: &str, source: &str, dish: &str, comment: &str) -> Self {
        let comment = comment.trim();
        FeedbackRecord {
            date: parse_date(date),
            source: source.trim().to_string(),
            dish: dish.trim().to_string(),
            comment: if comment.is_empty() {
                None
            } else {
                Some(comment.to_string())
            },
        }
    }
}

/// Parses `dd.mm.yyyy`, returning `None` on anything else.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

/// Renders a date as `dd.mm.yyyy`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
