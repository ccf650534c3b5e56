use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::record::FeedbackRecord;
use crate::sentiment::is_negative;

/// Inclusive calendar range. `start <= end` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range from two bounds given in either order.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            DateRange { start: a, end: b }
        } else {
            DateRange { start: b, end: a }
        }
    }

    /// A range covering one day.
    pub fn single(day: NaiveDate) -> Self {
        DateRange {
            start: day,
            end: day,
        }
    }

    /// Resolves a possibly half-selected range. One bound means a single day.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (Some(a), Some(b)) => Some(DateRange::new(a, b)),
            (Some(day), None) | (None, Some(day)) => Some(DateRange::single(day)),
            (None, None) => None,
        }
    }

    /// Null dates never match.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        date.is_some_and(|d| self.start <= d && d <= self.end)
    }
}

/// The fully resolved filter state used to narrow the dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub date_range: DateRange,
    pub restaurants: Vec<String>,
    pub dishes: Vec<String>,
    pub negative_only: bool,
}

impl FilterSelection {
    /// Every option selected: full date span, all restaurants, all dishes.
    ///
    /// Returns `None` when no record has a valid date, since there is no span
    /// to select.
    pub fn defaults_for(records: &[FeedbackRecord]) -> Option<Self> {
        Some(FilterSelection {
            date_range: date_bounds(records)?,
            restaurants: available_restaurants(records),
            dishes: available_dishes(records, &[]),
            negative_only: false,
        })
    }
}

/// A record that passed the filters, with its negative flag computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlaggedRecord {
    pub record: FeedbackRecord,
    pub negative: bool,
}

/// Earliest and latest valid dates in the dataset.
pub fn date_bounds(records: &[FeedbackRecord]) -> Option<DateRange> {
    let mut dates = records.iter().filter_map(|r| r.date);
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(min, max), d| (min.min(d), max.max(d)));
    Some(DateRange { start: min, end: max })
}

/// Distinct restaurants in order of first appearance.
pub fn available_restaurants(records: &[FeedbackRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.source.as_str()))
}

/// Distinct dishes offered by the selected restaurants.
///
/// An empty selection falls back to every dish in the dataset rather than
/// an empty list.
pub fn available_dishes(records: &[FeedbackRecord], selected_restaurants: &[String]) -> Vec<String> {
    if selected_restaurants.is_empty() {
        return distinct(records.iter().map(|r| r.dish.as_str()));
    }
    let wanted: HashSet<&str> = selected_restaurants.iter().map(String::as_str).collect();
    distinct(
        records
            .iter()
            .filter(|r| wanted.contains(r.source.as_str()))
            .map(|r| r.dish.as_str()),
    )
}

/// Narrows `records` to the rows matching every part of `selection`.
///
/// The input is left untouched; matching rows are copied into the result
/// along with their negative flag.
pub fn apply_filters(records: &[FeedbackRecord], selection: &FilterSelection) -> Vec<FlaggedRecord> {
    let restaurants: HashSet<&str> = selection.restaurants.iter().map(String::as_str).collect();
    let dishes: HashSet<&str> = selection.dishes.iter().map(String::as_str).collect();

    records
        .iter()
        .filter(|r| selection.date_range.contains(r.date))
        .filter(|r| dishes.contains(r.dish.as_str()))
        .filter(|r| restaurants.contains(r.source.as_str()))
        .map(|r| FlaggedRecord {
            record: r.clone(),
            negative: is_negative(r.comment.as_deref()),
        })
        .filter(|flagged| !selection.negative_only || flagged.negative)
        .collect()
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}
