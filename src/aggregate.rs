use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::filter::FlaggedRecord;
use crate::record::format_date;

/// Colours pinned to known restaurants in the proportion chart.
pub const RESTAURANT_COLORS: [(&str, &str); 3] = [
    ("Restaurant 23", "#1f77b4"),
    ("Restaurant 25", "#2ca02c"),
    ("Restaurant 28", "#d62728"),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DishCount {
    pub dish: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RestaurantCount {
    pub restaurant: String,
    pub count: usize,
    /// Fixed colour, if this restaurant has one.
    pub color: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DateCount {
    pub date: NaiveDate,
    /// `dd.mm.yyyy`
    pub label: String,
    pub count: usize,
}

/// One line of the detail table, with the date already formatted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub date: String,
    pub comment: String,
    pub dish: String,
    pub source: String,
    pub negative: bool,
}

pub fn restaurant_color(restaurant: &str) -> Option<&'static str> {
    RESTAURANT_COLORS
        .iter()
        .find(|(name, _)| *name == restaurant)
        .map(|(_, color)| *color)
}

/// Rows per dish, most reviewed first.
///
/// Dishes with equal counts keep the order in which they first appear in
/// `records`.
pub fn count_by_dish(records: &[FlaggedRecord]) -> Vec<DishCount> {
    let mut counts = group_in_order(records.iter().map(|f| f.record.dish.as_str()))
        .into_iter()
        .map(|(dish, count)| DishCount { dish, count })
        .collect::<Vec<_>>();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Rows per restaurant in order of first appearance.
pub fn count_by_restaurant(records: &[FlaggedRecord]) -> Vec<RestaurantCount> {
    group_in_order(records.iter().map(|f| f.record.source.as_str()))
        .into_iter()
        .map(|(restaurant, count)| RestaurantCount {
            color: restaurant_color(&restaurant),
            restaurant,
            count,
        })
        .collect()
}

/// Rows per calendar day, oldest first. Rows without a date are skipped.
pub fn count_by_date(records: &[FlaggedRecord]) -> Vec<DateCount> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in records.iter().filter_map(|f| f.record.date) {
        *per_day.entry(date).or_insert(0) += 1;
    }
    per_day
        .into_iter()
        .map(|(date, count)| DateCount {
            date,
            label: format_date(date),
            count,
        })
        .collect()
}

/// Presentation copy of the filtered rows.
pub fn format_for_display(records: &[FlaggedRecord]) -> Vec<DisplayRow> {
    records
        .iter()
        .map(|f| DisplayRow {
            date: f.record.date.map(format_date).unwrap_or_default(),
            comment: f.record.comment.clone().unwrap_or_default(),
            dish: f.record.dish.clone(),
            source: f.record.source.clone(),
            negative: f.negative,
        })
        .collect()
}

fn group_in_order<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, usize)> = Vec::new();
    for key in keys {
        match index.get(key) {
            Some(&slot) => groups[slot].1 += 1,
            None => {
                index.insert(key, groups.len());
                groups.push((key.to_string(), 1));
            }
        }
    }
    groups
}
