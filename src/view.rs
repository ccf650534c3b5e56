use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    DateCount, DishCount, DisplayRow, RestaurantCount, count_by_date, count_by_dish,
    count_by_restaurant, format_for_display,
};
use crate::filter::{
    DateRange, FilterSelection, apply_filters, available_dishes, available_restaurants, date_bounds,
};
use crate::record::{FeedbackRecord, format_date};

/// Raw user input from the filter panel.
///
/// `None` lists mean the widget was never touched and default to every
/// option. `Some(vec![])` means the user cleared it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRequest {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub restaurants: Option<Vec<String>>,
    pub dishes: Option<Vec<String>>,
    pub negative_only: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub selected: bool,
}

/// State of the filter widgets after resolving defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilterPanel {
    /// Span of valid dates in the whole dataset.
    pub data_range: Option<DateRange>,
    /// Span actually applied.
    pub selected_range: Option<DateRange>,
    pub selected_from_label: String,
    pub selected_to_label: String,
    pub restaurants: Vec<SelectOption>,
    pub dishes: Vec<SelectOption>,
    pub negative_only: bool,
}

/// Everything the dashboard shows for one interaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub panel: FilterPanel,
    pub total_records: usize,
    pub filtered_count: usize,
    pub negative_count: usize,
    pub dish_counts: Vec<DishCount>,
    pub restaurant_counts: Vec<RestaurantCount>,
    pub date_counts: Vec<DateCount>,
    pub rows: Vec<DisplayRow>,
}

impl DashboardView {
    pub fn is_empty(&self) -> bool {
        self.filtered_count == 0
    }
}

/// Resolves the widget state against the loaded dataset.
///
/// Returns `None` for the selection when there is no date range to apply,
/// which happens only when no record carries a valid date and the user gave
/// no bounds.
pub fn resolve(
    records: &[FeedbackRecord],
    request: &FilterRequest,
) -> (FilterPanel, Option<FilterSelection>) {
    let data_range = date_bounds(records);
    let selected_range = DateRange::from_bounds(request.from, request.to).or(data_range);

    let restaurant_options = available_restaurants(records);
    let restaurants = match &request.restaurants {
        Some(chosen) => restaurant_options
            .iter()
            .filter(|option| chosen.contains(option))
            .cloned()
            .collect(),
        None => restaurant_options.clone(),
    };

    let dish_options = available_dishes(records, &restaurants);
    let dishes: Vec<String> = match &request.dishes {
        Some(chosen) => dish_options
            .iter()
            .filter(|option| chosen.contains(option))
            .cloned()
            .collect(),
        None => dish_options.clone(),
    };

    let panel = FilterPanel {
        data_range,
        selected_range,
        selected_from_label: selected_range.map(|r| format_date(r.start)).unwrap_or_default(),
        selected_to_label: selected_range.map(|r| format_date(r.end)).unwrap_or_default(),
        restaurants: mark_selected(&restaurant_options, &restaurants),
        dishes: mark_selected(&dish_options, &dishes),
        negative_only: request.negative_only,
    };

    let selection = selected_range.map(|date_range| FilterSelection {
        date_range,
        restaurants,
        dishes,
        negative_only: request.negative_only,
    });

    (panel, selection)
}

/// The whole load → filter → aggregate step for one interaction.
///
/// Pure: the same records and request always give the same view, and
/// `records` is not modified.
pub fn render(records: &[FeedbackRecord], request: &FilterRequest) -> DashboardView {
    let (panel, selection) = resolve(records, request);
    let filtered = match &selection {
        Some(selection) => apply_filters(records, selection),
        None => Vec::new(),
    };

    DashboardView {
        panel,
        total_records: records.len(),
        filtered_count: filtered.len(),
        negative_count: filtered.iter().filter(|f| f.negative).count(),
        dish_counts: count_by_dish(&filtered),
        restaurant_counts: count_by_restaurant(&filtered),
        date_counts: count_by_date(&filtered),
        rows: format_for_display(&filtered),
    }
}

fn mark_selected(options: &[String], selected: &[String]) -> Vec<SelectOption> {
    options
        .iter()
        .map(|value| SelectOption {
            value: value.clone(),
            selected: selected.contains(value),
        })
        .collect()
}
