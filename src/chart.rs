use chrono::{Duration, NaiveDate};
use plotters::element::Pie;
use plotters::prelude::*;

use crate::aggregate::{DateCount, RestaurantCount};
use crate::record::DATE_FORMAT;

/// Configuration options for chart generation
///
/// Title, axis labels and pixel size shared by both dashboard charts.
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis (ignored by the pie chart)
    pub x_label: String,

    /// Label for the Y-axis (ignored by the pie chart)
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            width: 800,
            height: 500,
        }
    }
}

impl ChartOptions {
    pub fn restaurants() -> Self {
        Self {
            title: "Распределение отзывов по ресторанам".to_string(),
            ..Self::default()
        }
    }

    pub fn timeline() -> Self {
        Self {
            title: "Отзывы по дням".to_string(),
            x_label: "date".to_string(),
            y_label: "Количество".to_string(),
            ..Self::default()
        }
    }
}

/// Slice colour for each restaurant, in input order.
///
/// Restaurants with a fixed colour keep it; the rest take successive entries
/// of the automatic palette.
pub fn slice_colors(counts: &[RestaurantCount]) -> Vec<RGBColor> {
    let mut next_auto = 0;
    counts
        .iter()
        .map(|entry| match entry.color.and_then(parse_hex) {
            Some(color) => color,
            None => {
                let rgb = Palette99::pick(next_auto).to_backend_color().rgb;
                next_auto += 1;
                RGBColor(rgb.0, rgb.1, rgb.2)
            }
        })
        .collect()
}

/// Parses `#rrggbb`.
pub fn parse_hex(hex: &str) -> Option<RGBColor> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(digits.get(range)?, 16).ok();
    Some(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Creates the restaurant proportion chart
///
/// Draws one pie slice per restaurant with percentage labels. An empty input
/// produces a chart with only the title.
///
/// # Returns
/// * A Result containing the SVG document or an error
pub fn restaurant_pie_svg(
    counts: &[RestaurantCount],
    options: &ChartOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled(&options.title, ("sans-serif", 24).into_font())?;

        if !counts.is_empty() {
            let (width, height) = root.dim_in_pixel();
            let center = (width as i32 / 2, height as i32 / 2);
            let radius = (width.min(height) as f64) * 0.35;
            let sizes: Vec<f64> = counts.iter().map(|c| c.count as f64).collect();
            let colors = slice_colors(counts);
            let labels: Vec<&str> = counts.iter().map(|c| c.restaurant.as_str()).collect();

            let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
            pie.start_angle(-90.0);
            pie.label_style(("sans-serif", 16).into_font());
            pie.percentages(("sans-serif", 14).into_font().color(&WHITE));
            root.draw(&pie)?;
        }

        root.present()?;
    }
    Ok(svg)
}

/// Creates the reviews-per-day line chart
///
/// The x-axis is a calendar axis labelled `dd.mm.yyyy`. Points are drawn in
/// the order given, which callers keep chronological.
///
/// # Returns
/// * A Result containing the SVG document or an error
pub fn timeline_svg(
    counts: &[DateCount],
    options: &ChartOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let (start, end) = date_axis(counts);
        let max_y = counts.iter().map(|c| c.count).max().unwrap_or(0);

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(start..end, 0usize..max_y + 1)?;

        chart
            .configure_mesh()
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .x_label_formatter(&|date: &NaiveDate| date.format(DATE_FORMAT).to_string())
            .draw()?;

        chart.draw_series(LineSeries::new(
            counts.iter().map(|c| (c.date, c.count)),
            &BLUE,
        ))?;
        chart.draw_series(
            counts
                .iter()
                .map(|c| Circle::new((c.date, c.count), 3, BLUE.filled())),
        )?;

        root.present()?;
    }
    Ok(svg)
}

/// X-axis span: first to last date, widened to at least one day.
///
/// With no points the axis covers the Unix epoch day.
fn date_axis(counts: &[DateCount]) -> (NaiveDate, NaiveDate) {
    let start = counts.first().map(|c| c.date).unwrap_or_default();
    let end = counts.last().map(|c| c.date).unwrap_or(start);
    if end > start {
        (start, end)
    } else {
        (start, start + Duration::days(1))
    }
}
