/*!
# Feedback Dashboard

A single-page analytics dashboard over restaurant feedback, built in Rust.

## Overview

Feedback records (date, restaurant, dish, comment) live in a shared
spreadsheet. The dashboard loads them once per cache window, lets the user
narrow them by date range, restaurant, dish and a negative-sentiment flag,
and shows the result as summary tables and charts.

## Architecture

Every interaction runs the same pure pipeline:

```text
load (memoised) -> resolve filter request -> filter -> aggregate -> render
```

### Data Layer
- **loader**: `FeedbackSource` trait, CSV and in-memory sources, and the
  conversion of a raw header+rows table into `FeedbackRecord`s
- **sheets**: Google Sheets values API client (`web` feature)
- **cache**: explicit time-to-live cache owning the loaded records

### Logic Layer
- **sentiment**: keyword-based negative flag
- **filter**: selectable options and the conjunction of all filters
- **aggregate**: counts per dish, restaurant and day; display formatting
- **view**: `render(records, request) -> DashboardView`

### Presentation Layer (`web` feature)
- **chart**: SVG pie and line charts
- **export**: CSV and XLSX downloads of the detail table
- **app**: axum routes and the HTML dashboard

## REST API Endpoints

- `/` - HTML dashboard
- `/api/view` - Current view as JSON
- `/api/refresh` - Drops the cache and reloads
- `/charts/restaurants.svg`, `/charts/timeline.svg` - Charts
- `/export.csv`, `/export.xlsx` - Filtered rows
*/

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod record;
pub mod sentiment;
pub mod view;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod chart;
#[cfg(feature = "web")]
pub mod sheets;

/// Re-export the pipeline types to make them easier to use
pub use aggregate::*;
pub use cache::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use filter::*;
pub use loader::*;
pub use record::*;
pub use sentiment::*;
pub use view::*;
