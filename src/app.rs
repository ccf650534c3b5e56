use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::Query;
use chrono::NaiveDate;
use handlebars::Handlebars;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::cache::CachedLoader;
use crate::chart::{self, ChartOptions};
use crate::config::DashboardConfig;
use crate::error::{ExportError, LoadError};
use crate::export;
use crate::loader::{CsvSource, FeedbackSource};
use crate::record::{DATE_FORMAT, FeedbackRecord};
use crate::sheets::GoogleSheetsSource;
use crate::view::{self, DashboardView, FilterRequest};

pub const PAGE_TITLE: &str = "FEEDBACK: аналитика отзывов по блюдам";

pub struct AppState {
    loader: Mutex<CachedLoader>,
    templates: Handlebars<'static>,
}

/// Filter panel as submitted by the browser.
///
/// `applied` is a hidden field set by the form, so that an absent list after
/// a submit means "nothing selected" rather than "untouched".
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    from: Option<String>,
    to: Option<String>,
    #[serde(default)]
    restaurant: Vec<String>,
    #[serde(default)]
    dish: Vec<String>,
    #[serde(default)]
    negative: Vec<String>,
    applied: Option<String>,
}

impl DashboardQuery {
    pub fn into_request(self) -> FilterRequest {
        let applied = self.applied.is_some();
        let chosen = |values: Vec<String>| {
            if applied || !values.is_empty() {
                Some(values)
            } else {
                None
            }
        };
        FilterRequest {
            from: self.from.as_deref().and_then(parse_date_input),
            to: self.to.as_deref().and_then(parse_date_input),
            restaurants: chosen(self.restaurant),
            dishes: chosen(self.dish),
            negative_only: self
                .negative
                .iter()
                .any(|v| matches!(v.as_str(), "on" | "true" | "1")),
        }
    }
}

/// Accepts the ISO form sent by date pickers as well as `dd.mm.yyyy`.
fn parse_date_input(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, DATE_FORMAT))
        .ok()
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
    records: Option<usize>,
}

/// Failures surfaced to the browser.
#[derive(Debug)]
pub enum AppError {
    Load(LoadError),
    Export(ExportError),
    Render(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Load(err) if err.is_schema_error() => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Load(_) => StatusCode::BAD_GATEWAY,
            AppError::Export(_) | AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Load(err) => format!("Не удалось загрузить данные: {}", err),
            AppError::Export(err) => format!("Не удалось выгрузить данные: {}", err),
            AppError::Render(msg) => format!("Не удалось построить страницу: {}", msg),
        }
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::Load(err)
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Export(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("{}", self.message());
        (
            self.status(),
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.message()),
                records: None,
            }),
        )
            .into_response()
    }
}

/// Picks the configured data source: a local CSV export if one is set,
/// otherwise the remote spreadsheet.
pub fn source_from_config(config: &DashboardConfig) -> Result<Box<dyn FeedbackSource>, LoadError> {
    match &config.csv_path {
        Some(path) => Ok(Box::new(CsvSource::new(path.clone()))),
        None => Ok(Box::new(GoogleSheetsSource::from_config(config)?)),
    }
}

/// Builds the dashboard router around a loader.
pub fn router(loader: CachedLoader) -> Result<Router, handlebars::TemplateError> {
    let mut templates = Handlebars::new();
    templates.register_template_string("dashboard", include_str!("./templates/dashboard.hbs"))?;

    let state = Arc::new(AppState {
        loader: Mutex::new(loader),
        templates,
    });

    let api = Router::new()
        .route("/api/view", get(get_view))
        .route("/api/refresh", post(refresh))
        .layer(CorsLayer::permissive());

    Ok(Router::new()
        .route("/", get(serve_dashboard))
        .route("/charts/restaurants.svg", get(restaurants_chart))
        .route("/charts/timeline.svg", get(timeline_chart))
        .route("/export.csv", get(export_csv))
        .route("/export.xlsx", get(export_xlsx))
        .merge(api)
        .with_state(state))
}

pub async fn run(config: DashboardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = source_from_config(&config)?;
    info!(
        "serving feedback from {} (cache ttl {:?})",
        source.describe(),
        config.cache_ttl
    );
    let app = router(CachedLoader::new(source, config.cache_ttl))?;

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn load_records(state: &AppState) -> Result<Arc<Vec<FeedbackRecord>>, AppError> {
    let mut loader = state.loader.lock().await;
    Ok(loader.load().await?)
}

async fn current_view(state: &AppState, query: DashboardQuery) -> Result<DashboardView, AppError> {
    let records = load_records(state).await?;
    Ok(view::render(&records, &query.into_request()))
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    RawQuery(raw_query): RawQuery,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let (status, context) = match current_view(&state, query).await {
        Ok(view) => (
            StatusCode::OK,
            serde_json::json!({
                "title": PAGE_TITLE,
                "view": view,
                "query": raw_query.unwrap_or_default(),
            }),
        ),
        Err(err) => {
            error!("{}", err.message());
            (
                err.status(),
                serde_json::json!({
                    "title": PAGE_TITLE,
                    "error": err.message(),
                }),
            )
        }
    };

    match state.templates.render("dashboard", &context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => AppError::Render(e.to_string()).into_response(),
    }
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardView>, AppError> {
    Ok(Json(current_view(&state, query).await?))
}

async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, AppError> {
    let mut loader = state.loader.lock().await;
    loader.invalidate();
    let records = loader.load().await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
        message: None,
        records: Some(records.len()),
    }))
}

async fn restaurants_chart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let view = current_view(&state, query).await?;
    let svg = chart::restaurant_pie_svg(&view.restaurant_counts, &ChartOptions::restaurants())
        .map_err(|e| AppError::Render(e.to_string()))?;
    Ok(svg_response(svg))
}

async fn timeline_chart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let view = current_view(&state, query).await?;
    let svg = chart::timeline_svg(&view.date_counts, &ChartOptions::timeline())
        .map_err(|e| AppError::Render(e.to_string()))?;
    Ok(svg_response(svg))
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let view = current_view(&state, query).await?;
    let csv = export::to_csv(&view.rows)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"feedback.csv\""),
        ],
        csv,
    )
        .into_response())
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let view = current_view(&state, query).await?;
    let bytes = export::to_xlsx(&view.rows)?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"feedback.xlsx\""),
        ],
        bytes,
    )
        .into_response())
}

fn svg_response(svg: String) -> Response {
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_form_selects_everything() {
        let request = DashboardQuery::default().into_request();
        assert_eq!(request, FilterRequest::default());
    }

    #[test]
    fn submitted_form_with_no_restaurants_means_none() {
        let query = DashboardQuery {
            applied: Some("1".into()),
            dish: vec!["Soup".into()],
            negative: vec!["on".into()],
            from: Some("2024-01-02".into()),
            to: Some("".into()),
            ..DashboardQuery::default()
        };
        let request = query.into_request();
        assert_eq!(request.restaurants, Some(vec![]));
        assert_eq!(request.dishes, Some(vec!["Soup".to_string()]));
        assert!(request.negative_only);
        assert_eq!(request.from, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(request.to, None);
    }

    #[test]
    fn repeated_negative_flag_is_accepted() {
        let query = DashboardQuery {
            negative: vec!["on".into(), "on".into()],
            ..DashboardQuery::default()
        };
        assert!(query.into_request().negative_only);

        let off = DashboardQuery {
            negative: vec!["off".into()],
            ..DashboardQuery::default()
        };
        assert!(!off.into_request().negative_only);
    }

    #[test]
    fn date_input_accepts_both_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date_input("2024-03-09"), expected);
        assert_eq!(parse_date_input("09.03.2024"), expected);
        assert_eq!(parse_date_input("soon"), None);
    }
}
