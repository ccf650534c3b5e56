use feedback_dashboard::app;
use feedback_dashboard::config::DashboardConfig;

/// Main entry point for the dashboard server
///
/// Reads `FEEDBACK_*` settings from the environment and serves the dashboard
/// until the process is stopped. Log verbosity follows `RUST_LOG`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DashboardConfig::from_env()?;
    app::run(config).await
}
