// Main entry point - Dependency injection and dashboard startup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::supabase_repository::SupabaseRepository;
use crate::presentation::app::App;

/// Fetch results younger than this are reused instead of re-queried.
const QUERY_CACHE_TTL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr so tracing output does not fight the dashboard,
    // which owns stdout. Enable with RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Resolve configuration once; missing credentials warn, not abort.
    let config = load_app_config()?;
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    // Repository (infrastructure layer)
    let repository = Arc::new(SupabaseRepository::new(
        config.supabase_url.clone(),
        config.supabase_anon_key.clone(),
    )?);

    // Service (application layer)
    let service = DashboardService::new(repository, QUERY_CACHE_TTL);

    // Dashboard loop (presentation layer)
    let app = App::new(service, &config);
    presentation::app::run(app).await
}
