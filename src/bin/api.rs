use restaurant_insight_orchestrator::{
    api::start_server,
    config::Settings,
    llm::{GeminiClient, RetryPolicy, RetryingGenerator},
    service::InsightService,
    supplementary::{NoSupplementaryData, PgSupplementaryStore, SupplementaryData},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;

    if !settings.has_api_key() {
        warn!("GEMINI_API_KEY not set; every analysis will report the model as unavailable");
    }

    info!("🚀 Restaurant Insight Orchestrator - API Server");
    info!("📍 Port: {}", settings.port);
    info!(model = %settings.llm.model, mode = ?settings.mode, "Model configuration");

    let gemini = GeminiClient::new(&settings.llm)?;
    let generator = Arc::new(RetryingGenerator::new(
        gemini,
        RetryPolicy::new(settings.llm.max_retries, settings.llm.retry_backoff),
    ));

    let data: Arc<dyn SupplementaryData> = match settings.database_url.as_deref() {
        Some(url) => Arc::new(PgSupplementaryStore::connect_lazy(url)?),
        None => {
            info!("No DATABASE_URL; specialists will rely on domain knowledge");
            Arc::new(NoSupplementaryData)
        }
    };

    let service = Arc::new(InsightService::build(generator, data, &settings));

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(service, settings.port).await?;

    Ok(())
}
