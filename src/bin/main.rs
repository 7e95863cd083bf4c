use clap::Parser;
use restaurant_insight_orchestrator::{
    config::Settings,
    coordinator::KeywordCoordinator,
    llm::{GeminiClient, Generator, MockGenerator, RetryPolicy, RetryingGenerator},
    models::{AnalysisContext, ExecutionMode},
    registry::AgentRegistry,
    service::InsightService,
    supplementary::{NoSupplementaryData, PgSupplementaryStore, SupplementaryData},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ask the restaurant specialists a business question
#[derive(Parser, Debug)]
#[command(name = "insight", version, about)]
struct Cli {
    /// The business question
    query: String,

    /// Business context as a JSON object, e.g. '{"cuisine":"Thai","location":"Austin, TX"}'
    #[arg(short, long)]
    context: Option<String>,

    /// Force an execution mode: parallel or sequential
    #[arg(short, long)]
    mode: Option<ExecutionMode>,

    /// Run without a model: keyword planning and sample answers
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so stdout stays pure JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    let context: AnalysisContext = match cli.context.as_deref() {
        Some(raw) => serde_json::from_str(raw)?,
        None => AnalysisContext::default(),
    };

    let generator: Arc<dyn Generator> = if cli.offline {
        Arc::new(MockGenerator::new())
    } else {
        Arc::new(RetryingGenerator::new(
            GeminiClient::new(&settings.llm)?,
            RetryPolicy::new(settings.llm.max_retries, settings.llm.retry_backoff),
        ))
    };

    let data: Arc<dyn SupplementaryData> = match settings.database_url.as_deref() {
        Some(url) if !cli.offline => Arc::new(PgSupplementaryStore::connect_lazy(url)?),
        _ => Arc::new(NoSupplementaryData),
    };

    let mut registry = AgentRegistry::new(generator, data, &settings);
    if cli.offline {
        registry.set_coordinator(Arc::new(KeywordCoordinator::new()));
    }
    let service = InsightService::with_registry(Arc::new(registry), &settings);

    info!(offline = cli.offline, "Running analysis");
    let result = service.handle_with_mode(&cli.query, context, cli.mode).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
