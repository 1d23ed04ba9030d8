//! tqa-pipeline - Translation QA Pipeline Service
//!
//! Runs uploaded translation files through the layered QA pipeline:
//! deterministic rules (L1), AI screening (L2), deep AI analysis (L3),
//! cross-file consistency, and MQM scoring with auto-pass gating.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tqa_common::config::TomlConfig;
use tqa_common::events::EventBus;
use tqa_pipeline::db::audit::AuditLog;
use tqa_pipeline::db::files::FileRepository;
use tqa_pipeline::db::findings::FindingRepository;
use tqa_pipeline::db::runs::RunJournal;
use tqa_pipeline::db::scores::ScoreRepository;
use tqa_pipeline::db::segments::SegmentRepository;
use tqa_pipeline::db::weights::ScoringConfigRepository;
use tqa_pipeline::layers::{AiPassRunner, ConsistencyPass, RulePassRunner};
use tqa_pipeline::models::Layer;
use tqa_pipeline::scoring::ScoreOrchestrator;
use tqa_pipeline::services::limits::{
    BudgetService, GovernorRateLimiter, HttpBudgetService, RateLimiterService, UnlimitedBudget,
};
use tqa_pipeline::services::llm::HttpTextGenerator;
use tqa_pipeline::services::notify::EventBusNotifier;
use tqa_pipeline::services::rules::{BuiltinRuleEngine, EmptyGlossary, EmptyRuleConfig};
use tqa_pipeline::workflow::PipelineWorkflow;
use tqa_pipeline::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting tqa-pipeline (Translation QA Pipeline) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path =
        std::env::var("TQA_CONFIG").unwrap_or_else(|_| "tqa-pipeline.toml".to_string());
    let config = TomlConfig::load(Path::new(&config_path))?;

    let db_pool = tqa_pipeline::db::init_database_pool(Path::new(&config.database_path)).await?;
    info!("Database connection established: {}", config.database_path);

    let api_key = tqa_pipeline::config::resolve_ai_api_key(&db_pool, &config)
        .await?
        .unwrap_or_else(|| {
            warn!("No AI API key configured; AI layer calls will be rejected by the provider");
            String::new()
        });

    let event_bus = EventBus::new(100);
    info!("Event bus initialized");

    let screening_generator = Arc::new(HttpTextGenerator::new(
        &config.ai,
        config.ai.screening_model.clone(),
        api_key.clone(),
    ));
    let deep_generator = Arc::new(HttpTextGenerator::new(
        &config.ai,
        config.ai.deep_model.clone(),
        api_key,
    ));

    let limiter: Arc<dyn RateLimiterService> =
        Arc::new(GovernorRateLimiter::new(config.rate_limit_per_minute));
    let budget: Arc<dyn BudgetService> = match &config.budget_service_url {
        Some(url) => {
            info!("Budget service: {}", url);
            Arc::new(HttpBudgetService::new(url.clone()))
        }
        None => {
            info!("No budget service configured; quota is unlimited");
            Arc::new(UnlimitedBudget)
        }
    };

    let audit = AuditLog::new(db_pool.clone());
    let glossary = Arc::new(EmptyGlossary);
    let rule_config = Arc::new(EmptyRuleConfig);

    let rule_pass = RulePassRunner::new(
        FileRepository::new(db_pool.clone()),
        SegmentRepository::new(db_pool.clone()),
        FindingRepository::new(db_pool.clone()),
        audit.clone(),
        Arc::new(BuiltinRuleEngine),
        glossary.clone(),
        rule_config,
        event_bus.clone(),
    );
    let screening = AiPassRunner::new(
        Layer::L2,
        FileRepository::new(db_pool.clone()),
        SegmentRepository::new(db_pool.clone()),
        FindingRepository::new(db_pool.clone()),
        audit.clone(),
        screening_generator,
        budget.clone(),
        limiter.clone(),
        event_bus.clone(),
        config.chunk_char_budget,
    );
    let deep_analysis = AiPassRunner::new(
        Layer::L3,
        FileRepository::new(db_pool.clone()),
        SegmentRepository::new(db_pool.clone()),
        FindingRepository::new(db_pool.clone()),
        audit.clone(),
        deep_generator,
        budget,
        limiter,
        event_bus.clone(),
        config.chunk_char_budget,
    );
    let consistency = ConsistencyPass::new(
        SegmentRepository::new(db_pool.clone()),
        FindingRepository::new(db_pool.clone()),
        glossary,
        audit.clone(),
    );
    let scorer = ScoreOrchestrator::new(
        FileRepository::new(db_pool.clone()),
        SegmentRepository::new(db_pool.clone()),
        FindingRepository::new(db_pool.clone()),
        ScoreRepository::new(db_pool.clone()),
        ScoringConfigRepository::new(db_pool.clone()),
        audit,
        Arc::new(EventBusNotifier::new(event_bus.clone())),
        event_bus.clone(),
    );

    let workflow = Arc::new(PipelineWorkflow::new(
        FileRepository::new(db_pool.clone()),
        RunJournal::new(db_pool.clone()),
        rule_pass,
        screening,
        deep_analysis,
        consistency,
        scorer,
        event_bus.clone(),
    ));

    let state = AppState::new(db_pool, event_bus, workflow);
    let app = tqa_pipeline::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
