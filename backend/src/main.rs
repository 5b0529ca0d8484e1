use axum::{
    Router,
    http::Method,
    routing::get,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ruleflow_backend::workflows::store::{
    AuditSink, DefinitionStore, InMemoryAuditSink, InMemoryDefinitionStore, PgAuditSink,
    PgDefinitionStore,
};
use ruleflow_backend::workflows::{RecordingGateway, WorkflowEngine, builtin_registry};
use ruleflow_backend::{AppState, config, database, handlers, jobs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;

    let gateway = Arc::new(RecordingGateway::new());
    let registry = Arc::new(builtin_registry(
        gateway.clone(),
        gateway,
        reqwest::Client::new(),
    ));

    let (store, audit, db_pool): (Arc<dyn DefinitionStore>, Arc<dyn AuditSink>, _) =
        match &config.database_url {
            Some(url) => {
                let pool = database::create_pool(url).await?;
                database::migrate(&pool).await?;
                (
                    Arc::new(PgDefinitionStore::new(pool.clone())) as Arc<dyn DefinitionStore>,
                    Arc::new(PgAuditSink::new(pool.clone())) as Arc<dyn AuditSink>,
                    Some(pool),
                )
            }
            None => {
                let store = match &config.definitions_path {
                    Some(path) => InMemoryDefinitionStore::from_json_file(path, &registry).await?,
                    None => InMemoryDefinitionStore::new(),
                };
                tracing::warn!("DATABASE_URL not set, using in-memory store and audit sink");
                (
                    Arc::new(store) as Arc<dyn DefinitionStore>,
                    Arc::new(InMemoryAuditSink::new()) as Arc<dyn AuditSink>,
                    None,
                )
            }
        };

    let engine = Arc::new(WorkflowEngine::new(
        store,
        audit,
        registry,
        config.engine_config(),
    ));

    let mut scheduler = jobs::TriggerScheduler::new(engine.clone()).await?;
    scheduler.start(&config.scheduled_triggers).await?;

    let app_state = Arc::new(AppState { engine, db_pool });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(|| async { "ruleflow automation engine" }))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", handlers::automation_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    scheduler.shutdown().await?;
    Ok(())
}
