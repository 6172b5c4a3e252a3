use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use diocese_api::app::{create_app, AppState};
use diocese_api::config::Config;
use diocese_api::middleware;
use diocese_api::services::llm::{DisabledSqlGenerator, OpenAiSqlGenerator, SqlGenerator};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics()?;

    info!("Starting Diocese Manager v{}", env!("CARGO_PKG_VERSION"));

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let sql_generator: Arc<dyn SqlGenerator> = if config.llm.enabled {
        info!(model = %config.llm.model, "SQL assistant enabled");
        Arc::new(OpenAiSqlGenerator::new(config.llm.clone())?)
    } else {
        info!("SQL assistant disabled");
        Arc::new(DisabledSqlGenerator)
    };

    let addr = config.socket_addr()?;
    let state = AppState::new(config, pool, sql_generator)?;
    if state.provider_jwt.is_none() {
        info!("Auth provider sessions disabled; only database sessions are accepted");
    }
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
