use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tracing::info;

use snoozy_agents::llm::LlmError;
use snoozy_agents::openai::OpenAiChatClient;
use snoozy_agents::SupportSystem;
use snoozy_core::config::{AppConfig, ConfigError, LoadOptions};
use snoozy_db::repositories::{SqlOrderRepository, SqlProductRepository, SqlReviewRepository};
use snoozy_db::{connect_with_settings, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub support: Arc<SupportSystem>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client construction failed: {0}")]
    LlmClient(#[source] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let api_key =
        config.llm.api_key.clone().unwrap_or_else(|| SecretString::from(String::new()));
    let client = OpenAiChatClient::new(
        api_key,
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )
    .map_err(BootstrapError::LlmClient)?;

    let support = Arc::new(SupportSystem::new(
        Arc::new(client),
        Arc::new(SqlProductRepository::new(db_pool.clone())),
        Arc::new(SqlReviewRepository::new(db_pool.clone())),
        Arc::new(SqlOrderRepository::new(db_pool.clone())),
        &config,
    ));
    info!(event_name = "system.bootstrap.support_ready", "support system constructed");

    Ok(Application { config, db_pool, support })
}
