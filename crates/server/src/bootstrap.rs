use ordermate_agent::build_llm_client;
use ordermate_core::config::{AppConfig, ConfigError};
use ordermate_core::errors::ApplicationError;
use ordermate_core::ordering::catalog::MenuCatalog;
use ordermate_db::{open_order_repository, RepositoryError};
use thiserror::Error;
use tracing::info;

use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("order store initialization failed: {0}")]
    Storage(#[from] RepositoryError),
    #[error("language model client initialization failed: {0}")]
    Llm(#[source] ApplicationError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        storage_backend = ?config.storage.backend,
        llm_provider = ?config.llm.provider,
        "starting application bootstrap"
    );

    let repository = open_order_repository(&config).await?;
    let llm = build_llm_client(&config.llm).map_err(BootstrapError::Llm)?;
    let catalog = MenuCatalog::seeded();
    info!(
        event_name = "system.bootstrap.menu_seeded",
        correlation_id = "bootstrap",
        menu_items = catalog.len(),
        "menu catalog seeded"
    );

    let state = AppState::new(catalog, repository, llm);
    Ok(Application { config, state })
}

#[cfg(test)]
mod tests {
    use ordermate_core::config::{
        AppConfig, ConfigOverrides, LlmProvider, LoadOptions, StorageBackend,
    };
    use ordermate_core::domain::order::OrderLine;

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    fn options(overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions {
            config_path: Some("/nonexistent/ordermate.toml".into()),
            require_file: false,
            overrides,
        }
    }

    #[tokio::test]
    async fn bootstrap_with_sqlite_store_serves_orders() {
        let dir = tempfile::tempdir().expect("tempdir");
        let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("orders.db").display());
        let app = bootstrap(options(ConfigOverrides {
            storage_backend: Some(StorageBackend::Sqlite),
            database_url: Some(database_url),
            llm_provider: Some(LlmProvider::Local),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("bootstrap should succeed");

        let order = app
            .state
            .orchestrator
            .place_order(&[OrderLine::new("5", 2)], "Alex")
            .await
            .expect("order placed");
        assert_eq!(order.total.to_string(), "13.98");
        assert_eq!(app.state.orchestrator.list_orders().await.expect("list").len(), 1);
        app.state.repository.ping().await.expect("store reachable");
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_model_credentials() {
        let result = bootstrap(options(ConfigOverrides {
            llm_provider: Some(LlmProvider::OpenAi),
            ..ConfigOverrides::default()
        }))
        .await;

        let Err(error) = result else { panic!("bootstrap should fail") };
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("llm.api_key"), "{error}");
    }
}
