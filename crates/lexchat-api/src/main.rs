use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lexchat_api::{
    build_router,
    config::{Config, StorageBackend},
    prompts::LEGAL_ASSISTANT_PROMPT,
    state::AppState,
};
use lexchat_llm::{ChatClient, CompletionClient, RelayClient};
use lexchat_persist::{InMemoryPersistenceClient, PersistenceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting lexchat API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let store = connect_store(&config).await?;
    tracing::info!(backend = store.backend_name(), "Storage ready");

    let mut completion = CompletionClient::new(&config.completion.endpoint, &config.completion_api_key)?;
    if let Some(model) = &config.completion.model {
        completion = completion.with_model(model);
    }
    tracing::info!(endpoint = completion.endpoint(), "Completion client ready");
    let chat_client: Arc<dyn ChatClient> = Arc::new(completion);

    let relay = if config.relay.enabled {
        tracing::info!(upstream = %config.relay.upstream_url, model = %config.relay.model, "Chat relay enabled");
        Some(RelayClient::new(
            &config.relay.upstream_url,
            &config.upstream_api_key,
            &config.relay.model,
            LEGAL_ASSISTANT_PROMPT,
        )?)
    } else {
        None
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store, chat_client, relay));
    let _sweeper = state.spawn_session_sweeper();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn PersistenceClient>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Ok(Arc::new(InMemoryPersistenceClient::new()))
        }
        #[cfg(feature = "mongodb")]
        StorageBackend::Mongodb => {
            tracing::info!("Connecting to MongoDB");
            let client = lexchat_persist::MongoPersistenceClient::connect(
                &config.mongodb_uri,
                &config.storage.database,
            )
            .await?;
            Ok(Arc::new(client))
        }
        #[cfg(not(feature = "mongodb"))]
        StorageBackend::Mongodb => {
            anyhow::bail!("storage.backend = \"mongodb\" requires building with the `mongodb` feature")
        }
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}
