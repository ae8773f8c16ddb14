use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quiz_backend::{
    config::{get_config, init_config},
    database::{
        memory_store::MemoryQuizStore,
        pg_store::PgQuizStore,
        pool::{create_pool, run_migrations},
        store::QuizStore,
    },
    routes,
    services::{
        ai_service::{AIService, ProviderCredentials},
        cache_service::MemoryQuizCache,
    },
    AppState,
};
use reqwest::Client;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quiz_backend=info,tower_http=info"));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let store: Arc<dyn QuizStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, Duration::from_secs(config.store_timeout_secs)).await?;
            run_migrations(&pool).await?;
            info!("Connected to PostgreSQL and applied migrations");
            Arc::new(PgQuizStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set, quizzes are kept in memory and lost on restart");
            Arc::new(MemoryQuizStore::new())
        }
    };

    let http_client = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    let provider = AIService::new(
        ProviderCredentials {
            openai_api_key: config.openai_api_key.clone(),
            anthropic_api_key: config.anthropic_api_key.clone(),
            gemini_api_key: config.gemini_api_key.clone(),
        },
        http_client,
        Duration::from_secs(config.provider_timeout_secs),
    );

    let app_state = AppState::new(
        store,
        Arc::new(MemoryQuizCache::new()),
        Arc::new(provider),
        config.quiz_settings(),
        &config.jwt_secret,
    )
    .with_limits(
        config.public_rps,
        Duration::from_secs(config.request_timeout_secs),
    );

    let app = routes::router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
