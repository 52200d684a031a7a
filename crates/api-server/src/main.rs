use std::net::SocketAddr;
use std::sync::Arc;

use shared::analysis::AnalysisOrchestrator;
use shared::chat::ChatOrchestrator;
use shared::config::ApiConfig;
use shared::llm::{
    OpenAiGateway, OpenAiGatewayConfig, OpenAiTranscriber, OpenAiTranscriberConfig,
};
use shared::repos::{SessionStore, Store};
use tracing::{error, info};

use api_server::http;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,shared=debug,axum=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let store = match Store::connect(&config.database_url, config.database_max_connections).await {
        Ok(store) => store,
        Err(err) => {
            error!("failed to connect to postgres: {err}");
            std::process::exit(1);
        }
    };

    let migrator = match sqlx::migrate::Migrator::new(config.migrations_dir.clone()).await {
        Ok(migrator) => migrator,
        Err(err) => {
            error!("failed to load migrations: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = migrator.run(store.pool()).await {
        error!("failed to run migrations: {err}");
        std::process::exit(1);
    }

    let gateway = match OpenAiGatewayConfig::from_env().and_then(OpenAiGateway::new) {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            error!("failed to configure llm gateway: {err}");
            std::process::exit(1);
        }
    };

    let transcriber = match OpenAiTranscriberConfig::from_env().and_then(OpenAiTranscriber::new) {
        Ok(transcriber) => Arc::new(transcriber),
        Err(err) => {
            error!("failed to configure transcriber: {err}");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn SessionStore> = Arc::new(store);

    let app = http::build_router(http::AppState {
        analysis: Arc::new(AnalysisOrchestrator::new(gateway.clone())),
        chat: Arc::new(ChatOrchestrator::new(gateway, store.clone())),
        transcriber,
        store,
        identity: http::IdentityConfig {
            issuer: config.clerk_issuer,
            audience: config.clerk_audience,
            jwks_url: config.clerk_jwks_url,
        },
        http_client: reqwest::Client::new(),
    });

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:8080".parse().expect("valid default bind addr"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind should succeed");

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    axum::serve(listener, app).await.expect("server should run");
}
