mod config;
mod download;
mod error;
mod freepik;
mod ideogram;
mod models;
mod pipeline;
mod routes;
mod storage;
#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    config::Config,
    download::HttpFetcher,
    freepik::FreepikClient,
    ideogram::IdeogramClient,
    pipeline::Pipeline,
    routes::AppState,
    storage::S3Store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Arc::new(Config::from_env());
    match &config.api_key {
        Some(key) => tracing::info!("Using Ideogram API key: {}...", key.chars().take(6).collect::<String>()),
        None => tracing::warn!("API_KEY is not set; generation requests will fail"),
    }
    for (name, value) in [
        ("FREEPIK_API_KEY", &config.freepik_api_key),
        ("BUCKET_NAME", &config.bucket_name),
        ("FOLDER_NAME", &config.folder_name),
        ("BUCKET_REGION", &config.bucket_region),
    ] {
        if value.is_none() {
            tracing::warn!("{} is not set; requests that need it will fail", name);
        }
    }

    let http = reqwest::Client::new();
    let pipeline = Pipeline::new(
        Arc::new(IdeogramClient::new(http.clone(), config.clone())),
        Arc::new(FreepikClient::new(http.clone(), config.clone())),
        Arc::new(S3Store::new(config.clone())),
        Arc::new(HttpFetcher::new(http)),
    );
    let state = AppState { pipeline: Arc::new(pipeline) };

    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            ),
    );

    let port: u16 = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0,0,0,0], port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
