mod browser;
mod config;
mod error;
mod extract;
mod models;
mod navigation;
mod normalize;
mod orchestrator;
mod retry;
mod routes;
mod sanitize;
mod sources;

use std::process::ExitCode;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Command, Config};
use crate::orchestrator::Orchestrator;
use crate::sources::SourceRegistry;

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jobsearch=info,tower_http=info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::parse();
    init_tracing(config.log_json);

    let driver = browser::default_driver(config.launch_options());
    let registry = SourceRegistry::standard(config.retrieval_settings(), driver);
    let orchestrator = Orchestrator::new(registry);

    match config.resolved_command() {
        Command::Serve { listen_addr } => {
            let app = Router::new()
                .route("/healthz", get(healthz))
                .merge(routes::api::router(orchestrator))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
            tracing::info!("Listening on {listen_addr}");
            axum::serve(listener, app).await?;
        }
        command @ Command::Search { .. } => {
            let as_text = matches!(command, Command::Search { text: true, .. });
            let params = command
                .search_params()
                .ok_or_else(|| anyhow::anyhow!("search parameters missing"))?;
            let outcome = orchestrator.search_params(params).await;
            if as_text {
                println!("{}", outcome.to_text());
            } else {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }

            // "No results" is an answer, not a failure.
            if let Some(record) = outcome.error_record()
                && !outcome.is_no_results()
            {
                tracing::warn!("Search failed: {:?}", record.kind);
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
