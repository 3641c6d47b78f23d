//! Scorestream Back binary entrypoint wiring REST, WebSocket, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod providers;
mod routes;
mod scoring;
mod services;
mod state;

use config::AppConfig;
use providers::{JudgeProvider, RosterProvider, StaticRoster};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let (roster, judges) = build_providers(&config);

    let app_state = AppState::new(config, roster, judges);

    spawn_storage_supervisor(app_state.clone());

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Resolve the roster and judge providers from configuration.
///
/// With the `http-roster` feature and a configured base URL the external
/// registration service is consumed over HTTP; otherwise an empty static
/// roster keeps the scoring core runnable in isolation.
fn build_providers(config: &AppConfig) -> (Arc<dyn RosterProvider>, Arc<dyn JudgeProvider>) {
    #[cfg(feature = "http-roster")]
    if let Some(base_url) = config.roster_base_url() {
        let client = Arc::new(providers::http::RosterClient::new(base_url.to_owned()));
        return (client.clone(), client);
    }

    tracing::warn!("no roster service configured; using an empty static roster");
    let fallback = Arc::new(StaticRoster::default());
    (fallback.clone(), fallback)
}

/// Install the persistence backend in the background so a slow or absent
/// database never blocks startup; the state stays degraded until then.
fn spawn_storage_supervisor(state: SharedState) {
    #[cfg(feature = "mongo-store")]
    {
        let uri =
            env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
        let db_name = env::var("MONGO_DB").ok();
        tokio::spawn(services::storage_supervisor::run(state, move || {
            let uri = uri.clone();
            let db_name = db_name.clone();
            async move {
                dao::score_store::mongodb::connect_store(&uri, db_name.as_deref()).await
            }
        }));
    }

    #[cfg(not(feature = "mongo-store"))]
    {
        use dao::score_store::memory::MemoryScoreStore;
        tokio::spawn(async move {
            state
                .install_score_store(Arc::new(MemoryScoreStore::new()))
                .await;
            info!("in-memory score store installed");
        });
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
