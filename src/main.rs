//! Office queue backend entrypoint wiring REST, WebSocket, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use office_queue_back::{
    config::{AppConfig, Catalog},
    dao::{
        office_store::{MemoryOfficeStore, OfficeStore},
        storage::StorageError,
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::with_settings(config.state_settings());

    spawn_storage_supervisor(app_state.clone(), config.catalog().clone());
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

/// Start the background supervisor on MongoDB when `MONGO_URI` is set, in memory otherwise.
fn spawn_storage_supervisor(state: SharedState, catalog: Catalog) {
    let mongo_requested = env::var_os("MONGO_URI").is_some();

    #[cfg(feature = "mongo-store")]
    if mongo_requested {
        use office_queue_back::dao::office_store::mongodb::{MongoConfig, MongoOfficeStore};

        info!("using MongoDB storage backend");
        tokio::spawn(storage_supervisor::run(state, catalog, || async {
            let config = MongoConfig::from_env().await?;
            let store = MongoOfficeStore::connect(config).await?;
            Ok::<Arc<dyn OfficeStore>, StorageError>(Arc::new(store))
        }));
        return;
    }

    if mongo_requested {
        warn!("MONGO_URI is set but MongoDB support is not compiled in; using memory store");
    } else {
        info!("MONGO_URI not set; using in-memory storage backend");
    }

    let memory = MemoryOfficeStore::new();
    tokio::spawn(storage_supervisor::run(state, catalog, move || {
        let store = memory.clone();
        async move { Ok::<Arc<dyn OfficeStore>, StorageError>(Arc::new(store)) }
    }));
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
