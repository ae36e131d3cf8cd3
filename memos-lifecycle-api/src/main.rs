use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use memos_lifecycle::hooks::{PLUGIN_ID, PLUGIN_NAME};
use memos_lifecycle::{CaptureThrottle, MemosClient, MemosLifecycle};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod core;
mod middleware;

use crate::api::{hooks::HookState, stats::StatsState};
use crate::core::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let settings = Settings::new()?;
    init_tracing(settings.logging.json);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    info!("Starting {} ({}) on {}", PLUGIN_NAME, PLUGIN_ID, addr);

    let client = Arc::new(MemosClient::new(settings.memos_config())?);
    let throttle = Arc::new(CaptureThrottle::new(settings.throttle_window()));
    let plugin = MemosLifecycle::builder(client.clone())
        .throttle(throttle.clone())
        .build();

    let hooks = HookState {
        hook: Arc::new(plugin),
    };
    let stats = StatsState {
        client: client.clone(),
        throttle,
    };
    let app = create_app(hooks, stats);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining pending memory writes");
    if !client.shutdown(settings.shutdown_grace()).await {
        warn!("Some memory writes were abandoned at shutdown");
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

fn create_app(hooks: HookState, stats: StatsState) -> Router {
    use crate::middleware::{error_handler, request_id};
    use axum::middleware;

    let hook_routes = Router::new()
        .route("/hooks/session-start", post(api::hooks::session_start))
        .route("/hooks/bootstrap", post(api::hooks::bootstrap))
        .route("/hooks/session-end", post(api::hooks::session_end))
        .route("/hooks/tool-result", post(api::hooks::tool_result))
        .with_state(hooks);

    let stats_routes = Router::new()
        .route("/stats", get(api::stats::get_stats))
        .with_state(stats);

    Router::new()
        .route("/health", get(health_check))
        .merge(hook_routes)
        .merge(stats_routes)
        .layer(middleware::from_fn(request_id::add_request_id))
        .layer(middleware::from_fn(error_handler::handle_errors))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
