//! Orchestrator server binary: the concept-to-animation job pipeline
//! HTTP entry point.
//!
//! Exit codes: 0 clean shutdown, 1 startup failure, 2 no renderer
//! available in this environment.

use clap::Parser;
use orchestrator::api::{create_router, AppState};
use orchestrator::events::EventBus;
use orchestrator::job::JobStore;
use orchestrator::pipeline::register_pipeline;
use orchestrator::providers::{build_providers, fallback_chain_order, FallbackChain, ProviderAdapter, Router};
use orchestrator::renderer::{EnvironmentProbe, RenderDispatcher};
use orchestrator::session::SessionTable;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "orchestrator-server", about = "Concept-to-animation job pipeline server")]
struct Cli {
    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    media_dir: Option<PathBuf>,

    #[arg(long)]
    temp_dir: Option<PathBuf>,

    #[arg(long)]
    renderer_preference: Option<String>,
}

#[tokio::main]
async fn main() {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    if let Err(e) = run().await {
        tracing::error!("startup failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = orchestrator::config::ServerConfig::load()?;
    config.apply_env_overrides();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref media_dir) = cli.media_dir {
        config.paths.media_dir = media_dir.clone();
    }
    if let Some(ref temp_dir) = cli.temp_dir {
        config.paths.temp_dir = temp_dir.clone();
    }
    if let Some(ref preference) = cli.renderer_preference {
        config.paths.renderer_preference = Some(preference.clone());
    }

    let probe = EnvironmentProbe::get();
    if !probe.has_standard && !probe.has_gl {
        tracing::error!("no renderer available in this environment (neither manim nor manimgl found)");
        std::process::exit(2);
    }

    tokio::fs::create_dir_all(&config.paths.media_dir).await?;
    tokio::fs::create_dir_all(&config.paths.temp_dir).await?;

    let event_bus = EventBus::new();
    let job_store = JobStore::new();
    job_store.spawn_sweeper();

    let providers = build_providers(&config);
    let router = Arc::new(Router::new(providers.clone()));

    let order = fallback_chain_order();
    let mut by_name: std::collections::HashMap<_, _> =
        providers.iter().map(|p| (p.name(), Arc::clone(p))).collect();
    let ordered_chain: Vec<_> = order.into_iter().filter_map(|name| by_name.remove(&name)).collect();
    let fallback_chain = Arc::new(FallbackChain::new(ordered_chain));

    let sessions = SessionTable::new();

    let state = AppState::new(
        Arc::clone(&event_bus),
        Arc::clone(&job_store),
        Arc::clone(&router),
        Arc::clone(&fallback_chain),
        sessions,
        config.paths.media_dir.clone(),
        config.paths.temp_dir.clone(),
    );

    register_pipeline(&event_bus, &router, &fallback_chain).await?;

    event_bus.register_publisher(orchestrator::events::Topic::VideoRendered)?;
    event_bus.register_publisher(orchestrator::events::Topic::VideoFailed)?;
    let preferred_renderer = config.paths.renderer_preference.as_deref().and_then(|p| match p.to_lowercase().as_str() {
        "standard" => Some(orchestrator::renderer::RendererKind::Standard),
        "gl" => Some(orchestrator::renderer::RendererKind::GL),
        _ => None,
    });
    event_bus
        .subscribe(
            orchestrator::events::Topic::CodeGenerated,
            Arc::new(
                RenderDispatcher::new(Arc::clone(&event_bus), config.paths.media_dir.clone(), config.paths.temp_dir.clone())
                    .with_preferred_renderer(preferred_renderer),
            ),
        )
        .await;
    event_bus
        .subscribe(orchestrator::events::Topic::VideoRendered, Arc::clone(&state) as Arc<dyn orchestrator::events::Handler>)
        .await;
    event_bus
        .subscribe(orchestrator::events::Topic::VideoFailed, Arc::clone(&state) as Arc<dyn orchestrator::events::Handler>)
        .await;

    let app = create_router(Arc::clone(&state));

    let addr: SocketAddr = config.bind_addr().parse()?;
    tracing::info!("starting orchestrator server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
        .await?;

    tracing::info!("orchestrator server shut down gracefully");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM, then give every interactive session's
/// child process up to 5s to exit before the process itself terminates.
async fn shutdown_signal(state: orchestrator::api::SharedState) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }

    tracing::info!("stopping {} interactive session(s)", state.sessions.len());
    let session_ids: Vec<String> = state.sessions.ids();
    for id in session_ids {
        tokio::time::timeout(Duration::from_secs(5), state.sessions.remove_and_stop(&id))
            .await
            .ok();
    }
}
