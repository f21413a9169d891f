//! Governance Orchestrator
//!
//! Autonomous governance core: six role directors decide on environmental
//! events, a three-tier oversight hierarchy watches the system, and a
//! versioned workspace context feeds insights back in as new events.
//!
//! This binary is the composition root. It wires one orchestrator and one
//! context manager together and serves a small HTTP control surface.

mod config;
mod context;
mod directors;
mod error;
mod events;
mod ingestion;
mod insights;
mod metrics;
mod models;
mod orchestrator;
mod oversight;
mod persistence;
mod routes;
mod state;

use crate::config::Settings;
use crate::context::{workspace_sources, ContextManager};
use crate::ingestion::WorkspaceIngestion;
use crate::insights::{InsightGenerator, InsightLedger, InsightLoop, RuleBasedInsights};
use crate::orchestrator::GovernanceOrchestrator;
use crate::persistence::{DecisionStore, MemoryStore, PostgresStore};
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("🚀 Starting Governance Orchestrator...");

    let settings = Settings::load()?;
    info!("📋 Configuration loaded (workspace {})", settings.workspace.root.display());

    let store = init_store(&settings).await;

    let mut orchestrator = GovernanceOrchestrator::new(&settings, store);
    if settings.orchestrator.enable_workspace_integration {
        let polling = WorkspaceIngestion::new(
            Arc::clone(orchestrator.collector()),
            Duration::from_secs(settings.workspace.poll_interval_secs),
        );
        orchestrator = orchestrator.with_ingestion(Arc::new(polling));
    }
    let orchestrator = Arc::new(orchestrator);

    let ledger = Arc::new(InsightLedger::new());
    let mut sources = workspace_sources(&settings.workspace.root);
    sources.push(ledger.source());
    let context = Arc::new(ContextManager::open(&settings.context, sources).await);

    if settings.orchestrator.autostart {
        orchestrator.start().await;
    } else {
        info!("⏸️  Autostart disabled; POST /api/orchestrator/start to begin");
    }

    let rules = Arc::new(RuleBasedInsights::new());
    let insight_loop = Arc::new(InsightLoop::new(
        Arc::clone(&rules) as Arc<dyn InsightGenerator>,
        Arc::clone(&ledger),
        Arc::clone(&context),
        Arc::clone(&orchestrator),
    ));
    let insight_task = insight_loop.spawn(Duration::from_secs(settings.context.insight_interval_secs));

    let state = Arc::new(AppState::new(Arc::clone(&orchestrator), context, ledger, rules));
    let app = create_router(state, &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Orchestrator ───");
    info!("   POST  /api/orchestrator/start   - Start timers and ingestion");
    info!("   POST  /api/orchestrator/stop    - Stop timers and ingestion");
    info!("   POST  /api/orchestrator/drain   - Dispatch queued events now");
    info!("   POST  /api/events               - Inject an environmental event");
    info!("   GET   /api/metrics              - Orchestrator counters");
    info!("   GET   /api/metrics/history      - Performance samples");
    info!("   GET   /api/state                - Current system state");
    info!("   PATCH /api/state                - Overlay domain blocks");
    info!("   GET   /api/directors            - Director status");
    info!("   PATCH /api/directors/{{role}}     - Activate or deactivate");
    info!("   GET   /api/directors/{{role}}/oversight - Domain oversight");
    info!("");
    info!("   ─── Oversight & Context ───");
    info!("   GET   /api/oversight            - Layer status");
    info!("   GET   /api/oversight/alerts     - Open tactical alerts");
    info!("   GET   /api/context              - Current context");
    info!("   POST  /api/context/refresh      - Refresh (?force=true)");
    info!("   GET   /api/insights             - Latest recommendations");
    info!("   GET   /api/insights/rules       - Insight heuristics");
    info!("");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    insight_task.abort();
    orchestrator.stop().await;
    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging (`LOG_FORMAT=json` for JSON lines)
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,governance_orchestrator=debug,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}

/// PostgreSQL when configured and reachable, otherwise in-memory
async fn init_store(settings: &Settings) -> Arc<dyn DecisionStore> {
    if settings.database.url.is_none() {
        info!("💾 No database configured; decisions kept in memory");
        return Arc::new(MemoryStore::new());
    }

    match PostgresStore::connect(&settings.database).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("⚠️  Decision store unavailable ({}); falling back to memory", e);
            Arc::new(MemoryStore::new())
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
