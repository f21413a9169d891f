//! Governance orchestrator
//!
//! Composition root for the decision pipeline. Two lifecycle states, stopped
//! and running. Starting seeds the system state, subscribes ingestion
//! sources and spawns two timers:
//!
//! - metrics report: collect state, publish it, persist a performance sample
//! - event drain: take one or all queued events and dispatch each in order
//!
//! Both `start` and `stop` are idempotent.

use crate::config::{OrchestratorConfig, Settings};
use crate::directors::{DirectorRegistry, DirectorStatus, OversightResult};
use crate::error::{not_found_error, AppError};
use crate::events::{DispatchReport, EventProcessor, EventQueue, GovernanceBus, StateChannel};
use crate::ingestion::{IngestionSink, IngestionSource, Subscription};
use crate::metrics::MetricsCollector;
use crate::models::{DirectorRole, EnvironmentalEvent, SystemState, SystemStateUpdate};
use crate::oversight::OversightHierarchy;
use crate::persistence::{DecisionStore, PerformanceMetrics};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a lifecycle call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Started,
    AlreadyRunning,
    Stopped,
    AlreadyStopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorMetrics {
    pub running: bool,
    pub events_received: u64,
    pub events_processed: u64,
    pub decisions_made: u64,
    pub decisions_rejected: u64,
    pub director_errors: u64,
    pub queue_depth: usize,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_drain_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Counters {
    events_received: AtomicU64,
    events_processed: AtomicU64,
    decisions_made: AtomicU64,
    decisions_rejected: AtomicU64,
    director_errors: AtomicU64,
}

struct Runtime {
    timers: Vec<JoinHandle<()>>,
    subscriptions: Vec<Subscription>,
    started_at: Instant,
}

impl Runtime {
    fn shutdown(mut self) {
        for handle in self.timers.drain(..) {
            handle.abort();
        }
        for subscription in &mut self.subscriptions {
            subscription.disconnect();
        }
    }
}

pub struct GovernanceOrchestrator {
    config: OrchestratorConfig,
    collector: Arc<MetricsCollector>,
    state: StateChannel,
    bus: Arc<GovernanceBus>,
    queue: EventQueue,
    processor: EventProcessor,
    oversight: OversightHierarchy,
    ingestion: Vec<Arc<dyn IngestionSource>>,
    /// Serializes start and stop
    lifecycle: tokio::sync::Mutex<()>,
    runtime: Mutex<Option<Runtime>>,
    counters: Counters,
    last_drain_at: RwLock<Option<DateTime<Utc>>>,
}

impl GovernanceOrchestrator {
    pub fn new(settings: &Settings, store: Arc<dyn DecisionStore>) -> Self {
        let initial = SystemState::fallback();
        let bus = Arc::new(GovernanceBus::new());
        let registry = Arc::new(DirectorRegistry::standard());

        Self {
            config: settings.orchestrator.clone(),
            collector: Arc::new(MetricsCollector::new(&settings.workspace.root)),
            oversight: OversightHierarchy::new(settings.oversight.clone(), &initial),
            state: StateChannel::new(initial),
            processor: EventProcessor::new(registry, store, Arc::clone(&bus)),
            bus,
            queue: EventQueue::new(),
            ingestion: Vec::new(),
            lifecycle: tokio::sync::Mutex::new(()),
            runtime: Mutex::new(None),
            counters: Counters::default(),
            last_drain_at: RwLock::new(None),
        }
    }

    /// Registers an ingestion source to subscribe on every start
    pub fn with_ingestion(mut self, source: Arc<dyn IngestionSource>) -> Self {
        self.ingestion.push(source);
        self
    }

    pub fn collector(&self) -> &Arc<MetricsCollector> {
        &self.collector
    }

    pub fn bus(&self) -> &Arc<GovernanceBus> {
        &self.bus
    }

    pub fn store(&self) -> &Arc<dyn DecisionStore> {
        self.processor.store()
    }

    pub fn oversight(&self) -> &OversightHierarchy {
        &self.oversight
    }

    pub fn registry(&self) -> &Arc<DirectorRegistry> {
        self.processor.registry()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    pub async fn start(self: &Arc<Self>) -> Transition {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_running() {
            warn!("⚠️  Orchestrator already running; start ignored");
            return Transition::AlreadyRunning;
        }

        if self.config.enable_workspace_integration {
            self.state.publish(self.collector.collect().await);
        }
        self.oversight.refresh_all(&self.state.current());

        let mut subscriptions = Vec::with_capacity(self.ingestion.len());
        for source in &self.ingestion {
            let sink = Arc::new(WeakSink(Arc::downgrade(self))) as Arc<dyn IngestionSink>;
            match source.subscribe(sink).await {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => warn!("⚠️  Ingestion source '{}' failed to subscribe: {}", source.name(), e),
            }
        }

        let timers = vec![
            self.spawn_metrics_timer(self.config.metrics_interval()),
            self.spawn_drain_timer(self.config.event_interval()),
        ];
        self.oversight.start(self.state.subscribe());

        *self.runtime.lock().unwrap_or_else(|e| e.into_inner()) = Some(Runtime {
            timers,
            subscriptions,
            started_at: Instant::now(),
        });

        info!(
            "🚀 Orchestrator started (metrics every {}s, drain every {}s, {:?} mode, {} ingestion sources)",
            self.config.metrics_interval_secs,
            self.config.event_interval_secs,
            self.config.drain_mode,
            self.ingestion.len()
        );
        Transition::Started
    }

    pub async fn stop(&self) -> Transition {
        let _lifecycle = self.lifecycle.lock().await;
        let runtime = self.runtime.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(runtime) = runtime else {
            warn!("⚠️  Orchestrator not running; stop ignored");
            return Transition::AlreadyStopped;
        };

        runtime.shutdown();
        self.oversight.stop();
        info!("🛑 Orchestrator stopped");
        Transition::Stopped
    }

    pub fn is_running(&self) -> bool {
        self.runtime.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Orchestrator timers currently alive (oversight timers not included)
    pub fn timer_count(&self) -> usize {
        self.runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(0, |r| r.timers.len())
    }

    fn spawn_metrics_timer(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(this) = weak.upgrade() else { break };
                this.report_metrics().await;
            }
        })
    }

    fn spawn_drain_timer(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(this) = weak.upgrade() else { break };
                this.drain_now().await;
            }
        })
    }

    // =========================================================================
    // PIPELINE
    // =========================================================================

    /// Queues an event for the next drain. Returns the queue depth.
    pub async fn inject_event(&self, event: EnvironmentalEvent) -> usize {
        self.counters.events_received.fetch_add(1, Ordering::Relaxed);
        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            severity = %event.severity,
            "Event queued"
        );
        self.bus.publish_event(event.clone());
        self.queue.push(event).await
    }

    /// Dispatches one or all queued events, oldest first
    pub async fn drain_now(&self) -> Vec<DispatchReport> {
        let events = self.queue.drain(self.config.drain_mode).await;
        let mut reports = Vec::with_capacity(events.len());

        for event in events {
            let state = self.state.current();
            let report = self.processor.dispatch(state, event.clone()).await;
            let oversight = self.oversight.process_event(&event);

            self.counters.events_processed.fetch_add(1, Ordering::Relaxed);
            self.counters
                .decisions_made
                .fetch_add(report.decisions.len() as u64, Ordering::Relaxed);
            self.counters
                .decisions_rejected
                .fetch_add(report.rejected() as u64, Ordering::Relaxed);
            self.counters
                .director_errors
                .fetch_add(report.errors.len() as u64, Ordering::Relaxed);

            info!(
                event_id = %event.id,
                decisions = report.decisions.len(),
                rejected = report.rejected(),
                errors = report.errors.len(),
                escalated = oversight.escalated,
                "⚖️  Event processed"
            );
            reports.push(report);
        }

        if !reports.is_empty() {
            *self.last_drain_at.write().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
        }
        reports
    }

    /// Collects (when enabled) and publishes state, then persists a sample
    pub async fn report_metrics(&self) -> PerformanceMetrics {
        if self.config.enable_workspace_integration {
            self.state.publish(self.collector.collect().await);
        }
        let state = self.state.current();

        let sample = PerformanceMetrics {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            health_score: state.health_score(),
            confidence: state.confidence,
            domain_scores: state.domain_scores(),
            events_processed: self.counters.events_processed.load(Ordering::Relaxed),
            decisions_made: self.counters.decisions_made.load(Ordering::Relaxed),
            queue_depth: self.queue.len().await,
        };

        info!(
            "📊 health {:.2} | confidence {:.2} | events {} | decisions {} | queued {}",
            sample.health_score,
            sample.confidence,
            sample.events_processed,
            sample.decisions_made,
            sample.queue_depth
        );

        if let Err(e) = self.store().save_performance_metrics(&sample).await {
            warn!("⚠️  Failed to persist performance metrics: {}", e);
        }
        sample
    }

    // =========================================================================
    // QUERIES & CONTROL
    // =========================================================================

    pub fn get_state(&self) -> Arc<SystemState> {
        self.state.current()
    }

    pub fn update_system_state(&self, update: &SystemStateUpdate) -> Arc<SystemState> {
        let state = self.state.apply(update);
        debug!("System state updated, health {:.2}", state.health_score());
        state
    }

    pub async fn get_metrics(&self) -> OrchestratorMetrics {
        let uptime_secs = self
            .runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(0, |r| r.started_at.elapsed().as_secs());

        OrchestratorMetrics {
            running: self.is_running(),
            events_received: self.counters.events_received.load(Ordering::Relaxed),
            events_processed: self.counters.events_processed.load(Ordering::Relaxed),
            decisions_made: self.counters.decisions_made.load(Ordering::Relaxed),
            decisions_rejected: self.counters.decisions_rejected.load(Ordering::Relaxed),
            director_errors: self.counters.director_errors.load(Ordering::Relaxed),
            queue_depth: self.queue.len().await,
            uptime_secs,
            last_drain_at: *self.last_drain_at.read().unwrap_or_else(|e| e.into_inner()),
        }
    }

    pub fn director_status(&self) -> Vec<DirectorStatus> {
        self.registry().status()
    }

    pub fn set_director_active(&self, role: DirectorRole, active: bool) -> Result<DirectorStatus, AppError> {
        let director = self
            .registry()
            .get(role)
            .ok_or_else(|| not_found_error(format!("No {} director registered", role)))?;
        if active {
            director.activate();
        } else {
            director.deactivate();
        }
        Ok(director.status())
    }

    /// Domain review by one director against the current state
    pub fn director_oversight(&self, role: DirectorRole) -> Result<OversightResult, AppError> {
        let director = self
            .registry()
            .get(role)
            .ok_or_else(|| not_found_error(format!("No {} director registered", role)))?;
        Ok(director.execute_oversight(&self.get_state()))
    }

    pub async fn performance_history(&self, limit: usize) -> Result<Vec<PerformanceMetrics>, AppError> {
        self.store().get_performance_history(limit).await
    }
}

#[async_trait]
impl IngestionSink for GovernanceOrchestrator {
    async fn on_event(&self, event: EnvironmentalEvent) {
        self.inject_event(event).await;
    }

    async fn on_state_update(&self, update: SystemStateUpdate) {
        self.update_system_state(&update);
    }
}

/// Sink handed to ingestion tasks; it must not keep the orchestrator alive
struct WeakSink(Weak<GovernanceOrchestrator>);

#[async_trait]
impl IngestionSink for WeakSink {
    async fn on_event(&self, event: EnvironmentalEvent) {
        if let Some(orchestrator) = self.0.upgrade() {
            orchestrator.on_event(event).await;
        }
    }

    async fn on_state_update(&self, update: SystemStateUpdate) {
        if let Some(orchestrator) = self.0.upgrade() {
            orchestrator.on_state_update(update).await;
        }
    }
}

/// Timers and ingestion tasks only hold weak references, so dropping the last
/// handle while running still tears the runtime down.
impl Drop for GovernanceOrchestrator {
    fn drop(&mut self) {
        let runtime = self.runtime.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(runtime) = runtime {
            runtime.shutdown();
            self.oversight.stop();
            debug!("Orchestrator dropped while running; runtime shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DrainMode;
    use crate::ingestion::ChannelIngestion;
    use crate::models::{EventSource, EventType, SecurityMetrics, Severity};
    use crate::persistence::MemoryStore;
    use pretty_assertions::assert_eq;

    fn settings(dir: &tempfile::TempDir, drain_mode: DrainMode) -> Settings {
        let mut settings = Settings::default();
        settings.workspace.root = dir.path().to_path_buf();
        settings.orchestrator.drain_mode = drain_mode;
        settings.orchestrator.enable_workspace_integration = false;
        settings
    }

    fn event(description: &str, severity: Severity) -> EnvironmentalEvent {
        EnvironmentalEvent::new(EventType::ResourceConstraint, severity, EventSource::Manual, description)
    }

    #[tokio::test]
    async fn test_double_start_keeps_two_timers() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Arc::new(GovernanceOrchestrator::new(
            &settings(&dir, DrainMode::One),
            Arc::new(MemoryStore::new()),
        ));

        assert_eq!(orchestrator.start().await, Transition::Started);
        assert_eq!(orchestrator.start().await, Transition::AlreadyRunning);
        assert_eq!(orchestrator.timer_count(), 2);
        assert_eq!(orchestrator.oversight().timer_count(), 3);

        assert_eq!(orchestrator.stop().await, Transition::Stopped);
        assert_eq!(orchestrator.stop().await, Transition::AlreadyStopped);
        assert_eq!(orchestrator.timer_count(), 0);
        assert!(!orchestrator.oversight().is_running());
    }

    #[tokio::test]
    async fn test_drain_all_preserves_ingestion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let orchestrator = GovernanceOrchestrator::new(&settings(&dir, DrainMode::All), store.clone());

        let events = [
            event("first", Severity::Low),
            event("second", Severity::Critical),
            event("third", Severity::Medium),
        ];
        for e in &events {
            orchestrator.inject_event(e.clone()).await;
        }

        let reports = orchestrator.drain_now().await;
        let order: Vec<_> = reports.iter().map(|r| r.event_id).collect();
        assert_eq!(order, events.iter().map(|e| e.id).collect::<Vec<_>>());
        assert!(reports.iter().all(|r| r.decisions.len() == 6));

        let metrics = orchestrator.get_metrics().await;
        assert_eq!(metrics.events_processed, 3);
        assert_eq!(metrics.decisions_made, 18);
        assert_eq!(metrics.queue_depth, 0);
        assert!(metrics.last_drain_at.is_some());
        assert_eq!(store.decision_count().await, 18);

        // The critical event reached the tactical alert queue
        assert_eq!(orchestrator.oversight().tactical().alert_count(), 1);
    }

    #[tokio::test]
    async fn test_drain_one_takes_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator =
            GovernanceOrchestrator::new(&settings(&dir, DrainMode::One), Arc::new(MemoryStore::new()));

        let first = event("first", Severity::Low);
        orchestrator.inject_event(first.clone()).await;
        orchestrator.inject_event(event("second", Severity::High)).await;

        let reports = orchestrator.drain_now().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].event_id, first.id);
        assert_eq!(orchestrator.get_metrics().await.queue_depth, 1);
    }

    #[tokio::test]
    async fn test_inactive_director_is_covered_or_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator =
            GovernanceOrchestrator::new(&settings(&dir, DrainMode::One), Arc::new(MemoryStore::new()));

        let status = orchestrator.set_director_active(DirectorRole::Legal, false).unwrap();
        assert!(!status.is_active);
        assert!(orchestrator.set_director_active(DirectorRole::Marketing, false).is_err());

        orchestrator.inject_event(event("audit", Severity::Medium)).await;
        let reports = orchestrator.drain_now().await;
        assert_eq!(reports[0].decisions.len(), 5);
    }

    #[tokio::test]
    async fn test_update_system_state_overlays_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator =
            GovernanceOrchestrator::new(&settings(&dir, DrainMode::One), Arc::new(MemoryStore::new()));
        let before = orchestrator.get_state();

        let security = SecurityMetrics {
            threat_level: 0.9,
            compliance_score: 0.4,
            vulnerability_count: 12.0,
            incident_rate: 0.3,
        };
        let after = orchestrator.update_system_state(&SystemStateUpdate {
            security: Some(security.clone()),
            ..Default::default()
        });

        assert_eq!(after.security, security);
        assert_eq!(after.financial, before.financial);
        assert_eq!(orchestrator.get_state().security, security);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_drain_and_report_on_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Arc::new(GovernanceOrchestrator::new(&settings(&dir, DrainMode::One), store.clone()));

        orchestrator.start().await;
        orchestrator.inject_event(event("runway", Severity::High)).await;

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(orchestrator.get_metrics().await.events_processed, 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(orchestrator.get_metrics().await.events_processed, 1);

        tokio::time::sleep(Duration::from_secs(55)).await;
        let history = store.get_performance_history(10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].events_processed, 1);

        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn test_ingestion_is_disconnected_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let channel = Arc::new(ChannelIngestion::default());
        let orchestrator = Arc::new(
            GovernanceOrchestrator::new(&settings(&dir, DrainMode::One), Arc::new(MemoryStore::new()))
                .with_ingestion(channel.clone()),
        );

        orchestrator.start().await;
        assert!(channel.publish_event(event("vendor price hike", Severity::Medium)));
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert_eq!(orchestrator.get_metrics().await.events_received, 1);

        orchestrator.stop().await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!channel.publish_event(event("ignored", Severity::Low)));
    }

    #[tokio::test]
    async fn test_dropping_running_orchestrator_releases_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let channel = Arc::new(ChannelIngestion::default());
        let orchestrator = Arc::new(
            GovernanceOrchestrator::new(&settings(&dir, DrainMode::One), Arc::new(MemoryStore::new()))
                .with_ingestion(channel.clone()),
        );
        orchestrator.start().await;
        assert_eq!(orchestrator.timer_count(), 2);

        let weak = Arc::downgrade(&orchestrator);
        drop(orchestrator);
        assert!(weak.upgrade().is_none());

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!channel.publish_event(event("after drop", Severity::Low)));
    }
}
