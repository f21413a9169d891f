//! Ingestion sources
//!
//! External producers of events and state updates. A source is subscribed with
//! a sink when the orchestrator starts and disconnected when it stops.

use crate::error::AppError;
use crate::metrics::MetricsCollector;
use crate::models::{
    EnvironmentalEvent, EventSource, EventType, Severity, SystemStateUpdate, LIVE_CONFIDENCE,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Saturated memory band reported by the collector
const SATURATED_LOAD: f64 = 0.9;

/// Receiving side of a subscription
#[async_trait]
pub trait IngestionSink: Send + Sync {
    async fn on_event(&self, event: EnvironmentalEvent);

    async fn on_state_update(&self, update: SystemStateUpdate);
}

#[async_trait]
pub trait IngestionSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn subscribe(&self, sink: Arc<dyn IngestionSink>) -> Result<Subscription, AppError>;
}

/// Handle to a running subscription; dropping it disconnects
pub struct Subscription {
    source: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(source: &'static str, handle: JoinHandle<()>) -> Self {
        Self {
            source,
            handle: Some(handle),
        }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn is_connected(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn disconnect(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Disconnected ingestion source {}", self.source);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// =============================================================================
// CHANNEL SOURCE
// =============================================================================

#[derive(Debug, Clone)]
pub enum IngestionMessage {
    Event(EnvironmentalEvent),
    State(SystemStateUpdate),
}

/// In-process source fed through a broadcast channel
pub struct ChannelIngestion {
    sender: broadcast::Sender<IngestionMessage>,
}

impl ChannelIngestion {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns false when nothing is subscribed
    pub fn publish_event(&self, event: EnvironmentalEvent) -> bool {
        self.sender.send(IngestionMessage::Event(event)).is_ok()
    }

    pub fn publish_state(&self, update: SystemStateUpdate) -> bool {
        self.sender.send(IngestionMessage::State(update)).is_ok()
    }
}

impl Default for ChannelIngestion {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl IngestionSource for ChannelIngestion {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn subscribe(&self, sink: Arc<dyn IngestionSink>) -> Result<Subscription, AppError> {
        let mut rx = self.sender.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(IngestionMessage::Event(event)) => sink.on_event(event).await,
                    Ok(IngestionMessage::State(update)) => sink.on_state_update(update).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("⚠️  Ingestion channel lagged, {} messages dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(Subscription::new(self.name(), handle))
    }
}

// =============================================================================
// WORKSPACE POLLING SOURCE
// =============================================================================

/// Polls the metrics collector and raises events on threshold crossings
pub struct WorkspaceIngestion {
    collector: Arc<MetricsCollector>,
    every: Duration,
}

impl WorkspaceIngestion {
    pub fn new(collector: Arc<MetricsCollector>, every: Duration) -> Self {
        Self { collector, every }
    }
}

#[async_trait]
impl IngestionSource for WorkspaceIngestion {
    fn name(&self) -> &'static str {
        "workspace"
    }

    async fn subscribe(&self, sink: Arc<dyn IngestionSink>) -> Result<Subscription, AppError> {
        let collector = Arc::clone(&self.collector);
        let every = self.every;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            let mut saturated = false;
            let mut unavailable = false;

            loop {
                ticker.tick().await;
                let state = collector.collect().await;

                let now_saturated = state.reliability.system_load >= SATURATED_LOAD;
                if now_saturated && !saturated {
                    let event = EnvironmentalEvent::new(
                        EventType::PerformanceDegradation,
                        Severity::High,
                        EventSource::Workspace,
                        format!(
                            "System load saturated at {:.0}%",
                            state.reliability.system_load * 100.0
                        ),
                    );
                    sink.on_event(event).await;
                }
                saturated = now_saturated;

                let now_unavailable = state.confidence < LIVE_CONFIDENCE;
                if now_unavailable && !unavailable {
                    let event = EnvironmentalEvent::new(
                        EventType::OperationalFailure,
                        Severity::Medium,
                        EventSource::Workspace,
                        format!("Workspace {} unavailable", collector.workspace_root().display()),
                    );
                    sink.on_event(event).await;
                }
                unavailable = now_unavailable;

                sink.on_state_update(SystemStateUpdate::from(state)).await;
            }
        });

        info!("📡 Polling workspace every {:?}", every);
        Ok(Subscription::new(self.name(), handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<EnvironmentalEvent>>,
        updates: Mutex<Vec<SystemStateUpdate>>,
    }

    #[async_trait]
    impl IngestionSink for Recorder {
        async fn on_event(&self, event: EnvironmentalEvent) {
            self.events.lock().await.push(event);
        }

        async fn on_state_update(&self, update: SystemStateUpdate) {
            self.updates.lock().await.push(update);
        }
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_channel_delivers_until_disconnected() {
        let source = ChannelIngestion::default();
        let recorder = Arc::new(Recorder::default());
        let mut subscription = source.subscribe(recorder.clone()).await.unwrap();
        assert!(subscription.is_connected());

        let event = EnvironmentalEvent::new(
            EventType::MarketShift,
            Severity::Low,
            EventSource::Ingestion,
            "competitor pricing",
        );
        assert!(source.publish_event(event.clone()));
        assert!(source.publish_state(SystemStateUpdate {
            confidence: Some(0.95),
            ..Default::default()
        }));
        settle().await;

        assert_eq!(recorder.events.lock().await.as_slice(), &[event]);
        assert_eq!(recorder.updates.lock().await.len(), 1);

        subscription.disconnect();
        settle().await;
        assert!(!source.publish_event(EnvironmentalEvent::new(
            EventType::MarketShift,
            Severity::Low,
            EventSource::Ingestion,
            "after disconnect",
        )));
        assert_eq!(recorder.events.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_workspace_poll_reports_unavailable_once() {
        let dir = tempfile::tempdir().unwrap();
        let collector = Arc::new(MetricsCollector::new(dir.path().join("missing")));
        let source = WorkspaceIngestion::new(collector, Duration::from_millis(10));
        let recorder = Arc::new(Recorder::default());

        let mut subscription = source.subscribe(recorder.clone()).await.unwrap();
        while recorder.updates.lock().await.len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        subscription.disconnect();

        let events = recorder.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::OperationalFailure);
        assert_eq!(events[0].source, EventSource::Workspace);
    }
}
