//! Oversight hierarchy
//!
//! Owns the three layers and their refresh timers. Each layer reads the latest
//! published state on its own cadence.

use super::{
    ActionableInsight, ComplianceStatus, LayerSnapshot, OperationalOversight, OversightLayer,
    ProtocolResponse, RiskAssessment, StrategicOversight, TacticalOversight,
};
use crate::config::OversightConfig;
use crate::models::{EnvironmentalEvent, SystemState};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStatus {
    pub snapshot: LayerSnapshot,
    pub risk: RiskAssessment,
    pub compliance: ComplianceStatus,
    pub insights: Vec<ActionableInsight>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyStatus {
    pub running: bool,
    pub strategic: LayerStatus,
    pub operational: LayerStatus,
    pub tactical: LayerStatus,
    pub open_alerts: usize,
}

/// Combined result of offering one event to all three layers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOversight {
    pub responses: Vec<ProtocolResponse>,
    pub escalated: bool,
}

pub struct OversightHierarchy {
    strategic: Arc<StrategicOversight>,
    operational: Arc<OperationalOversight>,
    tactical: Arc<TacticalOversight>,
    config: OversightConfig,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl OversightHierarchy {
    pub fn new(config: OversightConfig, initial: &SystemState) -> Self {
        Self {
            strategic: Arc::new(StrategicOversight::new(initial)),
            operational: Arc::new(OperationalOversight::new(initial)),
            tactical: Arc::new(TacticalOversight::new(initial)),
            config,
            timers: Mutex::new(Vec::new()),
        }
    }

    pub fn strategic(&self) -> &Arc<StrategicOversight> {
        &self.strategic
    }

    pub fn operational(&self) -> &Arc<OperationalOversight> {
        &self.operational
    }

    pub fn tactical(&self) -> &Arc<TacticalOversight> {
        &self.tactical
    }

    /// Spawns the three refresh timers. No-op if they are already running.
    pub fn start(&self, state: watch::Receiver<Arc<SystemState>>) -> bool {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        if !timers.is_empty() {
            warn!("Oversight timers already running");
            return false;
        }

        let layers: [(Arc<dyn OversightLayer>, u64); 3] = [
            (self.strategic.clone() as Arc<dyn OversightLayer>, self.config.strategic_interval_secs),
            (self.operational.clone() as Arc<dyn OversightLayer>, self.config.operational_interval_secs),
            (self.tactical.clone() as Arc<dyn OversightLayer>, self.config.tactical_interval_secs),
        ];

        for (layer, secs) in layers {
            timers.push(spawn_refresh(layer, Duration::from_secs(secs), state.clone()));
        }

        info!(
            "🔭 Oversight started (strategic {}s, operational {}s, tactical {}s)",
            self.config.strategic_interval_secs,
            self.config.operational_interval_secs,
            self.config.tactical_interval_secs
        );
        true
    }

    /// Aborts the refresh timers. Returns false if none were running.
    pub fn stop(&self) -> bool {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        if timers.is_empty() {
            return false;
        }
        for handle in timers.drain(..) {
            handle.abort();
        }
        info!("🔭 Oversight stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        !self.timers.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn refresh_all(&self, state: &SystemState) {
        self.strategic.refresh(state);
        self.operational.refresh(state);
        self.tactical.refresh(state);
    }

    /// Offers the event to every layer and escalates it tactically
    pub fn process_event(&self, event: &EnvironmentalEvent) -> EventOversight {
        let responses = vec![
            self.strategic.process_event(event),
            self.operational.process_event(event),
            self.tactical.process_event(event),
        ];
        let escalated = self.tactical.escalate(event);
        EventOversight { responses, escalated }
    }

    pub fn status(&self) -> HierarchyStatus {
        HierarchyStatus {
            running: self.is_running(),
            strategic: layer_status(self.strategic.as_ref()),
            operational: layer_status(self.operational.as_ref()),
            tactical: layer_status(self.tactical.as_ref()),
            open_alerts: self.tactical.alert_count(),
        }
    }
}

impl Drop for OversightHierarchy {
    fn drop(&mut self) {
        self.stop();
    }
}

fn layer_status(layer: &dyn OversightLayer) -> LayerStatus {
    LayerStatus {
        snapshot: layer.snapshot(),
        risk: layer.assess_risks(),
        compliance: layer.verify_compliance(),
        insights: layer.generate_insights(),
    }
}

fn spawn_refresh(
    layer: Arc<dyn OversightLayer>,
    every: Duration,
    mut state: watch::Receiver<Arc<SystemState>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let current = state.borrow_and_update().clone();
            layer.refresh(&current);
            debug!(tier = ?layer.tier(), "Oversight layer tick");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StateChannel;
    use crate::models::{EventSource, EventType, SecurityMetrics, Severity, SystemStateUpdate};

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_clears_timers() {
        let channel = StateChannel::new(SystemState::fallback());
        let hierarchy = OversightHierarchy::new(OversightConfig::default(), &channel.current());

        assert!(hierarchy.start(channel.subscribe()));
        assert!(!hierarchy.start(channel.subscribe()));
        assert_eq!(hierarchy.timer_count(), 3);

        assert!(hierarchy.stop());
        assert!(!hierarchy.stop());
        assert!(!hierarchy.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tactical_layer_follows_published_state() {
        let channel = StateChannel::new(SystemState::fallback());
        let hierarchy = OversightHierarchy::new(OversightConfig::default(), &channel.current());
        hierarchy.start(channel.subscribe());

        channel.apply(&SystemStateUpdate {
            security: Some(SecurityMetrics {
                threat_level: 0.9,
                compliance_score: 0.5,
                vulnerability_count: 8.0,
                incident_rate: 0.3,
            }),
            ..Default::default()
        });

        tokio::time::sleep(Duration::from_secs(11)).await;

        let status = hierarchy.status();
        assert_eq!(status.tactical.snapshot.indicators["threatLevel"], 0.9);
        assert!(!status.tactical.compliance.compliant);
        hierarchy.stop();
    }

    #[test]
    fn test_process_event_reaches_all_layers() {
        let hierarchy = OversightHierarchy::new(OversightConfig::default(), &SystemState::fallback());
        let event = EnvironmentalEvent::new(
            EventType::SecurityIncident,
            Severity::Critical,
            EventSource::Manual,
            "token leaked",
        );

        let outcome = hierarchy.process_event(&event);
        assert_eq!(outcome.responses.len(), 3);
        assert!(outcome.escalated);
        assert_eq!(hierarchy.status().open_alerts, 1);
    }
}
