//! Tactical oversight
//!
//! Fastest layer. Owns the alert queue and the severity → response protocol
//! table. The queue holds at most [`MAX_ALERTS`]; on overflow only the most
//! recent [`RETAINED_ALERTS`] survive.

use super::{
    indicators, risk, ActionableInsight, ComplianceStatus, LayerSnapshot, OversightLayer,
    OversightTier, ProtocolResponse, RiskAssessment,
};
use crate::models::{DirectorRole, EnvironmentalEvent, EventType, Severity, SystemState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_ALERTS: usize = 50;
pub const RETAINED_ALERTS: usize = 25;

const TOLERANCE: f64 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTrigger {
    pub id: Uuid,
    pub event_id: Uuid,
    pub event_type: EventType,
    pub severity: Severity,
    pub description: String,
    pub requires_immediate_action: bool,
    pub triggered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStep {
    pub action: String,
    pub owner: DirectorRole,
    /// Minutes from trigger to expected completion
    pub target_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseProtocol {
    pub name: String,
    pub immediate: Vec<ActionStep>,
    pub short_term: Vec<ActionStep>,
    pub long_term: Vec<ActionStep>,
}

fn step(action: &str, owner: DirectorRole, target_minutes: u32) -> ActionStep {
    ActionStep {
        action: action.to_string(),
        owner,
        target_minutes,
    }
}

fn protocol_table() -> HashMap<Severity, ResponseProtocol> {
    use DirectorRole::*;

    HashMap::from([
        (
            Severity::Critical,
            ResponseProtocol {
                name: "critical-incident".to_string(),
                immediate: vec![
                    step("Convene incident command", Chair, 5),
                    step("Contain the affected systems", Technology, 15),
                    step("Assess notification obligations", Legal, 30),
                ],
                short_term: vec![
                    step("Restore service from known-good state", Operations, 240),
                    step("Estimate financial exposure", Finance, 480),
                ],
                long_term: vec![
                    step("Publish post-incident review", Technology, 7 * 24 * 60),
                    step("Update risk register and board policy", Chair, 30 * 24 * 60),
                ],
            },
        ),
        (
            Severity::High,
            ResponseProtocol {
                name: "high-priority".to_string(),
                immediate: vec![step("Assign an accountable owner", Operations, 30)],
                short_term: vec![
                    step("Mitigate and verify", Operations, 24 * 60),
                    step("Brief the board", Chair, 24 * 60),
                ],
                long_term: vec![step("Address root cause", Technology, 14 * 24 * 60)],
            },
        ),
        (
            Severity::Medium,
            ResponseProtocol {
                name: "standard".to_string(),
                immediate: Vec::new(),
                short_term: vec![step("Triage in next operations review", Operations, 3 * 24 * 60)],
                long_term: vec![step("Track to closure", Operations, 30 * 24 * 60)],
            },
        ),
    ])
}

fn generic_protocol() -> ResponseProtocol {
    ResponseProtocol {
        name: "generic".to_string(),
        immediate: Vec::new(),
        short_term: vec![step("Log and review", DirectorRole::Operations, 7 * 24 * 60)],
        long_term: Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticalMetrics {
    pub open_alerts: usize,
    pub critical_alerts: usize,
    pub threat_level: f64,
    pub incident_rate: f64,
    pub compliance_score: f64,
    pub vulnerability_count: f64,
}

pub struct TacticalOversight {
    alerts: Mutex<VecDeque<AlertTrigger>>,
    protocols: HashMap<Severity, ResponseProtocol>,
    state: RwLock<TacticalMetrics>,
    snapshots: watch::Sender<LayerSnapshot>,
}

impl TacticalOversight {
    pub fn new(initial: &SystemState) -> Self {
        let metrics = TacticalMetrics {
            open_alerts: 0,
            critical_alerts: 0,
            threat_level: initial.security.threat_level,
            incident_rate: initial.security.incident_rate,
            compliance_score: initial.security.compliance_score,
            vulnerability_count: initial.security.vulnerability_count,
        };
        let (snapshots, _) = watch::channel(Self::to_snapshot(&metrics));
        Self {
            alerts: Mutex::new(VecDeque::new()),
            protocols: protocol_table(),
            state: RwLock::new(metrics),
            snapshots,
        }
    }

    /// Queues an alert for High/Critical events. Returns whether one was raised.
    pub fn escalate(&self, event: &EnvironmentalEvent) -> bool {
        if !event.severity.is_escalation_worthy() {
            return false;
        }

        let trigger = AlertTrigger {
            id: Uuid::new_v4(),
            event_id: event.id,
            event_type: event.event_type,
            severity: event.severity,
            description: event.description.clone(),
            requires_immediate_action: event.severity == Severity::Critical
                || event.event_type == EventType::SecurityIncident,
            triggered_at: Utc::now(),
        };

        warn!(
            event_id = %event.id,
            severity = %event.severity,
            immediate = trigger.requires_immediate_action,
            "🚨 Escalating {}",
            event.event_type
        );

        let mut alerts = self.alerts.lock().unwrap_or_else(|e| e.into_inner());
        alerts.push_back(trigger);
        if alerts.len() > MAX_ALERTS {
            let overflow = alerts.len() - RETAINED_ALERTS;
            alerts.drain(..overflow);
            info!("Alert queue overflow; kept the {} most recent", RETAINED_ALERTS);
        }
        true
    }

    /// Response plan for a trigger, falling back to the generic protocol
    pub fn trigger_response(&self, trigger: &AlertTrigger) -> ResponseProtocol {
        self.protocols
            .get(&trigger.severity)
            .cloned()
            .unwrap_or_else(generic_protocol)
    }

    pub fn alerts(&self) -> Vec<AlertTrigger> {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn metrics(&self) -> TacticalMetrics {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn to_snapshot(m: &TacticalMetrics) -> LayerSnapshot {
        let alert_pressure = (m.critical_alerts as f64 * 0.2 + m.open_alerts as f64 * 0.02).min(1.0);
        let score = ((1.0 - m.threat_level) + m.compliance_score + (1.0 - alert_pressure)) / 3.0;
        LayerSnapshot {
            tier: OversightTier::Tactical,
            score: score.clamp(0.0, 1.0),
            indicators: indicators(&[
                ("openAlerts", m.open_alerts as f64),
                ("criticalAlerts", m.critical_alerts as f64),
                ("threatLevel", m.threat_level),
                ("incidentRate", m.incident_rate),
                ("complianceScore", m.compliance_score),
            ]),
            updated_at: Utc::now(),
        }
    }
}

impl OversightLayer for TacticalOversight {
    fn tier(&self) -> OversightTier {
        OversightTier::Tactical
    }

    fn refresh(&self, state: &SystemState) {
        let alerts = self.alerts();
        let next = TacticalMetrics {
            open_alerts: alerts.len(),
            critical_alerts: alerts.iter().filter(|a| a.severity == Severity::Critical).count(),
            threat_level: state.security.threat_level,
            incident_rate: state.security.incident_rate,
            compliance_score: state.security.compliance_score,
            vulnerability_count: state.security.vulnerability_count,
        };
        self.snapshots.send_replace(Self::to_snapshot(&next));
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    fn snapshot(&self) -> LayerSnapshot {
        self.snapshots.borrow().clone()
    }

    fn monitor(&self) -> watch::Receiver<LayerSnapshot> {
        self.snapshots.subscribe()
    }

    fn assess_risks(&self) -> RiskAssessment {
        let m = self.metrics();
        let critical = self
            .alerts()
            .iter()
            .filter(|a| a.requires_immediate_action)
            .count();

        let mut risks = Vec::new();
        let mut mitigations = Vec::new();

        if critical > 0 {
            risks.push(risk(
                "TAC-001",
                "open_critical_alerts",
                format!("{} alerts need immediate action", critical),
                -(critical as f64 * 15.0).min(60.0),
            ));
            mitigations.push("Work the immediate-action alerts first".to_string());
        }
        if m.threat_level > 0.6 {
            risks.push(risk(
                "TAC-002",
                "threat",
                format!("Threat level {:.2}", m.threat_level),
                -25.0,
            ));
            mitigations.push("Raise monitoring sensitivity".to_string());
        }
        if m.vulnerability_count >= 5.0 {
            risks.push(risk(
                "TAC-003",
                "vulnerabilities",
                format!("{} open vulnerabilities", m.vulnerability_count as u64),
                -15.0,
            ));
            mitigations.push("Patch sprint on the highest-severity findings".to_string());
        }

        RiskAssessment::from_factors(OversightTier::Tactical, risks, mitigations, TOLERANCE)
    }

    fn verify_compliance(&self) -> ComplianceStatus {
        let m = self.metrics();
        ComplianceStatus::from_checks(
            OversightTier::Tactical,
            &[
                (m.compliance_score >= 0.8, "compliance score below 0.8".to_string()),
                (m.incident_rate <= 0.1, "incident rate above 10%".to_string()),
                (self.alert_count() < MAX_ALERTS, "alert queue at capacity".to_string()),
            ],
        )
    }

    fn generate_insights(&self) -> Vec<ActionableInsight> {
        self.alerts()
            .iter()
            .filter(|a| a.requires_immediate_action)
            .map(|alert| {
                let protocol = self.trigger_response(alert);
                ActionableInsight {
                    tier: OversightTier::Tactical,
                    title: format!("Respond to {}", alert.event_type),
                    description: alert.description.clone(),
                    priority: alert.severity,
                    actions: protocol.immediate.iter().map(|s| s.action.clone()).collect(),
                }
            })
            .collect()
    }

    fn process_event(&self, event: &EnvironmentalEvent) -> ProtocolResponse {
        let protocol = self
            .protocols
            .get(&event.severity)
            .cloned()
            .unwrap_or_else(generic_protocol);

        let actions = protocol
            .immediate
            .iter()
            .chain(protocol.short_term.iter())
            .map(|s| format!("{} ({}, {}m)", s.action, s.owner, s.target_minutes))
            .collect();

        ProtocolResponse {
            tier: OversightTier::Tactical,
            event_id: event.id,
            acknowledged: true,
            actions,
        }
    }
}
