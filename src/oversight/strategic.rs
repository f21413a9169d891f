//! Strategic oversight
//!
//! Slowest layer. Tracks whether the organisation is still moving toward its
//! stated vision.

use super::{
    indicators, risk, ActionableInsight, ComplianceStatus, LayerSnapshot, OversightLayer,
    OversightTier, ProtocolResponse, RiskAssessment,
};
use crate::models::{Domain, EnvironmentalEvent, EventType, Severity, SystemState};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tokio::sync::watch;
use tracing::debug;

/// Safety score below which strategic risk is no longer tolerated
const TOLERANCE: f64 = 75.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionAlignmentMetrics {
    pub vision_alignment: f64,
    pub goal_progress: f64,
    pub market_position: f64,
    pub innovation_index: f64,
    pub runway_months: f64,
    pub strategic_health: f64,
}

impl VisionAlignmentMetrics {
    fn from_state(state: &SystemState) -> Self {
        Self {
            vision_alignment: state.strategic.vision_alignment,
            goal_progress: state.strategic.goal_progress,
            market_position: state.strategic.market_position,
            innovation_index: state.strategic.innovation_index,
            runway_months: state.financial.runway_months,
            strategic_health: state.domain_score(Domain::Strategic),
        }
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            tier: OversightTier::Strategic,
            score: self.strategic_health,
            indicators: indicators(&[
                ("visionAlignment", self.vision_alignment),
                ("goalProgress", self.goal_progress),
                ("marketPosition", self.market_position),
                ("innovationIndex", self.innovation_index),
                ("runwayMonths", self.runway_months),
            ]),
            updated_at: Utc::now(),
        }
    }
}

pub struct StrategicOversight {
    metrics: RwLock<VisionAlignmentMetrics>,
    snapshots: watch::Sender<LayerSnapshot>,
}

impl StrategicOversight {
    pub fn new(initial: &SystemState) -> Self {
        let metrics = VisionAlignmentMetrics::from_state(initial);
        let (snapshots, _) = watch::channel(metrics.snapshot());
        Self {
            metrics: RwLock::new(metrics),
            snapshots,
        }
    }

    pub fn metrics(&self) -> VisionAlignmentMetrics {
        self.metrics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl OversightLayer for StrategicOversight {
    fn tier(&self) -> OversightTier {
        OversightTier::Strategic
    }

    fn refresh(&self, state: &SystemState) {
        let next = VisionAlignmentMetrics::from_state(state);
        self.snapshots.send_replace(next.snapshot());
        *self.metrics.write().unwrap_or_else(|e| e.into_inner()) = next;
        debug!("Strategic oversight refreshed");
    }

    fn snapshot(&self) -> LayerSnapshot {
        self.snapshots.borrow().clone()
    }

    fn monitor(&self) -> watch::Receiver<LayerSnapshot> {
        self.snapshots.subscribe()
    }

    fn assess_risks(&self) -> RiskAssessment {
        let m = self.metrics();
        let mut risks = Vec::new();
        let mut mitigations = Vec::new();

        if m.vision_alignment < 0.6 {
            risks.push(risk(
                "STR-001",
                "vision_drift",
                format!("Vision alignment at {:.2}", m.vision_alignment),
                -((0.6 - m.vision_alignment) * 100.0).min(30.0) - 10.0,
            ));
            mitigations.push("Re-anchor initiatives to the published vision".to_string());
        }
        if m.goal_progress < 0.5 {
            risks.push(risk(
                "STR-002",
                "goal_slippage",
                format!("Goal progress at {:.2}", m.goal_progress),
                -15.0,
            ));
            mitigations.push("Reduce the active goal set".to_string());
        }
        if m.runway_months < 6.0 {
            risks.push(risk(
                "STR-003",
                "runway",
                format!("{:.1} months of runway", m.runway_months),
                if m.runway_months < 3.0 { -40.0 } else { -20.0 },
            ));
            mitigations.push("Secure financing before committing to new bets".to_string());
        }
        if m.innovation_index < 0.4 {
            risks.push(risk("STR-004", "stagnation", "Innovation index below 0.4", -10.0));
            mitigations.push("Fund a small exploratory portfolio".to_string());
        }

        RiskAssessment::from_factors(OversightTier::Strategic, risks, mitigations, TOLERANCE)
    }

    fn verify_compliance(&self) -> ComplianceStatus {
        let m = self.metrics();
        ComplianceStatus::from_checks(
            OversightTier::Strategic,
            &[
                (m.vision_alignment >= 0.6, "vision alignment below 0.6".to_string()),
                (m.goal_progress >= 0.4, "goal progress below 0.4".to_string()),
                (m.runway_months >= 6.0, "runway below 6 months".to_string()),
            ],
        )
    }

    fn generate_insights(&self) -> Vec<ActionableInsight> {
        let m = self.metrics();
        let mut insights = Vec::new();

        if m.market_position < 0.5 {
            insights.push(ActionableInsight {
                tier: OversightTier::Strategic,
                title: "Market position is weakening".to_string(),
                description: format!("Market position indicator at {:.2}", m.market_position),
                priority: Severity::High,
                actions: vec!["Commission a competitive review".to_string()],
            });
        }
        if m.innovation_index >= 0.7 && m.runway_months >= 12.0 {
            insights.push(ActionableInsight {
                tier: OversightTier::Strategic,
                title: "Capacity for a new strategic bet".to_string(),
                description: "Innovation is strong and runway is comfortable".to_string(),
                priority: Severity::Medium,
                actions: vec!["Shortlist two opportunities for board review".to_string()],
            });
        }
        if m.strategic_health < 0.5 {
            insights.push(ActionableInsight {
                tier: OversightTier::Strategic,
                title: "Strategic health is low".to_string(),
                description: format!("Composite strategic score {:.2}", m.strategic_health),
                priority: Severity::High,
                actions: vec!["Schedule a strategy reset session".to_string()],
            });
        }

        insights
    }

    fn process_event(&self, event: &EnvironmentalEvent) -> ProtocolResponse {
        let actions = match event.event_type {
            EventType::MarketShift => vec!["Reassess market assumptions in the plan".to_string()],
            EventType::StrategicOpportunity => vec!["Evaluate fit against vision".to_string()],
            EventType::RegulatoryChange => vec!["Check strategic exposure to the regulation".to_string()],
            EventType::TechnologyDisruption => vec!["Assess disruption to the roadmap".to_string()],
            _ => Vec::new(),
        };

        ProtocolResponse {
            tier: OversightTier::Strategic,
            event_id: event.id,
            acknowledged: !actions.is_empty(),
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventSource, StrategicMetrics, SystemStateUpdate};

    #[test]
    fn test_healthy_state_is_within_tolerance() {
        let layer = StrategicOversight::new(&SystemState::fallback());
        let assessment = layer.assess_risks();
        assert!(assessment.risks.is_empty());
        assert_eq!(assessment.score, 100.0);
        assert!(assessment.within_tolerance);
        assert!(layer.verify_compliance().compliant);
    }

    #[test]
    fn test_refresh_publishes_to_monitor() {
        let layer = StrategicOversight::new(&SystemState::fallback());
        let rx = layer.monitor();

        let drifted = SystemState::fallback().with_update(&SystemStateUpdate {
            strategic: Some(StrategicMetrics {
                vision_alignment: 0.3,
                goal_progress: 0.3,
                market_position: 0.4,
                innovation_index: 0.3,
            }),
            ..Default::default()
        });
        layer.refresh(&drifted);

        assert_eq!(rx.borrow().indicators["visionAlignment"], 0.3);
        let assessment = layer.assess_risks();
        assert!(assessment.risks.iter().any(|r| r.id == "STR-001"));
        assert!(!assessment.within_tolerance);
        assert!(!layer.verify_compliance().compliant);
        assert!(!layer.generate_insights().is_empty());
    }

    #[test]
    fn test_operational_events_are_out_of_remit() {
        let layer = StrategicOversight::new(&SystemState::fallback());
        let event = EnvironmentalEvent::new(
            EventType::OperationalFailure,
            Severity::High,
            EventSource::Manual,
            "queue backlog",
        );
        assert!(!layer.process_event(&event).acknowledged);
    }
}
