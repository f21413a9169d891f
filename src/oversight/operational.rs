//! Operational oversight: service levels and system performance

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

const TOLERANCE: f64 = 50.0;
const UPTIME_SLO: f64 = 0.99;
const ERROR_BUDGET: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPerformanceMetrics {
    pub efficiency: f64,
    pub throughput: f64,
    pub resource_utilization: f64,
    pub uptime: f64,
    pub error_rate: f64,
    pub system_load: f64,
    pub recovery_time: f64,
    pub performance_score: f64,
}

impl SystemPerformanceMetrics {
    fn from_state(state: &SystemState) -> Self {
        let ops = &state.operational;
        let rel = &state.reliability;
        Self {
            efficiency: ops.efficiency,
            throughput: ops.throughput,
            resource_utilization: ops.resource_utilization,
            uptime: rel.uptime,
            error_rate: rel.error_rate,
            system_load: rel.system_load,
            recovery_time: rel.recovery_time,
            performance_score: (state.domain_score(Domain::Operational)
                + state.domain_score(Domain::Reliability))
                / 2.0,
        }
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            tier: OversightTier::Operational,
            score: self.performance_score,
            indicators: indicators(&[
                ("efficiency", self.efficiency),
                ("throughput", self.throughput),
                ("resourceUtilization", self.resource_utilization),
                ("uptime", self.uptime),
                ("errorRate", self.error_rate),
                ("systemLoad", self.system_load),
                ("recoveryTime", self.recovery_time),
            ]),
            updated_at: Utc::now(),
        }
    }
}

pub struct OperationalOversight {
    metrics: RwLock<SystemPerformanceMetrics>,
    snapshots: watch::Sender<LayerSnapshot>,
}

impl OperationalOversight {
    pub fn new(initial: &SystemState) -> Self {
        let metrics = SystemPerformanceMetrics::from_state(initial);
        let (snapshots, _) = watch::channel(metrics.snapshot());
        Self {
            metrics: RwLock::new(metrics),
            snapshots,
        }
    }

    pub fn metrics(&self) -> SystemPerformanceMetrics {
        self.metrics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl OversightLayer for OperationalOversight {
    fn tier(&self) -> OversightTier {
        OversightTier::Operational
    }

    fn refresh(&self, state: &SystemState) {
        let next = SystemPerformanceMetrics::from_state(state);
        self.snapshots.send_replace(next.snapshot());
        *self.metrics.write().unwrap_or_else(|e| e.into_inner()) = next;
        debug!("Operational oversight refreshed");
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

        if m.system_load > 0.8 {
            risks.push(risk(
                "OPS-001",
                "saturation",
                format!("System load at {:.0}%", m.system_load * 100.0),
                if m.system_load > 0.9 { -30.0 } else { -15.0 },
            ));
            mitigations.push("Scale out or shed background work".to_string());
        }
        if m.error_rate > ERROR_BUDGET {
            risks.push(risk(
                "OPS-002",
                "error_budget",
                format!("Error rate {:.1}% exceeds budget", m.error_rate * 100.0),
                -25.0,
            ));
            mitigations.push("Halt feature releases until errors are back in budget".to_string());
        }
        if m.uptime < UPTIME_SLO {
            risks.push(risk(
                "OPS-003",
                "availability",
                format!("Uptime {:.3} below SLO", m.uptime),
                -20.0,
            ));
            mitigations.push("Add failover for the least available dependency".to_string());
        }
        if m.efficiency < 0.5 {
            risks.push(risk("OPS-004", "efficiency", "Operational efficiency below 0.5", -10.0));
            mitigations.push("Profile and streamline the slowest workflows".to_string());
        }
        if m.recovery_time > 60.0 {
            risks.push(risk(
                "OPS-005",
                "recovery",
                format!("Recovery takes {:.0} minutes", m.recovery_time),
                -10.0,
            ));
            mitigations.push("Rehearse the recovery runbook".to_string());
        }

        RiskAssessment::from_factors(OversightTier::Operational, risks, mitigations, TOLERANCE)
    }

    fn verify_compliance(&self) -> ComplianceStatus {
        let m = self.metrics();
        ComplianceStatus::from_checks(
            OversightTier::Operational,
            &[
                (m.uptime >= UPTIME_SLO, format!("uptime below {}", UPTIME_SLO)),
                (m.error_rate <= ERROR_BUDGET, "error budget exhausted".to_string()),
                (m.system_load <= 0.9, "system load above 90%".to_string()),
            ],
        )
    }

    fn generate_insights(&self) -> Vec<ActionableInsight> {
        let m = self.metrics();
        let mut insights = Vec::new();

        if m.resource_utilization > 0.85 {
            insights.push(ActionableInsight {
                tier: OversightTier::Operational,
                title: "Capacity headroom is thin".to_string(),
                description: format!("Resource utilization at {:.2}", m.resource_utilization),
                priority: Severity::High,
                actions: vec!["Plan capacity increase this cycle".to_string()],
            });
        } else if m.resource_utilization < 0.3 {
            insights.push(ActionableInsight {
                tier: OversightTier::Operational,
                title: "Resources are underused".to_string(),
                description: format!("Resource utilization at {:.2}", m.resource_utilization),
                priority: Severity::Low,
                actions: vec!["Right-size provisioned capacity".to_string()],
            });
        }
        if m.throughput < 0.5 {
            insights.push(ActionableInsight {
                tier: OversightTier::Operational,
                title: "Throughput is low".to_string(),
                description: format!("Throughput indicator at {:.2}", m.throughput),
                priority: Severity::Medium,
                actions: vec!["Identify the current bottleneck stage".to_string()],
            });
        }

        insights
    }

    fn process_event(&self, event: &EnvironmentalEvent) -> ProtocolResponse {
        let actions = match event.event_type {
            EventType::OperationalFailure => vec![
                "Open an incident".to_string(),
                "Shift traffic away from the failing component".to_string(),
            ],
            EventType::PerformanceDegradation => vec!["Capture profiles and compare to baseline".to_string()],
            EventType::ResourceConstraint => vec!["Re-prioritize workloads by business value".to_string()],
            EventType::SecurityIncident if event.severity >= Severity::High => {
                vec!["Prepare to isolate affected services".to_string()]
            }
            _ => Vec::new(),
        };

        ProtocolResponse {
            tier: OversightTier::Operational,
            event_id: event.id,
            acknowledged: !actions.is_empty(),
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReliabilityMetrics, SystemStateUpdate};

    #[test]
    fn test_fallback_state_meets_service_levels() {
        let layer = OperationalOversight::new(&SystemState::fallback());
        assert!(layer.verify_compliance().compliant);
        assert!(layer.assess_risks().within_tolerance);
    }

    #[test]
    fn test_saturated_system_raises_risks() {
        let layer = OperationalOversight::new(&SystemState::fallback());
        layer.refresh(&SystemState::fallback().with_update(&SystemStateUpdate {
            reliability: Some(ReliabilityMetrics {
                uptime: 0.95,
                error_rate: 0.12,
                recovery_time: 90.0,
                system_load: 0.95,
            }),
            ..Default::default()
        }));

        let assessment = layer.assess_risks();
        let ids: Vec<&str> = assessment.risks.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["OPS-001", "OPS-002", "OPS-003", "OPS-005"]);
        assert_eq!(assessment.score, 15.0);
        assert!(!assessment.within_tolerance);

        let compliance = layer.verify_compliance();
        assert_eq!(compliance.violations.len(), 3);
        assert_eq!(compliance.score, 0.0);
    }
}
