//! Operations director
//!
//! Watches throughput and failure recovery. Its gate refuses to sign off while
//! the platform is inefficient or throwing errors.

use super::{signals, DecisionDraft, DirectorPolicy};
use crate::models::{
    DirectorDecision, DirectorRole, Domain, EnvironmentalEvent, EventType, Severity, SystemState,
};

const MIN_EFFICIENCY: f64 = 0.4;
const MAX_ERROR_RATE: f64 = 0.2;

pub struct OperationsPolicy;

impl DirectorPolicy for OperationsPolicy {
    fn role(&self) -> DirectorRole {
        DirectorRole::Operations
    }

    fn expertise(&self) -> &'static [&'static str] {
        &["process_management", "capacity_planning", "incident_response", "supply_chain"]
    }

    fn authorities(&self) -> &'static [&'static str] {
        &["allocate_resources", "pause_operations", "schedule_maintenance"]
    }

    fn focus(&self) -> &'static [EventType] {
        &[
            EventType::OperationalFailure,
            EventType::PerformanceDegradation,
            EventType::ResourceConstraint,
        ]
    }

    fn domain_weights(&self) -> &'static [(Domain, f64)] {
        &[
            (Domain::Operational, 0.5),
            (Domain::Reliability, 0.3),
            (Domain::Financial, 0.2),
        ]
    }

    fn draft(&self, state: &SystemState, event: &EnvironmentalEvent) -> DecisionDraft {
        let ops = &state.operational;
        let rel = &state.reliability;

        let (decision, mitigation) = match (event.event_type, event.severity) {
            (EventType::OperationalFailure, Severity::Critical | Severity::High) => (
                "Activate incident runbook and shift load to standby capacity",
                vec!["Page on-call".to_string(), "Freeze deployments".to_string()],
            ),
            (EventType::PerformanceDegradation, _) if rel.system_load > 0.8 => (
                "Shed non-critical workloads",
                vec!["Throttle batch jobs".to_string()],
            ),
            (EventType::ResourceConstraint, _) => (
                "Rebalance resource allocation",
                vec!["Reclaim idle capacity".to_string()],
            ),
            _ => ("Continue normal operations with heightened monitoring", Vec::new()),
        };

        DecisionDraft {
            decision: decision.to_string(),
            rationale: format!(
                "Efficiency {:.2}, utilization {:.2}, error rate {:.3}, load {:.2}",
                ops.efficiency, ops.resource_utilization, rel.error_rate, rel.system_load
            ),
            scope: vec!["operations".into()],
            consequences: vec![format!("Operational posture adjusted for {}", event.event_type)],
            mitigation,
            signals: signals(&[
                ("operationalEfficiency", ops.efficiency),
                ("errorRate", rel.error_rate),
                ("systemLoad", rel.system_load),
            ]),
        }
    }

    fn domain_gate(&self, decision: &DirectorDecision) -> bool {
        let efficient = decision
            .signal("operationalEfficiency")
            .is_some_and(|e| e >= MIN_EFFICIENCY);
        let stable = decision.signal("errorRate").is_some_and(|e| e <= MAX_ERROR_RATE);
        efficient && stable
    }

    fn recommendations(&self, state: &SystemState) -> Vec<String> {
        let mut out = Vec::new();
        if state.operational.resource_utilization > 0.85 {
            out.push("Provision additional capacity before the next peak".to_string());
        }
        if state.reliability.error_rate > 0.05 {
            out.push("Investigate elevated error rate".to_string());
        }
        if state.operational.efficiency < 0.6 {
            out.push("Audit slowest pipelines for waste".to_string());
        }
        out
    }

    fn actions(&self, state: &SystemState) -> Vec<String> {
        let mut out = Vec::new();
        if state.reliability.system_load > 0.85 {
            out.push("Throttle background jobs".to_string());
        }
        if state.reliability.error_rate > MAX_ERROR_RATE {
            out.push("Freeze deployments".to_string());
        }
        out
    }
}
