//! Legal director

use super::{signals, DecisionDraft, DirectorPolicy};
use crate::models::{
    DirectorDecision, DirectorRole, Domain, EnvironmentalEvent, EventType, Severity, SystemState,
};

const MIN_COMPLIANCE: f64 = 0.6;

pub struct LegalPolicy;

impl DirectorPolicy for LegalPolicy {
    fn role(&self) -> DirectorRole {
        DirectorRole::Legal
    }

    fn expertise(&self) -> &'static [&'static str] {
        &["regulatory_affairs", "contracts", "data_protection", "litigation"]
    }

    fn authorities(&self) -> &'static [&'static str] {
        &["legal_hold", "regulator_notification", "contract_approval"]
    }

    fn focus(&self) -> &'static [EventType] {
        &[
            EventType::RegulatoryChange,
            EventType::ComplianceViolation,
            EventType::SecurityIncident,
        ]
    }

    fn domain_weights(&self) -> &'static [(Domain, f64)] {
        &[(Domain::Security, 0.6), (Domain::Strategic, 0.2), (Domain::Operational, 0.2)]
    }

    fn draft(&self, state: &SystemState, event: &EnvironmentalEvent) -> DecisionDraft {
        let compliance = state.security.compliance_score;

        let (decision, consequences) = match event.event_type {
            EventType::ComplianceViolation => (
                "Open remediation plan and assess disclosure duty",
                vec!["Possible regulator inquiry".to_string()],
            ),
            EventType::RegulatoryChange => (
                "Map the change to affected obligations",
                vec!["Policy updates required".to_string()],
            ),
            EventType::SecurityIncident if event.severity == Severity::Critical => (
                "Place legal hold and prepare breach notification",
                vec!["Notification deadline may apply".to_string()],
            ),
            _ => ("No legal action required", Vec::new()),
        };

        DecisionDraft {
            decision: decision.to_string(),
            rationale: format!("Compliance score {:.2} against {} event", compliance, event.event_type),
            scope: vec!["legal".into(), "compliance".into()],
            consequences,
            mitigation: vec!["Counsel review of outcome".into()],
            signals: signals(&[
                ("complianceScore", compliance),
                ("incidentRate", state.security.incident_rate),
            ]),
        }
    }

    fn domain_gate(&self, decision: &DirectorDecision) -> bool {
        decision.signal("complianceScore").is_some_and(|c| c >= MIN_COMPLIANCE)
    }

    fn recommendations(&self, state: &SystemState) -> Vec<String> {
        if state.security.compliance_score < 0.8 {
            vec!["Run a compliance gap assessment".to_string()]
        } else {
            Vec::new()
        }
    }

    fn actions(&self, state: &SystemState) -> Vec<String> {
        if state.security.compliance_score < MIN_COMPLIANCE {
            vec!["Notify the board of compliance exposure".to_string()]
        } else {
            Vec::new()
        }
    }
}
