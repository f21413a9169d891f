//! Technology director

use super::{signals, DecisionDraft, DirectorPolicy};
use crate::models::{
    DirectorDecision, DirectorRole, Domain, EnvironmentalEvent, EventType, Severity, SystemState,
};

const MAX_SYSTEM_LOAD: f64 = 0.85;
const MAX_THREAT_LEVEL: f64 = 0.8;

pub struct TechnologyPolicy;

impl DirectorPolicy for TechnologyPolicy {
    fn role(&self) -> DirectorRole {
        DirectorRole::Technology
    }

    fn expertise(&self) -> &'static [&'static str] {
        &["architecture", "platform_reliability", "security_engineering", "data_systems"]
    }

    fn authorities(&self) -> &'static [&'static str] {
        &["approve_architecture", "rotate_credentials", "rollback_release"]
    }

    fn focus(&self) -> &'static [EventType] {
        &[
            EventType::TechnologyDisruption,
            EventType::SecurityIncident,
            EventType::PerformanceDegradation,
        ]
    }

    fn domain_weights(&self) -> &'static [(Domain, f64)] {
        &[
            (Domain::Reliability, 0.4),
            (Domain::Security, 0.4),
            (Domain::Research, 0.2),
        ]
    }

    fn draft(&self, state: &SystemState, event: &EnvironmentalEvent) -> DecisionDraft {
        let load = state.reliability.system_load;
        let threat = state.security.threat_level;
        let feasibility = ((1.0 - load) + (1.0 - threat)) / 2.0;

        let decision = match event.event_type {
            EventType::SecurityIncident if event.severity >= Severity::High => {
                "Isolate affected systems and rotate credentials"
            }
            EventType::SecurityIncident => "Patch and monitor the affected surface",
            EventType::TechnologyDisruption => "Spike an evaluation of the disrupting technology",
            EventType::PerformanceDegradation => "Profile hot paths and roll back recent releases if needed",
            _ => "No technical change required",
        };

        DecisionDraft {
            decision: decision.to_string(),
            rationale: format!(
                "Technical feasibility {:.2} (load {:.2}, threat {:.2}, uptime {:.3})",
                feasibility, load, threat, state.reliability.uptime
            ),
            scope: vec!["platform".into(), "security".into()],
            consequences: vec!["Engineering capacity reallocated".into()],
            mitigation: vec!["Post-incident review within 48h".into()],
            signals: signals(&[
                ("systemLoad", load),
                ("threatLevel", threat),
                ("technicalFeasibility", feasibility),
            ]),
        }
    }

    fn domain_gate(&self, decision: &DirectorDecision) -> bool {
        match (decision.signal("systemLoad"), decision.signal("threatLevel")) {
            (Some(load), Some(threat)) => load <= MAX_SYSTEM_LOAD && threat <= MAX_THREAT_LEVEL,
            _ => false,
        }
    }

    fn recommendations(&self, state: &SystemState) -> Vec<String> {
        let mut out = Vec::new();
        if state.security.vulnerability_count > 0.0 {
            out.push(format!(
                "Remediate {} open vulnerabilities",
                state.security.vulnerability_count as u64
            ));
        }
        if state.reliability.uptime < 0.99 {
            out.push("Add redundancy to the least available service".to_string());
        }
        out
    }

    fn actions(&self, state: &SystemState) -> Vec<String> {
        if state.security.threat_level > MAX_THREAT_LEVEL {
            vec!["Enable heightened intrusion detection".to_string()]
        } else {
            Vec::new()
        }
    }
}
