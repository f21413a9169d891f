//! Chair of the board: arbitration and strategic alignment

use super::{signals, DecisionDraft, DirectorPolicy};
use crate::models::{
    DirectorDecision, DirectorRole, Domain, EnvironmentalEvent, EventType, Severity, SystemState,
};

const MIN_STRATEGIC_ALIGNMENT: f64 = 0.5;

pub struct ChairPolicy;

impl DirectorPolicy for ChairPolicy {
    fn role(&self) -> DirectorRole {
        DirectorRole::Chair
    }

    fn expertise(&self) -> &'static [&'static str] {
        &["governance", "board_coordination", "stakeholder_relations", "strategic_alignment"]
    }

    fn authorities(&self) -> &'static [&'static str] {
        &["convene_board", "final_arbitration", "appoint_directors", "approve_strategy"]
    }

    fn focus(&self) -> &'static [EventType] {
        &[
            EventType::StakeholderRequest,
            EventType::StrategicOpportunity,
            EventType::MarketShift,
        ]
    }

    fn domain_weights(&self) -> &'static [(Domain, f64)] {
        &[
            (Domain::Strategic, 0.4),
            (Domain::Operational, 0.2),
            (Domain::Financial, 0.2),
            (Domain::Reliability, 0.2),
        ]
    }

    fn draft(&self, state: &SystemState, event: &EnvironmentalEvent) -> DecisionDraft {
        let alignment = state.domain_score(Domain::Strategic);

        let decision = match event.severity {
            Severity::Critical => "Convene emergency board session",
            Severity::High => "Direct a board-level response",
            _ if alignment < MIN_STRATEGIC_ALIGNMENT => "Request strategic realignment review",
            _ => "Delegate to the accountable director",
        };

        DecisionDraft {
            decision: decision.to_string(),
            rationale: format!(
                "{} at {} severity with strategic alignment {:.2} and overall health {:.2}",
                event.event_type,
                event.severity,
                alignment,
                state.health_score()
            ),
            scope: vec!["board".into(), "strategy".into()],
            consequences: vec![format!("Board attention directed to {}", event.event_type)],
            mitigation: vec!["Record resolution in board minutes".into()],
            signals: signals(&[
                ("strategicAlignment", alignment),
                ("healthScore", state.health_score()),
            ]),
        }
    }

    fn domain_gate(&self, decision: &DirectorDecision) -> bool {
        decision
            .signal("strategicAlignment")
            .is_some_and(|alignment| alignment >= MIN_STRATEGIC_ALIGNMENT)
    }

    fn recommendations(&self, state: &SystemState) -> Vec<String> {
        let mut out = Vec::new();
        if state.domain_score(Domain::Strategic) < 0.6 {
            out.push("Schedule a strategy offsite to restore alignment".to_string());
        }
        if state.confidence < 0.85 {
            out.push("Board is working from degraded metrics; request a fresh collection".to_string());
        }
        out
    }

    fn actions(&self, state: &SystemState) -> Vec<String> {
        if state.health_score() < 0.5 {
            vec!["Open standing crisis agenda item".to_string()]
        } else {
            Vec::new()
        }
    }
}
