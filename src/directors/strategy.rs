//! Strategy director

use super::{signals, DecisionDraft, DirectorPolicy};
use crate::models::{
    DirectorDecision, DirectorRole, Domain, EnvironmentalEvent, EventType, SystemState,
};

pub struct StrategyPolicy;

impl DirectorPolicy for StrategyPolicy {
    fn role(&self) -> DirectorRole {
        DirectorRole::Strategy
    }

    fn expertise(&self) -> &'static [&'static str] {
        &["market_analysis", "competitive_positioning", "long_range_planning", "innovation"]
    }

    fn authorities(&self) -> &'static [&'static str] {
        &["set_strategic_goals", "approve_initiatives", "reprioritize_roadmap"]
    }

    fn focus(&self) -> &'static [EventType] {
        &[
            EventType::MarketShift,
            EventType::StrategicOpportunity,
            EventType::TechnologyDisruption,
        ]
    }

    fn domain_weights(&self) -> &'static [(Domain, f64)] {
        &[
            (Domain::Strategic, 0.6),
            (Domain::Research, 0.2),
            (Domain::Financial, 0.2),
        ]
    }

    fn draft(&self, state: &SystemState, event: &EnvironmentalEvent) -> DecisionDraft {
        let strategic = &state.strategic;

        let decision = match event.event_type {
            EventType::StrategicOpportunity if strategic.innovation_index >= 0.5 => {
                "Pursue opportunity through a scoped initiative"
            }
            EventType::StrategicOpportunity => "Park opportunity until innovation capacity recovers",
            EventType::MarketShift | EventType::TechnologyDisruption => {
                "Re-evaluate positioning against the shift"
            }
            _ => "Hold course; monitor strategic indicators",
        };

        DecisionDraft {
            decision: decision.to_string(),
            rationale: format!(
                "Vision alignment {:.2}, goal progress {:.2}, market position {:.2}",
                strategic.vision_alignment, strategic.goal_progress, strategic.market_position
            ),
            scope: vec!["strategy".into(), "roadmap".into()],
            consequences: vec!["Roadmap priorities may shift".into()],
            mitigation: vec!["Review impact at next planning cycle".into()],
            signals: signals(&[
                ("visionAlignment", strategic.vision_alignment),
                ("goalProgress", strategic.goal_progress),
                ("innovationIndex", strategic.innovation_index),
            ]),
        }
    }

    fn domain_gate(&self, decision: &DirectorDecision) -> bool {
        decision.signal("visionAlignment").is_some_and(|v| v >= 0.5)
    }

    fn recommendations(&self, state: &SystemState) -> Vec<String> {
        let s = &state.strategic;
        let mut out = Vec::new();
        if s.goal_progress < 0.5 {
            out.push("Cut the goal set to the three highest-leverage objectives".to_string());
        }
        if s.innovation_index < 0.5 {
            out.push("Reserve capacity for exploratory work".to_string());
        }
        if s.market_position < 0.5 {
            out.push("Commission a competitive positioning review".to_string());
        }
        out
    }

    fn actions(&self, state: &SystemState) -> Vec<String> {
        if state.strategic.vision_alignment < 0.5 {
            vec!["Re-publish vision statement to all teams".to_string()]
        } else {
            Vec::new()
        }
    }
}
