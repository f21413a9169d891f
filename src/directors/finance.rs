//! Finance director
//!
//! Financial viability gate: a decision is only endorsed while runway stays
//! above three months and the budget is not exhausted.

use super::{signals, DecisionDraft, DirectorPolicy};
use crate::models::{
    DirectorDecision, DirectorRole, Domain, EnvironmentalEvent, EventType, SystemState,
};

const MIN_RUNWAY_MONTHS: f64 = 3.0;
const MAX_BUDGET_UTILIZATION: f64 = 0.95;

pub struct FinancePolicy;

impl DirectorPolicy for FinancePolicy {
    fn role(&self) -> DirectorRole {
        DirectorRole::Finance
    }

    fn expertise(&self) -> &'static [&'static str] {
        &["budgeting", "forecasting", "cost_control", "treasury"]
    }

    fn authorities(&self) -> &'static [&'static str] {
        &["approve_budget", "freeze_spending", "reallocate_funds"]
    }

    fn focus(&self) -> &'static [EventType] {
        &[
            EventType::ResourceConstraint,
            EventType::MarketShift,
            EventType::StrategicOpportunity,
        ]
    }

    fn domain_weights(&self) -> &'static [(Domain, f64)] {
        &[
            (Domain::Financial, 0.6),
            (Domain::Operational, 0.2),
            (Domain::Strategic, 0.2),
        ]
    }

    fn draft(&self, state: &SystemState, event: &EnvironmentalEvent) -> DecisionDraft {
        let fin = &state.financial;

        let decision = if fin.runway_months < MIN_RUNWAY_MONTHS {
            "Freeze discretionary spending"
        } else {
            match event.event_type {
                EventType::StrategicOpportunity if fin.budget_utilization < 0.8 => {
                    "Release contingency funds for the opportunity"
                }
                EventType::ResourceConstraint => "Reforecast and reallocate within current budget",
                EventType::MarketShift => "Stress-test revenue forecast",
                _ => "No budget change",
            }
        };

        DecisionDraft {
            decision: decision.to_string(),
            rationale: format!(
                "Runway {:.1} months, budget utilization {:.2}, revenue growth {:+.1}%",
                fin.runway_months,
                fin.budget_utilization,
                fin.revenue_growth * 100.0
            ),
            scope: vec!["finance".into()],
            consequences: vec!["Spending envelope updated".into()],
            mitigation: vec!["Monthly variance review".into()],
            signals: signals(&[
                ("runwayMonths", fin.runway_months),
                ("budgetUtilization", fin.budget_utilization),
                ("costEfficiency", fin.cost_efficiency),
            ]),
        }
    }

    fn domain_gate(&self, decision: &DirectorDecision) -> bool {
        let runway_ok = decision
            .signal("runwayMonths")
            .is_some_and(|r| r >= MIN_RUNWAY_MONTHS);
        let budget_ok = decision
            .signal("budgetUtilization")
            .is_some_and(|b| b <= MAX_BUDGET_UTILIZATION);
        runway_ok && budget_ok
    }

    fn recommendations(&self, state: &SystemState) -> Vec<String> {
        let fin = &state.financial;
        let mut out = Vec::new();
        if fin.runway_months < 12.0 {
            out.push("Open fundraising or revenue acceleration track".to_string());
        }
        if fin.budget_utilization > 0.9 {
            out.push("Review commitments before the period closes".to_string());
        }
        if fin.cost_efficiency < 0.6 {
            out.push("Consolidate overlapping vendors".to_string());
        }
        out
    }

    fn actions(&self, state: &SystemState) -> Vec<String> {
        if state.financial.runway_months < MIN_RUNWAY_MONTHS {
            vec!["Freeze discretionary spending".to_string()]
        } else {
            Vec::new()
        }
    }
}
