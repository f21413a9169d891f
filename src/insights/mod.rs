//! Insight generation
//!
//! Recommendations derived from the current context. The generator is a
//! collaborator seam: a language-model backend can implement
//! [`InsightGenerator`]; [`RuleBasedInsights`] is the deterministic default.

pub mod ledger;
pub mod rules;

pub use ledger::{InsightLedger, InsightLoop};
pub use rules::RuleBasedInsights;

use crate::context::Context;
use crate::error::AppError;
use crate::models::{DirectorRole, EventType, Severity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Area a recommendation speaks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    General,
    Strategy,
    Operations,
    Finance,
    Compliance,
    Research,
}

impl FocusArea {
    /// Director expected to act on recommendations in this area
    pub fn owner(&self) -> Option<DirectorRole> {
        match self {
            FocusArea::General => None,
            FocusArea::Strategy => Some(DirectorRole::Strategy),
            FocusArea::Operations => Some(DirectorRole::Operations),
            FocusArea::Finance => Some(DirectorRole::Finance),
            FocusArea::Compliance => Some(DirectorRole::Legal),
            FocusArea::Research => Some(DirectorRole::Technology),
        }
    }

    /// Event raised when a recommendation in this area is escalated
    pub fn event_type(&self) -> EventType {
        match self {
            FocusArea::General => EventType::StakeholderRequest,
            FocusArea::Strategy => EventType::StrategicOpportunity,
            FocusArea::Operations => EventType::PerformanceDegradation,
            FocusArea::Finance => EventType::ResourceConstraint,
            FocusArea::Compliance => EventType::ComplianceViolation,
            FocusArea::Research => EventType::TechnologyDisruption,
        }
    }
}

/// Shape of the generated text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    /// One headline action per recommendation
    Executive,
    /// Every action step
    Technical,
    /// Only Medium priority and above
    Risk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub rule_id: String,
    pub title: String,
    pub summary: String,
    pub focus_area: FocusArea,
    pub priority: Severity,
    pub confidence: f64,
    pub action_items: Vec<String>,
}

#[async_trait]
pub trait InsightGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate_recommendations(
        &self,
        context: &Context,
        focus_area: FocusArea,
        template_type: TemplateType,
    ) -> Result<Vec<Recommendation>, AppError>;
}
