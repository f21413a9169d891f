//! Rule-based insight generator
//!
//! Fixed heuristics over the context sections. Used when no language-model
//! backend is configured, and in tests since its output is deterministic.

use super::{FocusArea, InsightGenerator, Recommendation, TemplateType};
use crate::context::Context;
use crate::error::AppError;
use crate::models::Severity;
use async_trait::async_trait;
use serde::Serialize;

const GIB: u64 = 1024 * 1024 * 1024;

/// Catalogue entry describing one heuristic
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRule {
    pub id: &'static str,
    pub name: &'static str,
    pub focus_area: FocusArea,
    pub enabled: bool,
}

pub struct RuleBasedInsights {
    rules: Vec<InsightRule>,
}

impl Default for RuleBasedInsights {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBasedInsights {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    pub fn list_rules(&self) -> &[InsightRule] {
        &self.rules
    }

    /// Every recommendation the enabled rules produce, highest priority first
    pub fn evaluate(&self, context: &Context) -> Vec<Recommendation> {
        let mut found: Vec<Recommendation> = [
            check_stalled_workspace(context),
            check_degraded_sources(context),
            check_open_proposals(context),
            check_research_corpus(context),
            check_database_footprint(context),
            check_missing_databases(context),
            check_project_sprawl(context),
        ]
        .into_iter()
        .flatten()
        .filter(|rec| self.is_enabled(&rec.rule_id))
        .collect();

        found.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.rule_id.cmp(&b.rule_id)));
        found
    }

    fn is_enabled(&self, rule_id: &str) -> bool {
        self.rules.iter().any(|r| r.id == rule_id && r.enabled)
    }
}

#[async_trait]
impl InsightGenerator for RuleBasedInsights {
    fn name(&self) -> &'static str {
        "rule-based"
    }

    async fn generate_recommendations(
        &self,
        context: &Context,
        focus_area: FocusArea,
        template_type: TemplateType,
    ) -> Result<Vec<Recommendation>, AppError> {
        let recommendations = self
            .evaluate(context)
            .into_iter()
            .filter(|rec| focus_area == FocusArea::General || rec.focus_area == focus_area)
            .filter_map(|rec| apply_template(rec, template_type))
            .collect();
        Ok(recommendations)
    }
}

fn apply_template(mut rec: Recommendation, template_type: TemplateType) -> Option<Recommendation> {
    match template_type {
        TemplateType::Executive => {
            rec.action_items.truncate(1);
            Some(rec)
        }
        TemplateType::Technical => Some(rec),
        TemplateType::Risk => (rec.priority >= Severity::Medium).then_some(rec),
    }
}

fn recommendation(
    rule_id: &str,
    title: &str,
    summary: String,
    focus_area: FocusArea,
    priority: Severity,
    confidence: f64,
    action_items: &[&str],
) -> Recommendation {
    Recommendation {
        rule_id: rule_id.to_string(),
        title: title.to_string(),
        summary,
        focus_area,
        priority,
        confidence,
        action_items: action_items.iter().map(|s| s.to_string()).collect(),
    }
}

// =============================================================================
// RULES
// =============================================================================

/// INS001: under 10% of files touched in the recency window
fn check_stalled_workspace(context: &Context) -> Option<Recommendation> {
    let ws = &context.content.workspace;
    if ws.total_files == 0 {
        return None;
    }
    let ratio = ws.recent_files as f64 / ws.total_files as f64;
    (ratio < 0.1).then(|| {
        recommendation(
            "INS001",
            "Workspace activity has stalled",
            format!(
                "Only {} of {} files changed in the last week",
                ws.recent_files, ws.total_files
            ),
            FocusArea::Operations,
            Severity::Medium,
            0.75,
            &["Confirm active workstreams have owners", "Archive inactive directories"],
        )
    })
}

/// INS002
fn check_degraded_sources(context: &Context) -> Option<Recommendation> {
    let degraded = &context.metadata.degraded_sources;
    if degraded.is_empty() {
        return None;
    }
    let priority = if degraded.len() >= 3 {
        Severity::Critical
    } else {
        Severity::High
    };
    Some(recommendation(
        "INS002",
        "Context sources are degraded",
        format!("Sections built without data: {}", degraded.join(", ")),
        FocusArea::Operations,
        priority,
        0.9,
        &["Restore access to the failing sources", "Force a context refresh once restored"],
    ))
}

/// INS003
fn check_open_proposals(context: &Context) -> Option<Recommendation> {
    let proposals = context.content.dao.proposals;
    if proposals == 0 {
        return None;
    }
    let priority = if proposals >= 5 {
        Severity::High
    } else {
        Severity::Medium
    };
    Some(recommendation(
        "INS003",
        "Governance proposals awaiting review",
        format!("{} proposal records found in governance directories", proposals),
        FocusArea::Compliance,
        priority,
        0.7,
        &["Schedule a review of open proposals", "Record outcomes next to each proposal"],
    ))
}

/// INS004
fn check_research_corpus(context: &Context) -> Option<Recommendation> {
    let research = &context.content.research;
    (research.documents + research.notebooks == 0).then(|| {
        recommendation(
            "INS004",
            "No research corpus",
            "No documents or notebooks found under research directories".to_string(),
            FocusArea::Research,
            Severity::Low,
            0.6,
            &["Capture findings under research/ or docs/"],
        )
    })
}

/// INS005: embedded databases above 1 GiB in total
fn check_database_footprint(context: &Context) -> Option<Recommendation> {
    let total: u64 = context.content.databases.iter().map(|d| d.size_bytes).sum();
    (total > GIB).then(|| {
        recommendation(
            "INS005",
            "Database footprint is growing",
            format!(
                "{} databases hold {:.1} GiB",
                context.content.databases.len(),
                total as f64 / GIB as f64
            ),
            FocusArea::Finance,
            Severity::Medium,
            0.7,
            &["Review retention for the largest databases", "Budget for storage growth"],
        )
    })
}

/// INS006
fn check_missing_databases(context: &Context) -> Option<Recommendation> {
    context.content.databases.is_empty().then(|| {
        recommendation(
            "INS006",
            "No persistent data stores discovered",
            "The workspace contains no database files".to_string(),
            FocusArea::Operations,
            Severity::Low,
            0.65,
            &["Verify data lives where the workspace scan can see it"],
        )
    })
}

/// INS007
fn check_project_sprawl(context: &Context) -> Option<Recommendation> {
    let projects = context.content.enterprise.projects.len();
    (projects > 10).then(|| {
        recommendation(
            "INS007",
            "Project sprawl",
            format!("{} project manifests in one workspace", projects),
            FocusArea::Strategy,
            Severity::Medium,
            0.7,
            &["Consolidate overlapping projects", "Retire unmaintained manifests"],
        )
    })
}

fn default_rules() -> Vec<InsightRule> {
    vec![
        InsightRule {
            id: "INS001",
            name: "Stalled workspace",
            focus_area: FocusArea::Operations,
            enabled: true,
        },
        InsightRule {
            id: "INS002",
            name: "Degraded context sources",
            focus_area: FocusArea::Operations,
            enabled: true,
        },
        InsightRule {
            id: "INS003",
            name: "Open governance proposals",
            focus_area: FocusArea::Compliance,
            enabled: true,
        },
        InsightRule {
            id: "INS004",
            name: "Missing research corpus",
            focus_area: FocusArea::Research,
            enabled: true,
        },
        InsightRule {
            id: "INS005",
            name: "Database footprint",
            focus_area: FocusArea::Finance,
            enabled: true,
        },
        InsightRule {
            id: "INS006",
            name: "No persistent data",
            focus_area: FocusArea::Operations,
            enabled: true,
        },
        InsightRule {
            id: "INS007",
            name: "Project sprawl",
            focus_area: FocusArea::Strategy,
            enabled: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::model::{ContextContent, DatabaseInfo};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn context(content: ContextContent, degraded: Vec<String>) -> Context {
        Context::build(1, Utc::now(), content, vec![], degraded)
    }

    fn busy_workspace() -> ContextContent {
        let mut content = ContextContent::default();
        content.workspace.root = "/srv/ws".into();
        content.workspace.total_files = 100;
        content.workspace.recent_files = 40;
        content.research.documents = 3;
        content.databases.push(DatabaseInfo {
            name: "app".into(),
            path: "app.db".into(),
            size_bytes: 4096,
            kind: "db".into(),
        });
        content
    }

    #[test]
    fn test_catalogue_lists_every_rule() {
        let insights = RuleBasedInsights::new();
        let ids: Vec<_> = insights.list_rules().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["INS001", "INS002", "INS003", "INS004", "INS005", "INS006", "INS007"]);
    }

    #[test]
    fn test_healthy_workspace_has_no_recommendations() {
        let insights = RuleBasedInsights::new();
        assert!(insights.evaluate(&context(busy_workspace(), vec![])).is_empty());
    }

    #[test]
    fn test_recommendations_sorted_by_priority() {
        let mut content = busy_workspace();
        content.workspace.recent_files = 2;
        content.dao.proposals = 6;

        let insights = RuleBasedInsights::new();
        let recs = insights.evaluate(&context(content, vec!["research".into()]));
        let ids: Vec<_> = recs.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["INS002", "INS003", "INS001"]);
        assert_eq!(recs[0].priority, Severity::High);
    }

    #[tokio::test]
    async fn test_focus_and_template_filtering() {
        let mut content = busy_workspace();
        content.workspace.recent_files = 0;
        content.research.documents = 0;
        let ctx = context(content, vec![]);
        let insights = RuleBasedInsights::new();

        let ops = insights
            .generate_recommendations(&ctx, FocusArea::Operations, TemplateType::Executive)
            .await
            .unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].rule_id, "INS001");
        assert_eq!(ops[0].action_items.len(), 1);

        let risk = insights
            .generate_recommendations(&ctx, FocusArea::General, TemplateType::Risk)
            .await
            .unwrap();
        assert!(risk.iter().all(|r| r.priority >= Severity::Medium));
        assert!(!risk.iter().any(|r| r.rule_id == "INS004"));
    }
}
