//! Insight ledger and feedback loop
//!
//! The ledger keeps the latest recommendations and feeds them back into the
//! context as the `insights` section. The loop periodically regenerates them
//! and turns new High/Critical recommendations into events.

use super::{FocusArea, InsightGenerator, Recommendation, TemplateType};
use crate::context::{ActionableItem, ContextInsight, ContextManager, ContextSource, SourceData};
use crate::error::AppError;
use crate::models::{EnvironmentalEvent, EventSource};
use crate::orchestrator::GovernanceOrchestrator;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Default)]
struct LedgerState {
    latest: Vec<Recommendation>,
    generated_at: Option<DateTime<Utc>>,
    /// Rule ids already raised as events while they keep recurring
    escalated: HashSet<String>,
}

#[derive(Default)]
pub struct InsightLedger {
    state: RwLock<LedgerState>,
}

impl InsightLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the latest set and returns the escalation-worthy ones not
    /// raised before. A rule that stops firing may be raised again later.
    pub fn record(&self, recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        let current: HashSet<String> = recommendations.iter().map(|r| r.rule_id.clone()).collect();
        state.escalated.retain(|id| current.contains(id));

        let mut fresh = Vec::new();
        for rec in &recommendations {
            if rec.priority.is_escalation_worthy() && state.escalated.insert(rec.rule_id.clone()) {
                fresh.push(rec.clone());
            }
        }

        state.latest = recommendations;
        state.generated_at = Some(Utc::now());
        fresh
    }

    pub fn latest(&self) -> Vec<Recommendation> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).latest.clone()
    }

    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).generated_at
    }

    /// Context source exposing this ledger as the insights section
    pub fn source(self: &Arc<Self>) -> Box<dyn ContextSource> {
        Box::new(LedgerSource(Arc::clone(self)))
    }
}

struct LedgerSource(Arc<InsightLedger>);

#[async_trait]
impl ContextSource for LedgerSource {
    fn name(&self) -> &'static str {
        "insights"
    }

    async fn collect(&self) -> Result<SourceData, AppError> {
        let latest = self.0.latest();

        let insights = latest
            .iter()
            .map(|rec| ContextInsight {
                title: rec.title.clone(),
                summary: rec.summary.clone(),
                priority: rec.priority,
                confidence: rec.confidence,
            })
            .collect();

        let actionable_items = latest
            .iter()
            .flat_map(|rec| {
                rec.action_items.iter().map(|action| ActionableItem {
                    title: action.clone(),
                    priority: rec.priority,
                    owner: rec.focus_area.owner(),
                })
            })
            .collect();

        Ok(SourceData::Insights {
            insights,
            actionable_items,
        })
    }
}

// =============================================================================
// LOOP
// =============================================================================

pub struct InsightLoop {
    generator: Arc<dyn InsightGenerator>,
    ledger: Arc<InsightLedger>,
    context: Arc<ContextManager>,
    orchestrator: Arc<GovernanceOrchestrator>,
}

impl InsightLoop {
    pub fn new(
        generator: Arc<dyn InsightGenerator>,
        ledger: Arc<InsightLedger>,
        context: Arc<ContextManager>,
        orchestrator: Arc<GovernanceOrchestrator>,
    ) -> Self {
        Self {
            generator,
            ledger,
            context,
            orchestrator,
        }
    }

    /// One generation pass over the context, rebuilt first if its TTL has
    /// expired. Returns how many events were injected.
    pub async fn run_once(&self) -> Result<usize, AppError> {
        let view = self.context.get_context().await?;
        if let Some(reason) = &view.stale_reason {
            warn!("Generating insights from stale context {}: {}", view.context.version(), reason);
        }
        let context = view.context;
        let recommendations = self
            .generator
            .generate_recommendations(&context, FocusArea::General, TemplateType::Technical)
            .await?;
        debug!(
            "{} produced {} recommendations from context {}",
            self.generator.name(),
            recommendations.len(),
            context.version()
        );

        let fresh = self.ledger.record(recommendations);
        for rec in &fresh {
            let event = EnvironmentalEvent::new(
                rec.focus_area.event_type(),
                rec.priority,
                EventSource::Insight,
                rec.title.clone(),
            )
            .with_metadata("ruleId", serde_json::json!(rec.rule_id))
            .with_metadata("summary", serde_json::json!(rec.summary));

            info!("💡 Escalating insight {} ({})", rec.rule_id, rec.priority);
            self.orchestrator.inject_event(event).await;
        }

        Ok(fresh.len())
    }

    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    warn!("⚠️  Insight generation failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContextConfig, Settings};
    use crate::context::model::WorkspaceSection;
    use crate::insights::RuleBasedInsights;
    use crate::models::Severity;
    use crate::persistence::MemoryStore;
    use pretty_assertions::assert_eq;

    fn rec(rule_id: &str, priority: Severity) -> Recommendation {
        Recommendation {
            rule_id: rule_id.to_string(),
            title: format!("{} title", rule_id),
            summary: "summary".into(),
            focus_area: FocusArea::Finance,
            priority,
            confidence: 0.8,
            action_items: vec!["Cut spend".into(), "Extend runway".into()],
        }
    }

    #[test]
    fn test_record_escalates_once_while_recurring() {
        let ledger = InsightLedger::new();

        let fresh = ledger.record(vec![rec("INS005", Severity::High), rec("INS004", Severity::Low)]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].rule_id, "INS005");

        assert!(ledger.record(vec![rec("INS005", Severity::High)]).is_empty());

        // Cleared, then back again
        ledger.record(vec![]);
        assert_eq!(ledger.record(vec![rec("INS005", Severity::High)]).len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_source_builds_insight_section() {
        let ledger = Arc::new(InsightLedger::new());
        ledger.record(vec![rec("INS005", Severity::Medium)]);

        let SourceData::Insights {
            insights,
            actionable_items,
        } = ledger.source().collect().await.unwrap()
        else {
            panic!("wrong section");
        };
        assert_eq!(insights.len(), 1);
        assert_eq!(actionable_items.len(), 2);
        assert_eq!(actionable_items[0].owner, Some(crate::models::DirectorRole::Finance));
    }

    struct Workspace;

    #[async_trait]
    impl ContextSource for Workspace {
        fn name(&self) -> &'static str {
            "workspace"
        }

        async fn collect(&self) -> Result<SourceData, AppError> {
            Ok(SourceData::Workspace(WorkspaceSection {
                root: "/srv/ws".into(),
                total_files: 10,
                recent_files: 5,
                ..Default::default()
            }))
        }
    }

    struct Offline;

    #[async_trait]
    impl ContextSource for Offline {
        fn name(&self) -> &'static str {
            "dao"
        }

        async fn collect(&self) -> Result<SourceData, AppError> {
            Err(AppError::SourceUnavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_high_priority_insights_become_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.workspace.root = dir.path().to_path_buf();
        settings.context = ContextConfig {
            cache_dir: dir.path().join("cache"),
            backup_dir: dir.path().join("backups"),
            ..Default::default()
        };

        let orchestrator = Arc::new(GovernanceOrchestrator::new(&settings, Arc::new(MemoryStore::new())));
        let ledger = Arc::new(InsightLedger::new());
        let context = Arc::new(
            ContextManager::open(
                &settings.context,
                vec![Box::new(Workspace), Box::new(Offline), ledger.source()],
            )
            .await,
        );
        let insights = InsightLoop::new(
            Arc::new(RuleBasedInsights::new()),
            Arc::clone(&ledger),
            context,
            Arc::clone(&orchestrator),
        );

        // Degraded dao source raises INS002 at High
        assert_eq!(insights.run_once().await.unwrap(), 1);
        assert_eq!(insights.run_once().await.unwrap(), 0);

        let metrics = orchestrator.get_metrics().await;
        assert_eq!(metrics.events_received, 1);
        assert_eq!(metrics.queue_depth, 1);
        assert!(ledger.latest().iter().any(|r| r.rule_id == "INS002"));
    }

    #[tokio::test]
    async fn test_run_once_sees_context_rebuilt_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.workspace.root = dir.path().to_path_buf();
        settings.context = ContextConfig {
            ttl_secs: 1,
            cache_dir: dir.path().join("cache"),
            backup_dir: dir.path().join("backups"),
            ..Default::default()
        };

        let orchestrator = Arc::new(GovernanceOrchestrator::new(&settings, Arc::new(MemoryStore::new())));
        let ledger = Arc::new(InsightLedger::new());
        let context = Arc::new(
            ContextManager::open(
                &settings.context,
                vec![Box::new(Workspace), Box::new(Offline), ledger.source()],
            )
            .await,
        );
        let insights = InsightLoop::new(
            Arc::new(RuleBasedInsights::new()),
            Arc::clone(&ledger),
            Arc::clone(&context),
            orchestrator,
        );

        insights.run_once().await.unwrap();
        let first = context.current().unwrap();
        assert_eq!(first.version(), "2.0.1");
        assert!(first.content.insights.is_empty());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        insights.run_once().await.unwrap();

        // The rebuilt context carries the recommendations recorded last pass
        let second = context.current().unwrap();
        assert_eq!(second.version(), "2.0.2");
        assert!(!second.content.insights.is_empty());
        assert_eq!(second.content.insights.len(), ledger.latest().len());
    }
}
