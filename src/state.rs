//! Application state management
//!
//! Shared handles the control surface delegates to. Built once in `main`.

use crate::context::ContextManager;
use crate::insights::{InsightLedger, RuleBasedInsights};
use crate::orchestrator::GovernanceOrchestrator;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    pub orchestrator: Arc<GovernanceOrchestrator>,
    pub context: Arc<ContextManager>,
    /// Latest recommendations from the insight loop
    pub insights: Arc<InsightLedger>,
    pub rules: Arc<RuleBasedInsights>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<GovernanceOrchestrator>,
        context: Arc<ContextManager>,
        insights: Arc<InsightLedger>,
        rules: Arc<RuleBasedInsights>,
    ) -> Self {
        Self {
            orchestrator,
            context,
            insights,
            rules,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
