//! Persistence Module
//!
//! Where decisions and periodic performance metrics go. Writes are
//! best-effort: callers log failures and carry on.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::error::AppError;
use crate::models::DirectorDecision;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One periodic health sample taken by the metrics-report timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub health_score: f64,
    pub confidence: f64,
    pub domain_scores: BTreeMap<String, f64>,
    pub events_processed: u64,
    pub decisions_made: u64,
    pub queue_depth: usize,
}

#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn save_decision(&self, decision: &DirectorDecision) -> Result<(), AppError>;

    async fn save_performance_metrics(&self, metrics: &PerformanceMetrics) -> Result<(), AppError>;

    /// Most recent samples first
    async fn get_performance_history(&self, limit: usize) -> Result<Vec<PerformanceMetrics>, AppError>;

    fn backend(&self) -> &'static str;
}
