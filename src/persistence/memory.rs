//! In-memory decision store
//!
//! Default backend when no database url is configured. History is bounded so a
//! long-running process does not grow without limit.

use super::{DecisionStore, PerformanceMetrics};
use crate::error::AppError;
use crate::models::DirectorDecision;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::debug;

const MAX_DECISIONS: usize = 10_000;
const MAX_SAMPLES: usize = 1_000;

pub struct MemoryStore {
    decisions: RwLock<VecDeque<DirectorDecision>>,
    samples: RwLock<VecDeque<PerformanceMetrics>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            decisions: RwLock::new(VecDeque::new()),
            samples: RwLock::new(VecDeque::new()),
        }
    }

    /// Saved decisions in arrival order
    pub async fn decisions(&self) -> Vec<DirectorDecision> {
        self.decisions.read().await.iter().cloned().collect()
    }

    pub async fn decision_count(&self) -> usize {
        self.decisions.read().await.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionStore for MemoryStore {
    async fn save_decision(&self, decision: &DirectorDecision) -> Result<(), AppError> {
        let mut decisions = self.decisions.write().await;
        if decisions.len() >= MAX_DECISIONS {
            decisions.pop_front();
        }
        decisions.push_back(decision.clone());
        debug!(
            "Saved decision {} from {} (valid: {})",
            decision.id, decision.director_role, decision.valid
        );
        Ok(())
    }

    async fn save_performance_metrics(&self, metrics: &PerformanceMetrics) -> Result<(), AppError> {
        let mut samples = self.samples.write().await;
        if samples.len() >= MAX_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(metrics.clone());
        Ok(())
    }

    async fn get_performance_history(&self, limit: usize) -> Result<Vec<PerformanceMetrics>, AppError> {
        let samples = self.samples.read().await;
        Ok(samples.iter().rev().take(limit).cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn sample(health: f64) -> PerformanceMetrics {
        PerformanceMetrics {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            health_score: health,
            confidence: 0.9,
            domain_scores: BTreeMap::new(),
            events_processed: 0,
            decisions_made: 0,
            queue_depth: 0,
        }
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let store = MemoryStore::new();
        for health in [0.1, 0.2, 0.3] {
            store.save_performance_metrics(&sample(health)).await.unwrap();
        }

        let history = store.get_performance_history(2).await.unwrap();
        let scores: Vec<f64> = history.iter().map(|s| s.health_score).collect();
        assert_eq!(scores, vec![0.3, 0.2]);
    }

    #[tokio::test]
    async fn test_samples_are_bounded() {
        let store = MemoryStore::new();
        for _ in 0..(MAX_SAMPLES + 5) {
            store.save_performance_metrics(&sample(0.5)).await.unwrap();
        }
        let history = store.get_performance_history(usize::MAX).await.unwrap();
        assert_eq!(history.len(), MAX_SAMPLES);
    }
}
