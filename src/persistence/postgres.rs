//! PostgreSQL decision store
//!
//! Keeps the full record as a JSONB payload next to a few indexed columns.

use super::{DecisionStore, PerformanceMetrics};
use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::models::DirectorDecision;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS governance_decisions (
    id UUID PRIMARY KEY,
    director_role TEXT NOT NULL,
    event_id UUID NOT NULL,
    valid BOOLEAN NOT NULL,
    confidence DOUBLE PRECISION NOT NULL,
    decided_at TIMESTAMPTZ NOT NULL,
    payload JSONB NOT NULL
);
CREATE INDEX IF NOT EXISTS governance_decisions_event_idx ON governance_decisions (event_id);
CREATE TABLE IF NOT EXISTS governance_performance (
    id UUID PRIMARY KEY,
    recorded_at TIMESTAMPTZ NOT NULL,
    health_score DOUBLE PRECISION NOT NULL,
    payload JSONB NOT NULL
);
"#;

pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    /// Builds the pool, checks connectivity and ensures the tables exist
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| AppError::Config("database.url is not set".to_string()))?;

        let mut cfg = Config::new();
        cfg.url = Some(url);
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(config.max_pool_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::Config(format!("Failed to create pool: {}", e)))?;

        let client = pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        drop(client);

        info!("🗄️  Decision store connected (pool size {})", config.max_pool_size);
        Ok(Self { pool })
    }
}

#[async_trait]
impl DecisionStore for PostgresStore {
    async fn save_decision(&self, decision: &DirectorDecision) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let payload = serde_json::to_value(decision)?;
        client
            .execute(
                "INSERT INTO governance_decisions
                    (id, director_role, event_id, valid, confidence, decided_at, payload)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (id) DO NOTHING",
                &[
                    &decision.id,
                    &decision.director_role.as_str(),
                    &decision.event_id,
                    &decision.valid,
                    &decision.confidence,
                    &decision.timestamp,
                    &payload,
                ],
            )
            .await?;
        Ok(())
    }

    async fn save_performance_metrics(&self, metrics: &PerformanceMetrics) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let payload = serde_json::to_value(metrics)?;
        client
            .execute(
                "INSERT INTO governance_performance (id, recorded_at, health_score, payload)
                 VALUES ($1, $2, $3, $4)",
                &[&metrics.id, &metrics.recorded_at, &metrics.health_score, &payload],
            )
            .await?;
        Ok(())
    }

    async fn get_performance_history(&self, limit: usize) -> Result<Vec<PerformanceMetrics>, AppError> {
        let client = self.pool.get().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = client
            .query(
                "SELECT payload FROM governance_performance ORDER BY recorded_at DESC LIMIT $1",
                &[&limit],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let payload: serde_json::Value = row.get(0);
                serde_json::from_value(payload).map_err(AppError::from)
            })
            .collect()
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
