//! Metrics Collector
//!
//! Turns raw workspace observations (file inventory, database files, host
//! memory, process uptime) into a [`SystemState`]. Collection never fails:
//! any source error yields the conservative fallback state.

use crate::error::AppError;
use crate::models::{
    clamp_unit, OperationalMetrics, ReliabilityMetrics, ResearchMetrics, StrategicMetrics,
    SystemState, LIVE_CONFIDENCE,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use sysinfo::System;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Files modified within this window count as recent
const RECENT_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Database bytes at which the data set counts as mature
const MATURE_DATA_BYTES: f64 = 100.0 * 1024.0 * 1024.0;

const DATABASE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules", ".governance"];

/// Raw counts gathered from one collection pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceObservation {
    pub total_files: u64,
    pub recent_files: u64,
    pub db_count: u64,
    pub db_bytes: u64,
    pub memory_used: u64,
    pub memory_total: u64,
    pub uptime_secs: u64,
}

pub struct MetricsCollector {
    workspace_root: PathBuf,
    started_at: Instant,
    system: Mutex<System>,
}

impl MetricsCollector {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            started_at: Instant::now(),
            system: Mutex::new(System::new()),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Live state, or the fallback when any source is unavailable
    pub async fn collect(&self) -> SystemState {
        match self.try_collect().await {
            Ok(observation) => {
                debug!(
                    files = observation.total_files,
                    recent = observation.recent_files,
                    databases = observation.db_count,
                    "Collected workspace observation"
                );
                fold(&observation)
            }
            Err(e) => {
                warn!("Metrics collection failed, using fallback state: {}", e);
                SystemState::fallback()
            }
        }
    }

    pub async fn try_collect(&self) -> Result<WorkspaceObservation, AppError> {
        let root = self.workspace_root.clone();
        let metadata = tokio::fs::metadata(&root).await.map_err(|e| {
            AppError::SourceUnavailable(format!("workspace {}: {}", root.display(), e))
        })?;
        if !metadata.is_dir() {
            return Err(AppError::SourceUnavailable(format!(
                "workspace {} is not a directory",
                root.display()
            )));
        }

        let scan = tokio::task::spawn_blocking(move || scan_workspace(&root))
            .await
            .map_err(|e| AppError::Internal(format!("workspace scan task failed: {}", e)))??;

        let (memory_used, memory_total) = {
            let mut sys = self.system.lock().await;
            sys.refresh_memory();
            (sys.used_memory(), sys.total_memory())
        };

        Ok(WorkspaceObservation {
            memory_used,
            memory_total,
            uptime_secs: self.started_at.elapsed().as_secs(),
            ..scan
        })
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn is_database(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DATABASE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn scan_workspace(root: &Path) -> Result<WorkspaceObservation, AppError> {
    let mut observation = WorkspaceObservation::default();
    let now = SystemTime::now();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            // An unreadable root is a source failure; unreadable children are not
            Err(e) if e.depth() == 0 => {
                return Err(AppError::SourceUnavailable(format!("workspace scan: {}", e)))
            }
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };

        observation.total_files += 1;

        let recent = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age <= RECENT_WINDOW);
        if recent {
            observation.recent_files += 1;
        }

        if is_database(entry.path()) {
            observation.db_count += 1;
            observation.db_bytes += metadata.len();
        }
    }

    Ok(observation)
}

/// Fixed normalization rules from raw observation to domain blocks
pub fn fold(observation: &WorkspaceObservation) -> SystemState {
    let base = SystemState::fallback();

    let memory_ratio = if observation.memory_total > 0 {
        observation.memory_used as f64 / observation.memory_total as f64
    } else {
        0.5
    };
    let load = memory_ratio.clamp(0.1, 0.9);

    let velocity = if observation.total_files > 0 {
        observation.recent_files as f64 / observation.total_files as f64
    } else {
        0.0
    };
    let knowledge = (observation.total_files as f64 / 1000.0).min(1.0);
    let maturity = (observation.db_bytes as f64 / MATURE_DATA_BYTES).min(1.0);
    let uptime_factor = (observation.uptime_secs as f64 / 3600.0 / 24.0).min(1.0);

    SystemState {
        operational: OperationalMetrics {
            efficiency: clamp_unit(1.0 - load * 0.5),
            throughput: clamp_unit(0.5 + velocity * 0.5),
            resource_utilization: load,
            capacity: clamp_unit((1.0 - load) * 0.7 + maturity * 0.3),
        },
        strategic: StrategicMetrics {
            goal_progress: clamp_unit(0.4 + velocity * 0.4),
            innovation_index: clamp_unit(0.4 + velocity * 0.6),
            ..base.strategic
        },
        financial: base.financial,
        research: ResearchMetrics {
            velocity,
            knowledge_base_size: knowledge,
            publication_rate: clamp_unit((velocity + knowledge) / 2.0),
            experiment_success: clamp_unit(0.5 + maturity * 0.5),
        },
        security: base.security,
        reliability: ReliabilityMetrics {
            uptime: clamp_unit(0.95 + 0.05 * uptime_factor),
            system_load: load,
            ..base.reliability
        },
        timestamp: Utc::now(),
        confidence: LIVE_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FALLBACK_CONFIDENCE;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_inaccessible_workspace_returns_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let collector = MetricsCollector::new(&missing);
        let state = collector.collect().await;

        assert_eq!(state.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(state.operational, SystemState::fallback().operational);
    }

    #[tokio::test]
    async fn test_file_root_is_not_a_workspace() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let collector = MetricsCollector::new(file.path());
        assert!(collector.try_collect().await.is_err());
        assert_eq!(collector.collect().await.confidence, FALLBACK_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_live_collection_counts_files_and_databases() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "hello").unwrap();
        std::fs::write(dir.path().join("store.sqlite"), vec![0u8; 2048]).unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("HEAD"), "ref").unwrap();

        let collector = MetricsCollector::new(dir.path());
        let observation = collector.try_collect().await.unwrap();
        assert_eq!(observation.total_files, 2);
        assert_eq!(observation.recent_files, 2);
        assert_eq!(observation.db_count, 1);
        assert_eq!(observation.db_bytes, 2048);

        let state = collector.collect().await;
        assert_eq!(state.confidence, LIVE_CONFIDENCE);
        assert_eq!(state.research.velocity, 1.0);
    }

    #[test]
    fn test_load_is_clamped_to_band() {
        let idle = fold(&WorkspaceObservation {
            memory_used: 0,
            memory_total: 100,
            ..Default::default()
        });
        assert_eq!(idle.reliability.system_load, 0.1);

        let saturated = fold(&WorkspaceObservation {
            memory_used: 100,
            memory_total: 100,
            ..Default::default()
        });
        assert_eq!(saturated.reliability.system_load, 0.9);
        assert_eq!(saturated.operational.resource_utilization, 0.9);
    }

    #[test]
    fn test_fold_normalization() {
        let state = fold(&WorkspaceObservation {
            total_files: 2000,
            recent_files: 500,
            db_count: 2,
            db_bytes: 200 * 1024 * 1024,
            memory_used: 50,
            memory_total: 100,
            uptime_secs: 48 * 3600,
        });

        assert_eq!(state.research.velocity, 0.25);
        assert_eq!(state.research.knowledge_base_size, 1.0);
        assert_eq!(state.research.experiment_success, 1.0);
        assert!((state.reliability.uptime - 1.0).abs() < 1e-9);
        assert_eq!(state.reliability.system_load, 0.5);
    }

    #[test]
    fn test_empty_workspace_has_zero_velocity() {
        let state = fold(&WorkspaceObservation::default());
        assert_eq!(state.research.velocity, 0.0);
        assert_eq!(state.reliability.uptime, 0.95);
    }
}
