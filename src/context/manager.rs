//! Context manager
//!
//! Owns the current context and the refresh pipeline:
//! cache check, backup, rebuild, validate, install, persist, metrics.
//!
//! A single `AtomicBool` guards the pipeline. Non-forced refreshes that find
//! it taken return [`RefreshOutcome::Busy`]; forced ones run anyway. Sequence
//! and timestamp are allocated together, and a build only replaces the
//! installed context if it is newer, so overlapping refreshes can finish in
//! any order.

use super::diff::{ContextChange, ContextDiffEngine};
use super::model::{Context, ContextContent};
use super::sources::{summarize_types, ContextSource, SourceData};
use super::store::ContextStore;
use super::validation::{ContextValidator, ValidationResult};
use crate::config::ContextConfig;
use crate::error::AppError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// =============================================================================
// RESULT TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUpdate {
    pub context: Arc<Context>,
    pub changes: Vec<ContextChange>,
    pub validation: ValidationResult,
    pub from_cache: bool,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RefreshOutcome {
    Updated(ContextUpdate),
    /// Validation failed; the previous context is still current
    Rejected {
        reason: String,
        validation: ValidationResult,
    },
    Busy,
    /// A newer build was installed while this one ran
    Superseded { current: Arc<Context> },
}

/// Context handed to readers, with whether the TTL refresh actually succeeded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextView {
    pub context: Arc<Context>,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_reason: Option<String>,
}

impl ContextView {
    fn fresh(context: Arc<Context>) -> Self {
        Self {
            context,
            stale: false,
            stale_reason: None,
        }
    }

    fn stale(context: Arc<Context>, reason: String) -> Self {
        Self {
            context,
            stale: true,
            stale_reason: Some(reason),
        }
    }
}

/// Rolling refresh statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetrics {
    pub refreshes: u64,
    pub rejections: u64,
    pub cache_hits: u64,
    pub size_bytes: usize,
    pub data_points: usize,
    pub last_processing_ms: u64,
    pub avg_processing_ms: f64,
    pub validation_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh_at: Option<DateTime<Utc>>,
}

impl ContextMetrics {
    fn record_refresh(&mut self, context: &Context, validation: &ValidationResult, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        self.refreshes += 1;
        self.size_bytes = context.size_bytes();
        self.data_points = context.content.data_points();
        self.last_processing_ms = ms;
        self.avg_processing_ms += (ms as f64 - self.avg_processing_ms) / self.refreshes as f64;
        self.validation_score = validation.score;
        self.last_refresh_at = Some(context.metadata.last_updated);
    }
}

struct Current {
    context: Arc<Context>,
    validation: ValidationResult,
}

/// Last sequence and timestamp handed out
#[derive(Default)]
struct Stamp {
    sequence: u64,
    at: Option<DateTime<Utc>>,
}

/// Clears the refresh flag on drop, but only for the holder that set it
struct RefreshGuard<'a> {
    flag: &'a AtomicBool,
    owned: bool,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if self.owned {
            self.flag.store(false, Ordering::Release);
        }
    }
}

// =============================================================================
// MANAGER
// =============================================================================

pub struct ContextManager {
    sources: Vec<Box<dyn ContextSource>>,
    store: ContextStore,
    ttl: Duration,
    backup_enabled: bool,
    current: RwLock<Option<Current>>,
    clock: Mutex<Stamp>,
    /// Sequence of the context last written to the cache file
    persisted: tokio::sync::Mutex<u64>,
    refreshing: AtomicBool,
    metrics: Mutex<ContextMetrics>,
}

impl ContextManager {
    /// Builds the manager and adopts the on-disk cache if it still validates
    pub async fn open(config: &ContextConfig, sources: Vec<Box<dyn ContextSource>>) -> Self {
        let manager = Self {
            sources,
            store: ContextStore::new(&config.cache_dir, &config.backup_dir, config.max_backups),
            ttl: config.ttl(),
            backup_enabled: config.backup_enabled,
            current: RwLock::new(None),
            clock: Mutex::new(Stamp::default()),
            persisted: tokio::sync::Mutex::new(0),
            refreshing: AtomicBool::new(false),
            metrics: Mutex::new(ContextMetrics::default()),
        };

        match manager.store.load_cache().await {
            Ok(Some(context)) => {
                let validation = ContextValidator::validate(&context);
                if validation.is_valid {
                    info!("📂 Loaded cached context {}", context.version());
                    *manager.clock.lock().unwrap_or_else(|e| e.into_inner()) = Stamp {
                        sequence: context.metadata.sequence,
                        at: Some(context.metadata.last_updated),
                    };
                    *manager.persisted.lock().await = context.metadata.sequence;
                    *manager.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Current {
                        context: Arc::new(context),
                        validation,
                    });
                } else {
                    warn!(
                        "Ignoring cached context {}: {} validation issues",
                        context.version(),
                        validation.issues.len()
                    );
                }
            }
            Ok(None) => debug!("No cached context at {}", manager.store.cache_path().display()),
            Err(e) => warn!("⚠️  Could not read context cache: {}", e),
        }

        manager
    }

    /// Current context without triggering a refresh
    pub fn current(&self) -> Option<Arc<Context>> {
        self.read_current().as_ref().map(|c| Arc::clone(&c.context))
    }

    /// Context for readers. Served from cache inside the TTL, rebuilt once it
    /// has expired. If the rebuild cannot complete the last good context is
    /// returned marked stale; with no context at all the failure is an error.
    pub async fn get_context(&self) -> Result<ContextView, AppError> {
        let (reason, error) = match self.refresh_context(false).await {
            RefreshOutcome::Updated(update) => return Ok(ContextView::fresh(update.context)),
            RefreshOutcome::Superseded { current } => return Ok(ContextView::fresh(current)),
            RefreshOutcome::Rejected { reason, .. } => (
                format!("refresh rejected: {}", reason),
                AppError::Validation(reason),
            ),
            RefreshOutcome::Busy => (
                "refresh in progress".to_string(),
                AppError::Conflict("Context is being built; retry shortly".to_string()),
            ),
        };

        match self.current() {
            Some(context) => {
                warn!("⏳ Serving stale context {} ({})", context.version(), reason);
                Ok(ContextView::stale(context, reason))
            }
            None => Err(error),
        }
    }

    pub fn metrics(&self) -> ContextMetrics {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub async fn refresh_context(&self, force: bool) -> RefreshOutcome {
        if !force {
            if let Some(update) = self.cached_update() {
                self.metrics.lock().unwrap_or_else(|e| e.into_inner()).cache_hits += 1;
                debug!("Context {} served from cache", update.context.version());
                return RefreshOutcome::Updated(update);
            }
        }

        let owned = self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !owned && !force {
            debug!("Context refresh already in progress");
            return RefreshOutcome::Busy;
        }
        let _guard = RefreshGuard {
            flag: &self.refreshing,
            owned,
        };

        let started = Instant::now();

        if self.backup_enabled {
            if let Some(prev) = self.current() {
                if let Err(e) = self.store.backup(&prev).await {
                    warn!("⚠️  Context backup failed: {}", e);
                }
            }
        }

        let (content, sources, degraded) = self.rebuild().await;
        let (sequence, generated_at) = self.next_stamp();
        let context = Context::build(sequence, generated_at, content, sources, degraded);

        let validation = ContextValidator::validate(&context);
        if !validation.is_valid {
            let reason = validation
                .issues
                .iter()
                .map(|i| format!("{}: {}", i.rule_id, i.message))
                .collect::<Vec<_>>()
                .join("; ");
            warn!("❌ Context {} rejected: {}", context.version(), reason);
            self.metrics.lock().unwrap_or_else(|e| e.into_inner()).rejections += 1;
            return RefreshOutcome::Rejected { reason, validation };
        }

        let context = Arc::new(context);
        let changes = match self.install(Arc::clone(&context), validation.clone()) {
            Ok(changes) => changes,
            Err(current) => {
                debug!(
                    "Context {} superseded by {}",
                    context.version(),
                    current.version()
                );
                return RefreshOutcome::Superseded { current };
            }
        };

        self.persist(&context).await;

        let elapsed = started.elapsed();
        self.metrics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record_refresh(&context, &validation, elapsed);

        let summary = ContextDiffEngine::summarize(&changes);
        info!(
            version = %context.version(),
            score = validation.score,
            changes = changes.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "🔄 Context refreshed"
        );
        debug!(
            "Context {} diff {:?}, top file types {:?}",
            context.version(),
            summary,
            summarize_types(&context.content.workspace, 5)
        );

        RefreshOutcome::Updated(ContextUpdate {
            refreshed_at: context.metadata.last_updated,
            context,
            changes,
            validation,
            from_cache: false,
        })
    }

    fn read_current(&self) -> std::sync::RwLockReadGuard<'_, Option<Current>> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Sequence and timestamp both strictly increase, even within one clock tick
    fn next_stamp(&self) -> (u64, DateTime<Utc>) {
        let mut clock = self.clock.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let at = match clock.at {
            Some(last) if now <= last => last + ChronoDuration::milliseconds(1),
            _ => now,
        };
        clock.sequence += 1;
        clock.at = Some(at);
        (clock.sequence, at)
    }

    /// Installs `context` if it succeeds the current one, diffing against
    /// whatever is current at that moment. Returns the newer context otherwise.
    fn install(&self, context: Arc<Context>, validation: ValidationResult) -> Result<Vec<ContextChange>, Arc<Context>> {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = current.as_ref().map(|c| Arc::clone(&c.context));

        if let Some(prev) = &previous {
            if ContextValidator::check_succession(prev, &context).is_some() {
                return Err(Arc::clone(prev));
            }
        }

        let changes = ContextDiffEngine::diff(previous.as_deref(), &context);
        *current = Some(Current { context, validation });
        Ok(changes)
    }

    /// Writes the cache unless a newer context has already been written
    async fn persist(&self, context: &Context) {
        let mut persisted = self.persisted.lock().await;
        if context.metadata.sequence <= *persisted {
            return;
        }
        match self.store.save_cache(context).await {
            Ok(()) => *persisted = context.metadata.sequence,
            Err(e) => warn!("⚠️  Could not persist context cache: {}", e),
        }
    }

    fn cached_update(&self) -> Option<ContextUpdate> {
        let guard = self.read_current();
        let current = guard.as_ref()?;
        let age = Utc::now().signed_duration_since(current.context.metadata.last_updated);
        let ttl = ChronoDuration::from_std(self.ttl).unwrap_or(ChronoDuration::MAX);
        (age < ttl).then(|| ContextUpdate {
            context: Arc::clone(&current.context),
            changes: Vec::new(),
            validation: current.validation.clone(),
            from_cache: true,
            refreshed_at: current.context.metadata.last_updated,
        })
    }

    async fn rebuild(&self) -> (ContextContent, Vec<String>, Vec<String>) {
        let mut content = ContextContent::default();
        let mut sources = Vec::with_capacity(self.sources.len());
        let mut degraded = Vec::new();

        for source in &self.sources {
            match source.collect().await {
                Ok(data) => {
                    apply(&mut content, data);
                    sources.push(source.name().to_string());
                }
                Err(e) => {
                    warn!("⚠️  Context source '{}' unavailable: {}", source.name(), e);
                    degraded.push(source.name().to_string());
                }
            }
        }

        (content, sources, degraded)
    }
}

fn apply(content: &mut ContextContent, data: SourceData) {
    match data {
        SourceData::Workspace(section) => content.workspace = section,
        SourceData::Research(section) => content.research = section,
        SourceData::Enterprise(section) => content.enterprise = section,
        SourceData::Dao(section) => content.dao = section,
        SourceData::Databases(databases) => content.databases = databases,
        SourceData::Insights {
            insights,
            actionable_items,
        } => {
            content.insights = insights;
            content.actionable_items = actionable_items;
        }
    }
}
