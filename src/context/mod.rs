//! Versioned workspace context
//!
//! Sources feed a [`ContextManager`] which builds, validates, diffs and caches
//! immutable [`Context`] snapshots.

pub mod diff;
pub mod manager;
pub mod model;
pub mod sources;
pub mod store;
pub mod validation;

pub use diff::{ChangeImpact, ChangeType, ContextChange, ContextDiffEngine};
pub use manager::{ContextManager, ContextMetrics, ContextUpdate, ContextView, RefreshOutcome};
pub use model::{ActionableItem, Context, ContextInsight};
pub use sources::{workspace_sources, ContextSource, SourceData};
pub use validation::{ContextValidator, ValidationResult};
