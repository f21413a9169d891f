//! Context diff engine
//!
//! Structural comparison of two contexts. Metadata is skipped since version,
//! timestamps and checksum differ on every rebuild.

use super::model::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

const VOLATILE_KEYS: &[&str] = &["metadata"];
const SENSITIVE_SECTIONS: &[&str] = &["insights", "actionableItems"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeImpact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextChange {
    pub change_type: ChangeType,
    /// Dotted path, e.g. `workspace.fileTypes.md` or `databases[0]`
    pub path: String,
    pub impact: ChangeImpact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_impact: Option<ChangeImpact>,
}

pub struct ContextDiffEngine;

impl ContextDiffEngine {
    /// Changes from `previous` to `next`; with no previous context every
    /// section counts as added.
    pub fn diff(previous: Option<&Context>, next: &Context) -> Vec<ContextChange> {
        let after = strip_volatile(serde_json::to_value(next).unwrap_or(Value::Null));
        let before = match previous {
            Some(prev) => strip_volatile(serde_json::to_value(prev).unwrap_or(Value::Null)),
            None => Value::Object(Default::default()),
        };

        let mut changes = Vec::new();
        compare("", &before, &after, &mut changes);
        changes
    }

    pub fn summarize(changes: &[ContextChange]) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for change in changes {
            match change.change_type {
                ChangeType::Added => summary.added += 1,
                ChangeType::Modified => summary.modified += 1,
                ChangeType::Removed => summary.removed += 1,
            }
        }
        summary.highest_impact = changes.iter().map(|c| c.impact).max();
        summary
    }
}

fn strip_volatile(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        for key in VOLATILE_KEYS {
            map.remove(*key);
        }
    }
    value
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn top_level(path: &str) -> &str {
    path.split(['.', '[']).next().unwrap_or(path)
}

fn classify(change_type: ChangeType, path: &str) -> ChangeImpact {
    let is_section = !path.contains(['.', '[']);
    match change_type {
        ChangeType::Removed if is_section => ChangeImpact::High,
        ChangeType::Removed => ChangeImpact::Medium,
        ChangeType::Modified if SENSITIVE_SECTIONS.contains(&top_level(path)) => ChangeImpact::Medium,
        ChangeType::Modified => ChangeImpact::Low,
        ChangeType::Added => ChangeImpact::Low,
    }
}

fn record(
    changes: &mut Vec<ContextChange>,
    change_type: ChangeType,
    path: String,
    before: Option<&Value>,
    after: Option<&Value>,
) {
    changes.push(ContextChange {
        change_type,
        impact: classify(change_type, &path),
        path,
        before: before.cloned(),
        after: after.cloned(),
    });
}

fn compare(path: &str, before: &Value, after: &Value, changes: &mut Vec<ContextChange>) {
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
            for key in keys {
                let child = join(path, key);
                match (old.get(key), new.get(key)) {
                    (Some(a), Some(b)) => compare(&child, a, b, changes),
                    (None, Some(b)) => record(changes, ChangeType::Added, child, None, Some(b)),
                    (Some(a), None) => record(changes, ChangeType::Removed, child, Some(a), None),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            for i in 0..old.len().max(new.len()) {
                let child = format!("{}[{}]", path, i);
                match (old.get(i), new.get(i)) {
                    (Some(a), Some(b)) => compare(&child, a, b, changes),
                    (None, Some(b)) => record(changes, ChangeType::Added, child, None, Some(b)),
                    (Some(a), None) => record(changes, ChangeType::Removed, child, Some(a), None),
                    (None, None) => {}
                }
            }
        }
        (a, b) if a != b => record(changes, ChangeType::Modified, path.to_string(), Some(a), Some(b)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::model::{ContextContent, ContextInsight, DatabaseInfo};
    use crate::models::Severity;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn context(sequence: u64, content: ContextContent) -> Context {
        Context::build(sequence, Utc::now(), content, vec![], vec![])
    }

    #[test]
    fn test_rebuild_without_changes_is_empty() {
        let a = context(1, ContextContent::default());
        let b = context(2, ContextContent::default());
        assert!(ContextDiffEngine::diff(Some(&a), &b).is_empty());
    }

    #[test]
    fn test_first_build_adds_every_section() {
        let changes = ContextDiffEngine::diff(None, &context(1, ContextContent::default()));
        assert_eq!(changes.len(), 7);
        assert!(changes.iter().all(|c| c.change_type == ChangeType::Added));
        assert!(changes.iter().all(|c| c.impact == ChangeImpact::Low));
    }

    #[test]
    fn test_classification() {
        let mut before = ContextContent::default();
        before.workspace.total_files = 10;
        before.insights.push(ContextInsight {
            title: "Runway".into(),
            summary: "short".into(),
            priority: Severity::High,
            confidence: 0.8,
        });
        before.databases.push(DatabaseInfo {
            name: "a".into(),
            path: "a.db".into(),
            size_bytes: 1,
            kind: "db".into(),
        });

        let mut after = before.clone();
        after.workspace.total_files = 11;
        after.insights[0].summary = "critical".into();
        after.databases.clear();

        let changes = ContextDiffEngine::diff(Some(&context(1, before)), &context(2, after));
        let find = |path: &str| changes.iter().find(|c| c.path == path).unwrap();

        assert_eq!(find("workspace.totalFiles").impact, ChangeImpact::Low);
        assert_eq!(find("insights[0].summary").impact, ChangeImpact::Medium);
        assert_eq!(find("databases[0]").change_type, ChangeType::Removed);
        assert_eq!(find("databases[0]").impact, ChangeImpact::Medium);

        let summary = ContextDiffEngine::summarize(&changes);
        assert_eq!(summary.modified, 2);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.highest_impact, Some(ChangeImpact::Medium));
    }

    #[test]
    fn test_removed_section_is_high_impact() {
        assert_eq!(classify(ChangeType::Removed, "dao"), ChangeImpact::High);
        assert_eq!(classify(ChangeType::Added, "dao"), ChangeImpact::Low);
    }
}
