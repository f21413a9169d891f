//! Context validation
//!
//! Rule-based checks over a freshly built context. Any error-severity issue
//! rejects the refresh; warnings only lower the score.

use super::model::{Context, FORMAT_VERSION};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub rule_id: String,
    pub field: String,
    pub severity: IssueSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Completeness in [0,1], 0 when invalid
    pub score: f64,
    pub issues: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

pub struct ContextValidator;

impl ContextValidator {
    pub fn validate(context: &Context) -> ValidationResult {
        let mut found = Vec::new();

        found.extend(Self::check_version(context));
        found.extend(Self::check_format(context));
        found.extend(Self::check_checksum(context));
        found.extend(Self::check_workspace_root(context));
        found.extend(Self::check_degraded_sources(context));
        found.extend(Self::check_empty_sections(context));

        let (issues, warnings): (Vec<_>, Vec<_>) = found
            .into_iter()
            .partition(|i| i.severity == IssueSeverity::Error);

        let is_valid = issues.is_empty();
        let score = if is_valid {
            (context.content.completeness() - 0.05 * warnings.len() as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };

        ValidationResult {
            is_valid,
            score,
            issues,
            warnings,
        }
    }

    /// CTX001: version string is `major.minor.sequence`
    fn check_version(context: &Context) -> Option<ValidationIssue> {
        (!VERSION_PATTERN.is_match(&context.metadata.version)).then(|| {
            issue(
                "CTX001",
                "metadata.version",
                IssueSeverity::Error,
                format!("Malformed version '{}'", context.metadata.version),
            )
        })
    }

    /// CTX002
    fn check_format(context: &Context) -> Option<ValidationIssue> {
        (context.metadata.format_version != FORMAT_VERSION).then(|| {
            issue(
                "CTX002",
                "metadata.formatVersion",
                IssueSeverity::Error,
                format!(
                    "Unsupported format version '{}' (expected {})",
                    context.metadata.format_version, FORMAT_VERSION
                ),
            )
        })
    }

    /// CTX003: content has not changed since the checksum was taken
    fn check_checksum(context: &Context) -> Option<ValidationIssue> {
        (context.metadata.checksum != context.content.checksum()).then(|| {
            issue(
                "CTX003",
                "metadata.checksum",
                IssueSeverity::Error,
                "Checksum does not match content".to_string(),
            )
        })
    }

    /// CTX004
    fn check_workspace_root(context: &Context) -> Option<ValidationIssue> {
        context.content.workspace.root.trim().is_empty().then(|| {
            issue(
                "CTX004",
                "workspace.root",
                IssueSeverity::Error,
                "Workspace root is required".to_string(),
            )
        })
    }

    /// CTX005: `next` must come strictly after `previous` in both sequence and time.
    /// Checked when a build is installed over the current context.
    pub fn check_succession(previous: &Context, next: &Context) -> Option<ValidationIssue> {
        let prev = &previous.metadata;
        let meta = &next.metadata;
        if meta.sequence <= prev.sequence {
            return Some(issue(
                "CTX005",
                "metadata.sequence",
                IssueSeverity::Error,
                format!("Sequence {} does not follow {}", meta.sequence, prev.sequence),
            ));
        }
        (meta.generated_at <= prev.last_updated).then(|| {
            issue(
                "CTX005",
                "metadata.generatedAt",
                IssueSeverity::Error,
                format!(
                    "Generated at {} but {} was last updated at {}",
                    meta.generated_at.to_rfc3339(),
                    previous.version(),
                    prev.last_updated.to_rfc3339()
                ),
            )
        })
    }

    /// CTX006: one warning per failed source
    fn check_degraded_sources(context: &Context) -> Vec<ValidationIssue> {
        context
            .metadata
            .degraded_sources
            .iter()
            .map(|source| {
                issue(
                    "CTX006",
                    source,
                    IssueSeverity::Warning,
                    format!("Source '{}' unavailable; section left empty", source),
                )
            })
            .collect()
    }

    /// CTX007
    fn check_empty_sections(context: &Context) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        if context.content.workspace.total_files == 0 {
            out.push(issue(
                "CTX007",
                "workspace",
                IssueSeverity::Warning,
                "Workspace contains no files".to_string(),
            ));
        }
        if context.content.databases.is_empty() {
            out.push(issue(
                "CTX007",
                "databases",
                IssueSeverity::Warning,
                "No databases discovered".to_string(),
            ));
        }
        out
    }
}

fn issue(rule_id: &str, field: &str, severity: IssueSeverity, message: String) -> ValidationIssue {
    ValidationIssue {
        rule_id: rule_id.to_string(),
        field: field.to_string(),
        severity,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::model::{ContextContent, DatabaseInfo};
    use chrono::Utc;

    fn populated() -> ContextContent {
        let mut content = ContextContent::default();
        content.workspace.root = "/srv/workspace".to_string();
        content.workspace.total_files = 12;
        content.databases.push(DatabaseInfo {
            name: "ledger".into(),
            path: "ledger.db".into(),
            size_bytes: 1024,
            kind: "db".into(),
        });
        content
    }

    #[test]
    fn test_well_formed_context_is_valid() {
        let context = Context::build(3, Utc::now(), populated(), vec!["workspace".into()], vec![]);
        let result = ContextValidator::validate(&context);
        assert!(result.is_valid);
        assert!(result.issues.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.score, 0.4);
    }

    #[test]
    fn test_missing_root_rejects() {
        let mut content = populated();
        content.workspace.root.clear();
        let context = Context::build(1, Utc::now(), content, vec![], vec![]);

        let result = ContextValidator::validate(&context);
        assert!(!result.is_valid);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.issues[0].rule_id, "CTX004");
    }

    #[test]
    fn test_tampered_content_fails_checksum() {
        let mut context = Context::build(1, Utc::now(), populated(), vec![], vec![]);
        context.content.workspace.total_files += 1;
        let result = ContextValidator::validate(&context);
        assert!(result.issues.iter().any(|i| i.rule_id == "CTX003"));
    }

    #[test]
    fn test_malformed_version_rejected() {
        let mut context = Context::build(1, Utc::now(), populated(), vec![], vec![]);
        context.metadata.version = "v2".to_string();
        let result = ContextValidator::validate(&context);
        assert!(!result.is_valid);
        assert_eq!(result.issues[0].rule_id, "CTX001");
    }

    #[test]
    fn test_succession_requires_newer_sequence_and_time() {
        let now = Utc::now();
        let earlier = Context::build(4, now, populated(), vec![], vec![]);
        let later = Context::build(5, now + chrono::Duration::seconds(1), populated(), vec![], vec![]);

        assert!(ContextValidator::check_succession(&earlier, &later).is_none());

        let backwards = ContextValidator::check_succession(&later, &earlier).unwrap();
        assert_eq!(backwards.rule_id, "CTX005");
        assert_eq!(backwards.field, "metadata.sequence");

        let same_instant = Context::build(6, later.metadata.last_updated, populated(), vec![], vec![]);
        let clock = ContextValidator::check_succession(&later, &same_instant).unwrap();
        assert_eq!(clock.field, "metadata.generatedAt");
    }

    #[test]
    fn test_degraded_sources_only_warn() {
        let context = Context::build(1, Utc::now(), populated(), vec![], vec!["dao".into()]);
        let result = ContextValidator::validate(&context);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert!((result.score - 0.35).abs() < 1e-9);
    }
}
