//! Context data model
//!
//! A versioned aggregate of everything the workspace sources report. Each
//! refresh builds a new value; a published context is never mutated.

use crate::models::{DirectorRole, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Schema version of the context document
pub const FORMAT_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    pub format_version: String,
    /// `<format_version>.<sequence>`
    pub version: String,
    pub sequence: u64,
    pub generated_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// sha256 over the content sections
    pub checksum: String,
    /// Sources that contributed to this build
    pub sources: Vec<String>,
    /// Sources that failed and left their section empty
    #[serde(default)]
    pub degraded_sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSection {
    pub root: String,
    pub total_files: u64,
    pub recent_files: u64,
    pub total_bytes: u64,
    /// File count by lowercase extension
    pub file_types: BTreeMap<String, u64>,
    pub top_directories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSection {
    pub documents: u64,
    pub notebooks: u64,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    pub name: String,
    /// cargo, npm, python, go
    pub kind: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterpriseSection {
    pub projects: Vec<ProjectManifest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaoSection {
    pub proposals: u64,
    pub records: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInsight {
    pub title: String,
    pub summary: String,
    pub priority: Severity,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionableItem {
    pub title: String,
    pub priority: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<DirectorRole>,
}

/// Content sections, everything except metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextContent {
    pub workspace: WorkspaceSection,
    pub research: ResearchSection,
    pub enterprise: EnterpriseSection,
    pub dao: DaoSection,
    pub databases: Vec<DatabaseInfo>,
    pub insights: Vec<ContextInsight>,
    pub actionable_items: Vec<ActionableItem>,
}

impl ContextContent {
    pub fn checksum(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Number of individual facts carried by the sections
    pub fn data_points(&self) -> usize {
        self.workspace.file_types.len()
            + self.workspace.top_directories.len()
            + self.research.topics.len()
            + self.enterprise.projects.len()
            + self.dao.records.len()
            + self.databases.len()
            + self.insights.len()
            + self.actionable_items.len()
    }

    /// Share of the five source sections that carry data
    pub fn completeness(&self) -> f64 {
        let populated = [
            self.workspace.total_files > 0,
            self.research.documents + self.research.notebooks > 0,
            !self.enterprise.projects.is_empty(),
            !self.dao.records.is_empty(),
            !self.databases.is_empty(),
        ];
        populated.iter().filter(|p| **p).count() as f64 / populated.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub metadata: ContextMetadata,
    #[serde(flatten)]
    pub content: ContextContent,
}

impl Context {
    pub fn build(
        sequence: u64,
        generated_at: DateTime<Utc>,
        content: ContextContent,
        sources: Vec<String>,
        degraded_sources: Vec<String>,
    ) -> Self {
        Self {
            metadata: ContextMetadata {
                format_version: FORMAT_VERSION.to_string(),
                version: format!("{}.{}", FORMAT_VERSION, sequence),
                sequence,
                generated_at,
                last_updated: generated_at,
                checksum: content.checksum(),
                sources,
                degraded_sources,
            },
            content,
        }
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Serialized size in bytes
    pub fn size_bytes(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_carries_format_and_sequence() {
        let context = Context::build(7, Utc::now(), ContextContent::default(), vec![], vec![]);
        assert_eq!(context.version(), "2.0.7");
        assert_eq!(context.metadata.format_version, FORMAT_VERSION);
    }

    #[test]
    fn test_checksum_tracks_content() {
        let mut content = ContextContent::default();
        let empty = content.checksum();
        content.dao.records.push("proposal-001.md".to_string());
        assert_ne!(content.checksum(), empty);
        assert_eq!(empty.len(), 64);
    }

    #[test]
    fn test_sections_flatten_next_to_metadata() {
        let context = Context::build(1, Utc::now(), ContextContent::default(), vec![], vec![]);
        let json = serde_json::to_value(&context).unwrap();
        assert!(json.get("metadata").is_some());
        assert!(json.get("workspace").is_some());
        assert!(json.get("actionableItems").is_some());
    }

    #[test]
    fn test_completeness() {
        let mut content = ContextContent::default();
        assert_eq!(content.completeness(), 0.0);
        content.workspace.total_files = 3;
        content.databases.push(DatabaseInfo {
            name: "app".into(),
            path: "app.db".into(),
            size_bytes: 10,
            kind: "sqlite".into(),
        });
        assert_eq!(content.completeness(), 0.4);
    }
}
