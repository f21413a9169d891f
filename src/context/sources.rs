//! Context sources
//!
//! Each source reads one slice of the workspace and reports a section. A
//! failing source only empties its own section.

use super::model::{
    ActionableItem, ContextInsight, DaoSection, DatabaseInfo, EnterpriseSection, ProjectManifest,
    ResearchSection, WorkspaceSection,
};
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

const RECENT_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules", ".governance"];
const MAX_TOPICS: usize = 20;

/// One section's worth of data
#[derive(Debug, Clone)]
pub enum SourceData {
    Workspace(WorkspaceSection),
    Research(ResearchSection),
    Enterprise(EnterpriseSection),
    Dao(DaoSection),
    Databases(Vec<DatabaseInfo>),
    Insights {
        insights: Vec<ContextInsight>,
        actionable_items: Vec<ActionableItem>,
    },
}

#[async_trait]
pub trait ContextSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn collect(&self) -> Result<SourceData, AppError>;
}

/// The five workspace-backed sources rooted at `root`
pub fn workspace_sources(root: &Path) -> Vec<Box<dyn ContextSource>> {
    vec![
        Box::new(WorkspaceSource::new(root)),
        Box::new(ResearchSource::new(root)),
        Box::new(EnterpriseSource::new(root)),
        Box::new(DaoSource::new(root)),
        Box::new(DatabaseSource::new(root)),
    ]
}

// =============================================================================
// FILE WALKING
// =============================================================================

struct FileFacts {
    relative: PathBuf,
    metadata: Metadata,
}

impl FileFacts {
    fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    fn file_name(&self) -> &str {
        self.relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// True if any ancestor directory has one of `names`
    fn under_any(&self, names: &[&str]) -> bool {
        self.relative
            .parent()
            .map(|parent| {
                parent.components().any(|c| {
                    c.as_os_str()
                        .to_str()
                        .is_some_and(|s| names.contains(&s.to_lowercase().as_str()))
                })
            })
            .unwrap_or(false)
    }
}

fn list_files(root: &Path, max_depth: usize) -> Result<Vec<FileFacts>, AppError> {
    if !root.is_dir() {
        return Err(AppError::SourceUnavailable(format!(
            "{} is not a readable directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && e.file_name().to_str().is_some_and(|n| SKIPPED_DIRS.contains(&n)))
        });

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let relative = entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        files.push(FileFacts { relative, metadata });
    }

    Ok(files)
}

async fn walk(root: PathBuf, max_depth: usize) -> Result<Vec<FileFacts>, AppError> {
    tokio::task::spawn_blocking(move || list_files(&root, max_depth))
        .await
        .map_err(|e| AppError::Internal(format!("file walk task failed: {}", e)))?
}

// =============================================================================
// SOURCES
// =============================================================================

/// File inventory of the whole workspace
pub struct WorkspaceSource {
    root: PathBuf,
}

impl WorkspaceSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContextSource for WorkspaceSource {
    fn name(&self) -> &'static str {
        "workspace"
    }

    async fn collect(&self) -> Result<SourceData, AppError> {
        let files = walk(self.root.clone(), usize::MAX).await?;
        let now = SystemTime::now();

        let mut section = WorkspaceSection {
            root: self.root.display().to_string(),
            ..Default::default()
        };
        let mut top_directories = BTreeSet::new();

        for file in &files {
            section.total_files += 1;
            section.total_bytes += file.metadata.len();

            let recent = file
                .metadata
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .is_some_and(|age| age <= RECENT_WINDOW);
            if recent {
                section.recent_files += 1;
            }

            let ext = file.extension().unwrap_or_else(|| "none".to_string());
            *section.file_types.entry(ext).or_insert(0) += 1;

            let mut components = file.relative.components();
            if let (Some(first), Some(_)) = (components.next(), components.next()) {
                if let Some(dir) = first.as_os_str().to_str() {
                    top_directories.insert(dir.to_string());
                }
            }
        }

        section.top_directories = top_directories.into_iter().collect();
        Ok(SourceData::Workspace(section))
    }
}

/// Documents and notebooks under research-like directories
pub struct ResearchSource {
    root: PathBuf,
}

impl ResearchSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContextSource for ResearchSource {
    fn name(&self) -> &'static str {
        "research"
    }

    async fn collect(&self) -> Result<SourceData, AppError> {
        const DIRS: &[&str] = &["research", "docs", "papers", "notes"];
        let files = walk(self.root.clone(), usize::MAX).await?;

        let mut section = ResearchSection::default();
        let mut topics = BTreeSet::new();

        for file in files.iter().filter(|f| f.under_any(DIRS)) {
            match file.extension().as_deref() {
                Some("md") | Some("pdf") | Some("txt") | Some("rst") => {
                    section.documents += 1;
                    if let Some(stem) = file.relative.file_stem().and_then(|s| s.to_str()) {
                        topics.insert(stem.replace(['-', '_'], " "));
                    }
                }
                Some("ipynb") => section.notebooks += 1,
                _ => {}
            }
        }

        section.topics = topics.into_iter().take(MAX_TOPICS).collect();
        Ok(SourceData::Research(section))
    }
}

/// Project manifests found near the top of the workspace
pub struct EnterpriseSource {
    root: PathBuf,
}

impl EnterpriseSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContextSource for EnterpriseSource {
    fn name(&self) -> &'static str {
        "enterprise"
    }

    async fn collect(&self) -> Result<SourceData, AppError> {
        let files = walk(self.root.clone(), 3).await?;

        let projects = files
            .iter()
            .filter_map(|file| {
                let kind = match file.file_name() {
                    "Cargo.toml" => "cargo",
                    "package.json" => "npm",
                    "pyproject.toml" => "python",
                    "go.mod" => "go",
                    _ => return None,
                };
                let name = file
                    .relative
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .or_else(|| {
                        self.root
                            .canonicalize()
                            .ok()
                            .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
                    })
                    .unwrap_or_else(|| "workspace".to_string());
                Some(ProjectManifest {
                    name,
                    kind: kind.to_string(),
                    path: file.relative.display().to_string(),
                })
            })
            .collect();

        Ok(SourceData::Enterprise(EnterpriseSection { projects }))
    }
}

/// Governance records kept under `governance/` or `dao/`
pub struct DaoSource {
    root: PathBuf,
}

impl DaoSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContextSource for DaoSource {
    fn name(&self) -> &'static str {
        "dao"
    }

    async fn collect(&self) -> Result<SourceData, AppError> {
        let files = walk(self.root.clone(), usize::MAX).await?;

        let mut section = DaoSection::default();
        for file in files.iter().filter(|f| f.under_any(&["governance", "dao"])) {
            if !matches!(file.extension().as_deref(), Some("md" | "json" | "toml" | "yaml" | "yml")) {
                continue;
            }
            if file.file_name().to_lowercase().contains("proposal") {
                section.proposals += 1;
            }
            section.records.push(file.relative.display().to_string());
        }
        section.records.sort();

        Ok(SourceData::Dao(section))
    }
}

/// Embedded database files
pub struct DatabaseSource {
    root: PathBuf,
}

impl DatabaseSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContextSource for DatabaseSource {
    fn name(&self) -> &'static str {
        "databases"
    }

    async fn collect(&self) -> Result<SourceData, AppError> {
        let files = walk(self.root.clone(), usize::MAX).await?;

        let mut databases: Vec<DatabaseInfo> = files
            .iter()
            .filter_map(|file| {
                let kind = match file.extension().as_deref() {
                    Some("sqlite") | Some("sqlite3") => "sqlite",
                    Some("db") => "db",
                    _ => return None,
                };
                Some(DatabaseInfo {
                    name: file
                        .relative
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or_default()
                        .to_string(),
                    path: file.relative.display().to_string(),
                    size_bytes: file.metadata.len(),
                    kind: kind.to_string(),
                })
            })
            .collect();
        databases.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(SourceData::Databases(databases))
    }
}

/// Per-extension counts, used when summarizing a section for logs
pub fn summarize_types(section: &WorkspaceSection, top: usize) -> BTreeMap<String, u64> {
    let mut entries: Vec<_> = section.file_types.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(top)
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn seeded_workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("research")).unwrap();
        fs::create_dir_all(root.join("governance")).unwrap();
        fs::create_dir_all(root.join("services/api")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();

        fs::write(root.join("research/market-sizing.md"), "# notes").unwrap();
        fs::write(root.join("research/churn.ipynb"), "{}").unwrap();
        fs::write(root.join("governance/proposal-001.md"), "vote").unwrap();
        fs::write(root.join("governance/charter.toml"), "x = 1").unwrap();
        fs::write(root.join("services/api/Cargo.toml"), "[package]").unwrap();
        fs::write(root.join("services/api/app.sqlite"), vec![0u8; 64]).unwrap();
        fs::write(root.join("target/ignored.db"), "skip").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_workspace_inventory_skips_build_output() {
        let dir = seeded_workspace();
        let SourceData::Workspace(section) = WorkspaceSource::new(dir.path()).collect().await.unwrap() else {
            panic!("wrong section");
        };
        assert_eq!(section.total_files, 6);
        assert_eq!(section.file_types["md"], 2);
        assert_eq!(
            section.top_directories,
            vec!["governance", "research", "services"]
        );
    }

    #[tokio::test]
    async fn test_research_and_dao_sections() {
        let dir = seeded_workspace();

        let SourceData::Research(research) = ResearchSource::new(dir.path()).collect().await.unwrap() else {
            panic!("wrong section");
        };
        assert_eq!(research.documents, 1);
        assert_eq!(research.notebooks, 1);
        assert_eq!(research.topics, vec!["market sizing"]);

        let SourceData::Dao(dao) = DaoSource::new(dir.path()).collect().await.unwrap() else {
            panic!("wrong section");
        };
        assert_eq!(dao.proposals, 1);
        assert_eq!(dao.records.len(), 2);
    }

    #[tokio::test]
    async fn test_enterprise_and_databases() {
        let dir = seeded_workspace();

        let SourceData::Enterprise(enterprise) = EnterpriseSource::new(dir.path()).collect().await.unwrap() else {
            panic!("wrong section");
        };
        assert_eq!(enterprise.projects.len(), 1);
        assert_eq!(enterprise.projects[0].name, "api");
        assert_eq!(enterprise.projects[0].kind, "cargo");

        let SourceData::Databases(databases) = DatabaseSource::new(dir.path()).collect().await.unwrap() else {
            panic!("wrong section");
        };
        assert_eq!(databases.len(), 1);
        assert_eq!(databases[0].name, "app");
        assert_eq!(databases[0].size_bytes, 64);
    }

    #[tokio::test]
    async fn test_missing_root_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorkspaceSource::new(dir.path().join("gone")).collect().await.unwrap_err();
        assert!(matches!(err, AppError::SourceUnavailable(_)));
    }
}
