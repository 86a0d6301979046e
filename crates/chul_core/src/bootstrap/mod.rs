//! Reference-data bootstrap loader.
//!
//! # Responsibility
//! - Resolve the configured fixture entries into concrete files.
//! - Upsert every fixture by natural key inside one transaction.
//!
//! # Invariants
//! - Entries that match no file are skipped, not reported as errors.
//! - Any failure rolls back the whole batch; there is no partial success.
//! - Re-running over the same files never duplicates rows.
//! - Tracked catalog models are validated and get a revision per upsert.

mod fixture;
mod models;

use crate::repo::RepoError;
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixture entries loaded when no override is configured.
pub const DEFAULT_BOOTSTRAP_FILES: &[&str] = &[
    "data/data/counties.json",
    "data/data/constituencies.json",
    "data/data/facility_owners.json",
    "data/data/service_categories.json",
    "data/data/job_titles.json",
];

/// Where the loader looks for fixtures.
///
/// Each entry is joined onto `base_dir`; it is read directly when it names an
/// existing file and expanded as a glob pattern otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub base_dir: PathBuf,
    pub files: Vec<String>,
}

impl BootstrapConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            files: DEFAULT_BOOTSTRAP_FILES
                .iter()
                .map(|entry| entry.to_string())
                .collect(),
        }
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of one bootstrap run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Files loaded, in load order.
    pub files: Vec<PathBuf>,
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to read fixture `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed fixture `{}`: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid fixture pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to expand fixture pattern: {0}")]
    Glob(#[from] glob::GlobError),
    #[error("fixture `{}` names unknown model `{model}`", .path.display())]
    UnknownModel { path: PathBuf, model: String },
    #[error("model `{model}` has no field `{column}`")]
    UnknownColumn { model: &'static str, column: String },
    #[error("model `{model}` field `{field}` references missing row {lookup}")]
    UnresolvedReference {
        model: &'static str,
        field: &'static str,
        lookup: String,
    },
    #[error("invalid fixture `{}`: {message}", .path.display())]
    InvalidFixture { path: PathBuf, message: String },
    #[error("{0}")]
    Db(#[from] rusqlite::Error),
    #[error("{0}")]
    Record(#[from] RepoError),
}

/// Loads all configured fixtures into the registry tables.
///
/// # Errors
/// Propagates the first read, parse, mapping or constraint failure after
/// rolling back everything loaded so far.
pub fn run_bootstrap(
    conn: &Connection,
    config: &BootstrapConfig,
) -> Result<BootstrapReport, BootstrapError> {
    let sources = resolve_sources(config)?;
    info!(
        "event=bootstrap module=bootstrap status=start base_dir={} files={}",
        config.base_dir.display(),
        sources.len()
    );

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut report = BootstrapReport::default();
    for path in sources {
        let fixture = fixture::read_fixture(&path)?;
        let outcome = fixture::apply_fixture(&tx, &path, &fixture)?;
        debug!(
            "event=bootstrap_file module=bootstrap status=ok path={} model={} inserted={} updated={}",
            path.display(),
            fixture.model,
            outcome.inserted,
            outcome.updated
        );
        report.inserted += outcome.inserted;
        report.updated += outcome.updated;
        report.files.push(path);
    }
    tx.commit()?;

    info!(
        "event=bootstrap module=bootstrap status=ok files={} inserted={} updated={}",
        report.files.len(),
        report.inserted,
        report.updated
    );
    Ok(report)
}

/// Expands configured entries into existing files, keeping entry order.
pub fn resolve_sources(config: &BootstrapConfig) -> Result<Vec<PathBuf>, BootstrapError> {
    let mut sources = Vec::new();
    for entry in &config.files {
        let candidate = config.base_dir.join(entry);
        if candidate.is_file() {
            sources.push(candidate);
            continue;
        }

        let matches = expand_pattern(&candidate)?;
        if matches.is_empty() {
            debug!(
                "event=bootstrap_resolve module=bootstrap status=skipped entry={}",
                candidate.display()
            );
        }
        sources.extend(matches);
    }
    Ok(sources)
}

fn expand_pattern(pattern: &Path) -> Result<Vec<PathBuf>, BootstrapError> {
    let mut matches = Vec::new();
    for path in glob::glob(&pattern.to_string_lossy())? {
        let path = path?;
        if path.is_file() {
            matches.push(path);
        }
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::{resolve_sources, BootstrapConfig, DEFAULT_BOOTSTRAP_FILES};
    use std::fs;

    #[test]
    fn default_config_uses_known_fixture_list() {
        let config = BootstrapConfig::new("/srv/mfl");
        assert_eq!(config.files.len(), DEFAULT_BOOTSTRAP_FILES.len());
        assert!(config.files.iter().all(|entry| entry.ends_with(".json")));
    }

    #[test]
    fn resolve_expands_globs_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/a.json"), "{}").unwrap();
        fs::write(dir.path().join("data/b.json"), "{}").unwrap();
        fs::write(dir.path().join("data/c.txt"), "").unwrap();

        let config = BootstrapConfig::new(dir.path()).with_files([
            "data/*.json",
            "data/missing.json",
            "nothing/*.json",
        ]);
        let sources = resolve_sources(&config).unwrap();

        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|path| path.extension().unwrap() == "json"));
    }

    #[test]
    fn direct_file_entry_is_not_globbed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("counties[1].json"), "{}").unwrap();

        let config = BootstrapConfig::new(dir.path()).with_files(["counties[1].json"]);
        let sources = resolve_sources(&config).unwrap();
        assert_eq!(sources, vec![dir.path().join("counties[1].json")]);
    }
}
