use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

use crate::task::TaskResponse;

/// Supplies task records as untyped JSON; each one is validated separately
/// by [`crate::task::ingest`]. `token` is whatever the credential store holds
/// and is passed through untouched.
pub trait TaskSource: Send + Sync {
    fn fetch(&self, token: Option<&str>) -> Result<Vec<Value>>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unable to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("unable to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed task payload in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("task listing {} reports an upstream error: {message}", .path.display())]
    Upstream { path: PathBuf, message: String },
}

#[derive(Deserialize)]
struct FailureBody {
    error: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Bare(Vec<Value>),
    Response(TaskResponse),
    Failure(FailureBody),
}

/// Reads task listings saved as `*.json` files, either the `{ "value": [...] }`
/// response body or a bare array.
#[derive(Debug, Clone, Default)]
pub struct JsonDirectorySource {
    roots: Vec<PathBuf>,
}

impl JsonDirectorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        if !self.roots.contains(&path) {
            self.roots.push(path);
        }
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn task_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let mut files = Vec::new();
        for root in &self.roots {
            if root.is_file() {
                if is_json_file(root) {
                    files.push(root.clone());
                }
                continue;
            }
            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = entry.map_err(|source| SourceError::Walk {
                    path: root.clone(),
                    source,
                })?;
                if entry.file_type().is_file() && is_json_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
        Ok(files)
    }
}

impl TaskSource for JsonDirectorySource {
    fn fetch(&self, token: Option<&str>) -> Result<Vec<Value>> {
        tracing::debug!(
            root_count = self.roots.len(),
            has_token = token.is_some(),
            "reading task files"
        );
        let mut records = Vec::new();
        for path in self.task_files()? {
            let batch = load_task_file(&path)?;
            tracing::debug!(path = %path.display(), count = batch.len(), "loaded task file");
            records.extend(batch);
        }
        Ok(records)
    }
}

/// Reads one listing. Anything other than a bare array or a `{ "value": [...] }`
/// body is an error, so a failed download never reads as an empty listing.
pub fn load_task_file(path: &Path) -> Result<Vec<Value>, SourceError> {
    let raw = fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: Payload = serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match payload {
        Payload::Bare(records) => Ok(records),
        Payload::Response(response) => Ok(response.value),
        Payload::Failure(body) => Err(SourceError::Upstream {
            path: path.to_path_buf(),
            message: body.error,
        }),
    }
}

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
