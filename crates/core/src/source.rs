//! Where a batch of raw records comes from.
//!
//! Documents are always looked up inside one configured source directory.
//! Callers name them with a relative path; absolute paths, `..` segments
//! and symlinks that resolve outside the directory are refused.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;

/// Reference to a JSON document (an array of records) in the source directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentSource {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchSource {
    /// Records supplied inline by the caller.
    Records(Vec<Value>),
    Document(DocumentSource),
}

impl BatchSource {
    /// Resolve the source into its raw records.
    ///
    /// Only structural problems fail here: no source directory, a document
    /// name outside it, an unreadable file, invalid JSON, or a top-level
    /// value that is not an array. Bad rows inside the array are left to
    /// the validator.
    pub async fn load(self, source_dir: Option<&Path>) -> Result<Vec<Value>, CoreError> {
        match self {
            Self::Records(records) => Ok(records),
            Self::Document(doc) => {
                let dir = source_dir.ok_or_else(|| {
                    CoreError::InvalidSource("document sources are not enabled".into())
                })?;
                load_document(dir, &doc).await
            }
        }
    }
}

/// Locate `requested` inside `dir`, following symlinks.
pub async fn resolve_document(dir: &Path, requested: &Path) -> Result<PathBuf, CoreError> {
    let display = requested.display();
    let relative = !requested.as_os_str().is_empty()
        && requested
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !relative {
        return Err(CoreError::InvalidSource(format!(
            "document '{display}' must be a relative name inside the source directory"
        )));
    }

    let root = tokio::fs::canonicalize(dir)
        .await
        .map_err(|_| CoreError::InvalidSource("source directory is not available".into()))?;
    let path = tokio::fs::canonicalize(root.join(requested))
        .await
        .map_err(|_| CoreError::InvalidSource(format!("document '{display}' not found")))?;

    if !path.starts_with(&root) {
        return Err(CoreError::InvalidSource(format!(
            "document '{display}' is outside the source directory"
        )));
    }
    Ok(path)
}

async fn load_document(dir: &Path, doc: &DocumentSource) -> Result<Vec<Value>, CoreError> {
    let path = resolve_document(dir, &doc.path).await?;
    let display = doc.path.display();

    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|_| CoreError::InvalidSource(format!("cannot read document '{display}'")))?;

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| CoreError::InvalidSource(format!("'{display}' is not valid JSON: {e}")))?;

    match value {
        Value::Array(records) => Ok(records),
        _ => Err(CoreError::InvalidSource(format!(
            "'{display}' must contain a JSON array of records"
        ))),
    }
}
