use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

/// Release notes keyed by version string, newest first.
///
/// Loaded once at startup and immutable afterwards. Entry order is the file's
/// key order; the workspace builds `serde_json` with `preserve_order`, so the
/// mapping survives a parse/serialize round trip intact.
#[derive(Clone, Default)]
pub struct Changelog {
    entries: Arc<Map<String, Value>>,
}

#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error("failed to read changelog file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse changelog file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("changelog file '{path}' is not a JSON object")]
    NotAnObject { path: String },
}

impl Changelog {
    pub fn load(path: &Path) -> Result<Self, ChangelogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ChangelogError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let value: Value =
            serde_json::from_str(&raw).map_err(|source| ChangelogError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        match value {
            Value::Object(entries) => Ok(Self {
                entries: Arc::new(entries),
            }),
            _ => Err(ChangelogError::NotAnObject {
                path: path.display().to_string(),
            }),
        }
    }

    /// The first `limit` entries in file order.
    pub fn head(&self, limit: usize) -> Map<String, Value> {
        self.entries
            .iter()
            .take(limit)
            .map(|(version, notes)| (version.clone(), notes.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
