//! Artifact persistence.
//!
//! Both writes create missing parent directories and overwrite existing
//! files, so re-running a task is idempotent. The filesystem store writes
//! through a temp file in the target directory and renames it into place.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::{BenchError, Result};

/// Destination for stage artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `value` as pretty-printed JSON to `path`.
    async fn save_json(&self, value: &serde_json::Value, path: &Path) -> Result<()>;

    /// Write `text` verbatim to `path`.
    async fn save_text(&self, text: &str, path: &Path) -> Result<()>;
}

/// Serialize `record` and store it as JSON.
pub async fn save_record<T: Serialize + ?Sized>(
    store: &dyn ArtifactStore,
    record: &T,
    path: &Path,
) -> Result<()> {
    let value = serde_json::to_value(record)?;
    store.save_json(&value, path).await
}

/// Filesystem-backed [`ArtifactStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactStore;

impl FsArtifactStore {
    pub fn new() -> Self {
        Self
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;
    let mut tmp = NamedTempFile::new_in(&parent)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

async fn write_file(path: &Path, bytes: Vec<u8>) -> Result<()> {
    let target = path.to_path_buf();
    let outcome = tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
        .await
        .map_err(|join| std::io::Error::new(std::io::ErrorKind::Other, join.to_string()))
        .and_then(|r| r);
    outcome.map_err(|source| BenchError::Persistence {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = ?path, "artifact saved");
    Ok(())
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn save_json(&self, value: &serde_json::Value, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(value)?;
        write_file(path, content.into_bytes()).await
    }

    async fn save_text(&self, text: &str, path: &Path) -> Result<()> {
        write_file(path, text.as_bytes().to_vec()).await
    }
}

/// Read a JSON record written by [`save_record`].
pub async fn load_record<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_json_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results").join("t1").join("idea.json");

        FsArtifactStore
            .save_json(&json!({"title": "Sparse Alignment"}), &path)
            .await
            .expect("save");

        let back: serde_json::Value = load_record(&path).await.expect("load");
        assert_eq!(back["title"], "Sparse Alignment");
    }

    #[tokio::test]
    async fn test_save_text_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("paper.md");

        FsArtifactStore.save_text("# v1", &path).await.expect("save v1");
        FsArtifactStore.save_text("# v2", &path).await.expect("save v2");

        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content, "# v2");
    }

    #[tokio::test]
    async fn test_save_into_file_parent_fails_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").expect("write");

        let err = FsArtifactStore
            .save_text("x", &blocker.join("child.txt"))
            .await
            .unwrap_err();
        match err {
            BenchError::Persistence { path, .. } => assert!(path.ends_with("child.txt")),
            other => panic!("expected Persistence, got {other:?}"),
        }
    }
}
