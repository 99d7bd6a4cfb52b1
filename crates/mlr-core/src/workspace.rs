//! Per-task isolated workspaces for generated experiment code.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{BenchError, Result};

/// Creates and removes `<base_dir>/<task_id>` directories.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, task_id: &str) -> Result<PathBuf> {
        let valid = !task_id.is_empty()
            && task_id != "."
            && task_id != ".."
            && !task_id.contains(['/', '\\']);
        if !valid {
            return Err(BenchError::Workspace {
                task_id: task_id.to_string(),
                reason: "task id is not a single path segment".to_string(),
            });
        }
        Ok(self.base_dir.join(task_id))
    }

    /// Create (or reuse) the task's workspace, owner-only on unix.
    pub async fn create_workspace(&self, task_id: &str) -> Result<PathBuf> {
        let workspace = self.path_for(task_id)?;
        tokio::fs::create_dir_all(&workspace).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&workspace, std::fs::Permissions::from_mode(0o700)).await?;
        }

        info!(workspace = ?workspace, "created workspace");
        Ok(workspace)
    }

    /// Existing workspace for `task_id`, if any.
    pub fn get_workspace(&self, task_id: &str) -> Option<PathBuf> {
        self.path_for(task_id).ok().filter(|p| p.is_dir())
    }

    /// Remove the task's workspace. Missing workspaces are not an error.
    pub async fn cleanup_workspace(&self, task_id: &str) -> Result<()> {
        let workspace = self.path_for(task_id)?;
        match tokio::fs::remove_dir_all(&workspace).await {
            Ok(()) => {
                info!(workspace = ?workspace, "cleaned up workspace");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
