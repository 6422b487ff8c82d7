//! Platform-aware data storage directory management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

use super::constants::{APP_DOT_FOLDER, APP_NAME, ENV_DATA_DIR};
use crate::utils::file::expand_path;

/// Data subdirectories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSubdir {
    Sqlite,
}

impl DataSubdir {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataSubdir::Sqlite => "sqlite",
        }
    }

    pub const fn all() -> &'static [DataSubdir] {
        &[DataSubdir::Sqlite]
    }
}

/// Application storage manager
#[derive(Debug, Clone)]
pub struct AppStorage {
    data_dir: PathBuf,
}

impl AppStorage {
    /// Initialize storage with platform-appropriate data directory
    pub async fn init() -> Result<Self> {
        let data_dir = Self::resolve_data_dir();

        Self::ensure_directories(&data_dir).await?;
        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);

        tracing::debug!(data_dir = %data_dir.display(), "Storage initialized");

        Ok(Self { data_dir })
    }

    /// Resolve data directory from env var or platform default
    pub fn resolve_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            return expand_path(&dir);
        }

        if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            return proj_dirs.data_dir().to_path_buf();
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        cwd.join(APP_DOT_FOLDER)
    }

    async fn ensure_directories(data_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        for subdir in DataSubdir::all() {
            let path = data_dir.join(subdir.as_str());
            tokio::fs::create_dir_all(&path).await.with_context(|| {
                format!(
                    "Failed to create {} directory: {}",
                    subdir.as_str(),
                    path.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get path to a subdirectory (canonicalized)
    pub fn subdir(&self, subdir: DataSubdir) -> PathBuf {
        let path = self.data_dir.join(subdir.as_str());
        path.canonicalize().unwrap_or(path)
    }

    /// Create AppStorage for testing with a specific data directory
    #[cfg(test)]
    pub fn init_for_test(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_subdir_as_str() {
        assert_eq!(DataSubdir::Sqlite.as_str(), "sqlite");
    }

    #[test]
    fn test_resolve_data_dir_fallback() {
        // SAFETY: test runs single-threaded, no concurrent access to env var
        unsafe { std::env::remove_var(ENV_DATA_DIR) };
        let path = AppStorage::resolve_data_dir();
        assert!(!path.as_os_str().is_empty());
    }
}
