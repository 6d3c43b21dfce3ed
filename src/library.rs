use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::settings::{APP_NAME, Settings};
use crate::storage::SidecarKind;

/// Resolved on-disk locations for one user-data root
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    pub root: PathBuf,
    pub highlights_dir: PathBuf,
    pub bookmarks_dir: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            highlights_dir: root.join(SidecarKind::Highlights.dir_name()),
            bookmarks_dir: root.join(SidecarKind::Bookmarks.dir_name()),
            root,
        }
    }
}

/// Pick the user-data root: explicit override, then the settings file, then
/// the platform data directory. Relative paths are taken from the current
/// directory.
pub fn resolve_data_root(explicit: Option<&Path>, settings: &Settings) -> Result<DataPaths> {
    let root = match explicit.or(settings.data_dir.as_deref()) {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => std::env::current_dir()
            .context("Failed to get current directory")?
            .join(dir),
        None => dirs::data_dir()
            .context("Could not determine data directory")?
            .join(APP_NAME),
    };
    Ok(DataPaths::new(root))
}

/// Compute the XDG-compliant log file path.
/// Uses `state_dir` on platforms that have it, falls back to `cache_dir`.
pub fn resolve_log_path() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine state or cache directory")?;

    let log_dir = base.join(APP_NAME);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {log_dir:?}"))?;

    Ok(log_dir.join("pagemark.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_root_wins() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings {
            data_dir: Some(PathBuf::from("/somewhere/else")),
            ..Settings::default()
        };
        let paths = resolve_data_root(Some(tmp.path()), &settings).unwrap();
        assert_eq!(paths.root, tmp.path());
        assert_eq!(paths.highlights_dir, tmp.path().join("highlights"));
        assert_eq!(paths.bookmarks_dir, tmp.path().join("bookmarks"));
    }

    #[test]
    fn test_settings_root_used_without_override() {
        let settings = Settings {
            data_dir: Some(PathBuf::from("/srv/pagemark")),
            ..Settings::default()
        };
        let paths = resolve_data_root(None, &settings).unwrap();
        assert_eq!(paths.root, PathBuf::from("/srv/pagemark"));
    }

    #[test]
    fn test_relative_root_is_absolutized() {
        let paths = resolve_data_root(Some(Path::new("annotations")), &Settings::default()).unwrap();
        assert!(paths.root.is_absolute());
        assert!(paths.root.ends_with("annotations"));
    }

    #[test]
    fn test_resolve_log_path() {
        let log_path = resolve_log_path().unwrap();
        assert!(log_path.ends_with("pagemark.log"));
        assert!(log_path.parent().unwrap().exists());
    }
}
