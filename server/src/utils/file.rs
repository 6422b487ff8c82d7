//! File/path utility functions

use std::path::PathBuf;

use directories::BaseDirs;

/// Expand a path string to an absolute path.
///
/// Cross-platform path expansion that handles:
/// - Tilde expansion: `~` or `~/path` -> home directory
/// - Relative paths: `.`, `..`, `./path`, `../path` -> absolute path
/// - Bare names: `foo` -> `./foo` -> absolute path in current directory
/// - Absolute paths: passed through unchanged
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let home_dir = || BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());

    let expanded = if path == "~" {
        home_dir().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            home.join(rest)
        } else {
            PathBuf::from(path)
        }
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_absolute_unix() {
        let result = expand_path("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_path_relative_dot() {
        let result = expand_path(".");
        assert!(result.is_absolute());
    }

    #[test]
    fn test_expand_path_bare_name() {
        let result = expand_path("mydata");
        assert!(result.is_absolute());
        assert!(result.ends_with("mydata"));
    }

    #[test]
    fn test_expand_path_tilde() {
        let result = expand_path("~/.chatd");
        assert!(result.is_absolute());
        assert!(!result.to_string_lossy().contains('~'));
        assert!(result.ends_with(".chatd"));
    }

    #[test]
    fn test_expand_path_empty_string() {
        let result = expand_path("");
        assert!(result.is_absolute());
    }

    #[test]
    fn test_expand_path_trims_whitespace() {
        let result = expand_path("  /path/to/dir  ");
        assert_eq!(result, PathBuf::from("/path/to/dir"));
    }
}
