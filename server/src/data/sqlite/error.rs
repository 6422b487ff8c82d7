//! SQLite error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failed_error_display() {
        let err = SqliteError::MigrationFailed {
            version: 1,
            name: "initial_schema".to_string(),
            error: "syntax error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "migration 1 (initial_schema) failed: syntax error"
        );
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let sqlite_err: SqliteError = io_err.into();
        assert!(sqlite_err.to_string().contains("file not found"));
    }
}
