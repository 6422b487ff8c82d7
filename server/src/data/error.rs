//! Unified error type for the data layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

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

impl DataError {
    pub fn migration_failed(version: i32, name: &str, error: &str) -> Self {
        Self::MigrationFailed {
            version,
            name: name.to_string(),
            error: error.to_string(),
        }
    }
}

impl From<crate::data::sqlite::SqliteError> for DataError {
    fn from(e: crate::data::sqlite::SqliteError) -> Self {
        match e {
            crate::data::sqlite::SqliteError::Database(e) => Self::Sqlite(e),
            crate::data::sqlite::SqliteError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                version,
                name,
                error,
            },
            crate::data::sqlite::SqliteError::Io(e) => Self::Io(e),
            crate::data::sqlite::SqliteError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failed_error_display() {
        let err = DataError::migration_failed(2, "add_inbox_limit", "syntax error");
        assert_eq!(
            err.to_string(),
            "migration 2 (add_inbox_limit) failed: syntax error"
        );
    }

    #[test]
    fn test_conflict_display() {
        let err = DataError::Conflict("Username already exists".to_string());
        assert_eq!(err.to_string(), "Username already exists");
    }
}
