//! Unified error type for cluster-facing operations
//!
//! Bridges store failures and peer-to-peer failures into one enum so the
//! RPC layer has a single place to decide what status and message a client
//! sees, instead of matching on the data layer's error type directly.

use thiserror::Error;

use crate::data::DataError;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),

    #[error("Username already exists")]
    DuplicateKey,

    #[error("not found")]
    NotFound,

    #[error("invalid username or password")]
    AuthFailure,

    #[error("store failure: {0}")]
    StoreFailure(String),
}

impl From<DataError> for DomainError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::Conflict(_) => DomainError::DuplicateKey,
            other => DomainError::StoreFailure(other.to_string()),
        }
    }
}

impl From<tonic::Status> for DomainError {
    fn from(status: tonic::Status) -> Self {
        DomainError::TransientNetwork(status.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_duplicate_key() {
        let err: DomainError = DataError::Conflict("Username already exists".to_string()).into();
        assert!(matches!(err, DomainError::DuplicateKey));
    }

    #[test]
    fn not_found_has_a_stable_client_message() {
        assert_eq!(DomainError::NotFound.to_string(), "not found");
    }
}
