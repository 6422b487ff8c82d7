//! Cryptographic utility functions

use sha2::{Digest, Sha256};

/// Calculate SHA256 hash and return as hex string. Used to store password
/// hashes rather than plaintext; not a defense against offline brute force,
/// which is out of scope.
pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sha256_hex_deterministic() {
        assert_eq!(sha256_hex("password123"), sha256_hex("password123"));
        assert_ne!(sha256_hex("password123"), sha256_hex("password124"));
    }
}
