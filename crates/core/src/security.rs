//! Password hashing for the user directory
//!
//! The data model calls for a per-user salt stored alongside a digest of
//! `plaintext || salt` rather than a self-salted password hash format, so
//! callers can re-hash on update without rotating the salt.

use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_BYTES: usize = 16;

/// Generate a fresh random salt, hex-encoded for storage.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash `password || salt` with SHA-256, returning a hex-encoded digest.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a plaintext password against a stored hash and salt.
pub fn verify_password(password: &str, salt: &str, hash: &str) -> bool {
    hash_password(password, salt) == hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic_for_same_salt() {
        let salt = generate_salt();
        let hash1 = hash_password("hunter2", &salt);
        let hash2 = hash_password("hunter2", &salt);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_different_salts_change_hash() {
        let hash1 = hash_password("hunter2", "salt-a");
        let hash2 = hash_password("hunter2", "salt-b");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_roundtrip() {
        let salt = generate_salt();
        let hash = hash_password("superDuper", &salt);
        assert!(verify_password("superDuper", &salt, &hash));
        assert!(!verify_password("wrong", &salt, &hash));
    }

    #[test]
    fn test_salts_are_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
