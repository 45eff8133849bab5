//! Argon2 password hashing helpers.
//!
//! Registration stores an argon2id hash with a per-password random salt;
//! login verifies against the stored PHC string.

use amantena_core::{CoreError, CoreResult};

/// Hash a password for storage.
pub fn hash_password(password: &str) -> CoreResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::Storage(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// A malformed stored hash verifies as false rather than erroring; the
/// caller treats it like any wrong password.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("orchard-gate-42").unwrap();
        assert!(verify_password("orchard-gate-42", &hash));
        assert!(!verify_password("orchard-gate-43", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_just_wrong() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
