//! # Password Hashing
//!
//! Argon2id hashes in PHC string format (`$argon2id$v=19$...`), stored in
//! `users.password_hash`.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::{DbError, DbResult};

/// Hashes a password with a fresh random salt.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("demo123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("demo123", &hash));
        assert!(!verify_password("demo124", &hash));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("demo123").unwrap(), hash_password("demo123").unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        assert!(!verify_password("demo123", "not-a-phc-string"));
    }
}
