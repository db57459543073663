//! Salted password hashing for stored credentials.
//!
//! Hashes are Argon2id PHC strings, so the salt and cost parameters travel
//! with the hash and old rows keep verifying after a parameter change.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check `password` against a stored PHC hash.
///
/// A hash that cannot be parsed never matches; the error is logged, not
/// returned, so callers have a single "no" path.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Spend the same effort as a real verification, for unknown logins.
///
/// Login answers "wrong login" and "wrong password" identically; doing the
/// hash work in both cases keeps response times from telling them apart.
pub fn burn_verification(password: &str) {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    let decoy = DECOY.get_or_init(|| hash_password("locker-decoy-password").ok());
    if let Some(hash) = decoy {
        let _ = verify_password(password, hash);
    }
}

/// Reject passwords the admin tool should never store.
pub fn validate_new_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password must not be empty".into());
    }
    if password.chars().any(char::is_control) {
        return Err("Password must not contain control characters".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("secret").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"), "expected argon2id PHC prefix");
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("Secret", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("secret", &a) && verify_password("secret", &b));
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!verify_password("secret", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn new_password_rules() {
        assert!(validate_new_password("secret").is_ok());
        assert!(validate_new_password("").is_err());
        assert!(validate_new_password("line\nbreak").is_err());
    }
}
