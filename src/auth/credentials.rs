// Password hashing and verification

use crate::core::errors::RegistrarError;
use secrecy::{ExposeSecret, Secret};
use std::fmt;

/// Plaintext password wrapper with memory protection
///
/// Uses `secrecy::Secret` to prevent accidental logging or memory swapping
/// of sensitive password material.
pub struct Password(Secret<String>);

impl Password {
    /// Create a new Password from a string
    pub fn new(password: &str) -> Self {
        Self(Secret::new(password.to_string()))
    }

    /// Expose the secret password (use with caution)
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("value", &"<REDACTED>")
            .finish()
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<REDACTED>")
    }
}

/// Credential store - bcrypt hashing and verification
///
/// bcrypt embeds a per-call random salt in the digest, so hashing the same
/// password twice produces different outputs. Verification re-derives from
/// the embedded salt and compares in constant time.
pub struct CredentialStore {
    cost: u32,
}

impl CredentialStore {
    /// Create a credential store with the given bcrypt cost factor
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password
    pub fn hash(&self, password: &Password) -> Result<String, RegistrarError> {
        bcrypt::hash(password.expose_secret(), self.cost)
            .map_err(|e| RegistrarError::Infrastructure(format!("password hashing failed: {}", e)))
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// A malformed stored hash verifies as false, never as an error: the
    /// caller treats it exactly like a wrong password.
    pub fn verify(&self, password: &Password, stored_hash: &str) -> bool {
        bcrypt::verify(password.expose_secret(), stored_hash).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost keeps the tests fast
    fn store() -> CredentialStore {
        CredentialStore::new(4)
    }

    #[test]
    fn test_hash_then_verify_round_trip() {
        let store = store();
        let password = Password::new("correct horse battery staple");
        let hash = store.hash(&password).unwrap();
        assert!(store.verify(&password, &hash));
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let store = store();
        let hash = store.hash(&Password::new("password-one")).unwrap();
        assert!(!store.verify(&Password::new("password-two"), &hash));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let store = store();
        let password = Password::new("same input");
        let first = store.hash(&password).unwrap();
        let second = store.hash(&password).unwrap();
        assert_ne!(first, second, "salt must be embedded per call");
        assert!(store.verify(&password, &first));
        assert!(store.verify(&password, &second));
    }

    #[test]
    fn test_malformed_hash_verifies_false() {
        let store = store();
        assert!(!store.verify(&Password::new("anything"), "not-a-bcrypt-hash"));
        assert!(!store.verify(&Password::new("anything"), ""));
    }

    #[test]
    fn test_hash_is_not_the_raw_password() {
        let store = store();
        let hash = store.hash(&Password::new("visible-secret")).unwrap();
        assert!(!hash.contains("visible-secret"));
    }

    #[test]
    fn test_password_redaction() {
        let password = Password::new("super_secret_123");
        let debug_str = format!("{:?}", password);
        let display_str = format!("{}", password);

        assert!(!debug_str.contains("super_secret_123"));
        assert!(!display_str.contains("super_secret_123"));
        assert!(debug_str.contains("REDACTED"));
    }
}
