use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Narrow interface to the credential store: hash on registration, verify on
/// login. The hashing scheme stays swappable behind this trait.
pub trait CredentialHasher: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String, String>;
    fn verify_password(&self, stored_hash: &str, candidate: &str) -> Result<bool, String>;
}

/// Argon2id-backed implementation, the default for production.
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> Result<String, String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| format!("Failed to hash password: {}", e))
    }

    fn verify_password(&self, stored_hash: &str, candidate: &str) -> Result<bool, String> {
        let parsed_hash =
            PasswordHash::new(stored_hash).map_err(|e| format!("Invalid stored hash: {}", e))?;
        let argon2 = Argon2::default();

        match argon2.verify_password(candidate.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(format!("Password verification failed: {}", e)),
        }
    }
}
