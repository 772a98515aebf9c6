/// Argon2id password hashing
///
/// Hashes are stored as PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`).
/// Verification reads the cost from the string itself, so accounts created
/// under older parameters keep logging in after the defaults change.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Stored password hash is not a PHC string")]
    InvalidHashFormat,

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),
}

/// Cost of hashing a new password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub lanes: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            lanes: 4,
        }
    }
}

impl PasswordConfig {
    /// Minimal cost so test suites stay fast; never for stored credentials
    #[cfg(any(test, feature = "test-utils"))]
    pub fn light() -> Self {
        Self {
            memory_kib: 4096,
            iterations: 1,
            lanes: 1,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_kib, self.iterations, self.lanes, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash `password` under a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Hash with the production cost parameters
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    PasswordConfig::default().hash(password)
}

/// Check `password` against a stored PHC string
///
/// A mismatch is `Ok(false)`; only an unreadable hash is an error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$m=65536,t=3,p=4$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_salt_differs_per_hash() {
        let config = PasswordConfig::light();

        let first = config.hash("s3cretpass").unwrap();
        let second = config.hash("s3cretpass").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("s3cretpass", &first).unwrap());
        assert!(verify_password("s3cretpass", &second).unwrap());
    }

    #[test]
    fn test_old_parameters_still_verify() {
        let old = PasswordConfig {
            memory_kib: 8192,
            iterations: 2,
            lanes: 2,
        }
        .hash("s3cretpass")
        .unwrap();

        assert!(old.contains("m=8192,t=2,p=2"));
        assert!(verify_password("s3cretpass", &old).unwrap());
    }

    #[test]
    fn test_unreadable_hash() {
        assert!(matches!(
            verify_password("s3cretpass", "plaintext"),
            Err(PasswordError::InvalidHashFormat)
        ));
    }

    #[test]
    fn test_zero_lanes_rejected() {
        let config = PasswordConfig {
            lanes: 0,
            ..PasswordConfig::light()
        };
        assert!(matches!(
            config.hash("s3cretpass"),
            Err(PasswordError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_empty_password_does_not_match() {
        let hash = PasswordConfig::light().hash("s3cretpass").unwrap();
        assert!(!verify_password("", &hash).unwrap());
    }
}
