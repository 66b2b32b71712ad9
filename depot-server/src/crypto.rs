//! Password hashing and API token generation.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of PBKDF2 iterations for password hashing
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length in bytes
const SALT_LENGTH: usize = 32;

/// Token length in bytes, before hex encoding
const TOKEN_LENGTH: usize = 32;

/// Generate a cryptographically secure random salt, hex encoded.
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::rng().fill_bytes(&mut salt);
    const_hex::encode(salt)
}

/// Hash `password` with PBKDF2-HMAC-SHA256 and the given hex salt.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS, &mut key);
    const_hex::encode(key)
}

/// Check `password` against a stored hash, in constant time.
pub fn verify_password(password: &str, salt: &str, expected: &str) -> bool {
    let actual = hash_password(password, salt);
    actual.len() == expected.len()
        && actual
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// A salted password hash, as stored with an author.
///
/// Computing or checking one takes a deliberate amount of CPU time, so callers
/// do it without holding the database lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

impl PasswordHash {
    /// Hash `password` with a fresh salt.
    pub fn new(password: &str) -> Self {
        let salt = generate_salt();
        Self {
            hash: hash_password(password, &salt),
            salt,
        }
    }

    pub fn verify(&self, password: &str) -> bool {
        verify_password(password, &self.salt, &self.hash)
    }
}

/// Generate a new API token. Only its hash is ever stored.
pub fn generate_token() -> String {
    let mut token = [0u8; TOKEN_LENGTH];
    rand::rng().fill_bytes(&mut token);
    const_hex::encode(token)
}

/// Hash of an API token as stored in the database.
pub fn hash_token(token: &str) -> String {
    const_hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_LENGTH * 2);

        let hash = hash_password("hunter2", &salt);
        assert!(verify_password("hunter2", &salt, &hash));
        assert!(!verify_password("hunter3", &salt, &hash));
        assert!(!verify_password("hunter2", &generate_salt(), &hash));
    }

    #[test]
    fn test_password_hash() {
        let password = PasswordHash::new("correct horse");
        assert!(password.verify("correct horse"));
        assert!(!password.verify("battery staple"));
        assert_ne!(PasswordHash::new("correct horse"), password);
    }

    #[test]
    fn test_tokens_are_unique_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_LENGTH * 2);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), a);
    }
}
