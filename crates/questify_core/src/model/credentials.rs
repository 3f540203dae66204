//! Salted password digests.
//!
//! Credentials are stored as `sha256(salt || password)` in lowercase hex.
//! Plaintext passwords never leave the service call that received them.

use sha2::{Digest, Sha256};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Stored credential pair of one user.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub password_hash: String,
    pub password_salt: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    /// Derives credentials for `password` with the given salt bytes.
    pub fn derive(password: &str, salt: &[u8; SALT_LEN]) -> Self {
        let password_salt = to_hex(salt);
        let password_hash = digest(&password_salt, password);
        Self {
            password_hash,
            password_salt,
        }
    }

    /// Compares `password` against the stored digest.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = digest(&self.password_salt, password);
        // Compare every byte regardless of where the first mismatch is.
        candidate.len() == self.password_hash.len()
            && candidate
                .bytes()
                .zip(self.password_hash.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

fn digest(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
