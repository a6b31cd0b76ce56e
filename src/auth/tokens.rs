//! Opaque tokens handed to clients (refresh and password-setup tokens).
//! Only the SHA-256 hex digest is ever persisted.

use sha2::{Digest, Sha256};

pub fn generate() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

pub fn hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
