use sha2::{Digest, Sha256};

/// Generate a single-use token: a random v4 UUID in simple (URL-safe) form.
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// SHA-256 hash a token for safe storage. Only hashes are persisted.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
