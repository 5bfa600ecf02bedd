use sha2::{Digest, Sha256};

/// Hash a plaintext password for storage and comparison.
///
/// Unsalted SHA-256, hex-encoded. Identical passwords always produce
/// identical digests; login compares digests byte-for-byte. This is a
/// known weakness kept for parity with the seeded bootstrap account,
/// whose stored digest is `sha256("123456")`.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
