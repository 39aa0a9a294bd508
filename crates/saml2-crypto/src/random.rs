//! Cryptographically secure random generation.
//!
//! Used for XML-Enc content keys and AES-GCM nonces.

use rand::Rng;

/// Generates a cryptographically secure random byte array.
///
/// Uses the thread-local random number generator which is cryptographically
/// secure by default.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_has_requested_length() {
        assert_eq!(random_bytes(16).len(), 16);
        assert!(random_bytes(0).is_empty());
    }

    #[test]
    fn random_bytes_differ_between_calls() {
        assert_ne!(random_bytes(32), random_bytes(32));
    }
}
