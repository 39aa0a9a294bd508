//! AES-GCM content encryption for XML-Enc `EncryptedData`.
//!
//! XML-Enc 1.1 serializes GCM ciphertext as `IV || ciphertext || tag` inside
//! a single `CipherValue`; [`seal`] and [`open`] use that layout.

use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM, NONCE_LEN};

use crate::error::{CryptoError, CryptoResult};
use crate::random::random_bytes;

/// XML-Enc block encryption algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncryptionAlgorithm {
    /// AES-128 in GCM mode.
    Aes128Gcm,
    /// AES-256 in GCM mode.
    Aes256Gcm,
}

impl ContentEncryptionAlgorithm {
    /// Returns the XML-Enc algorithm URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Aes128Gcm => "http://www.w3.org/2009/xmlenc11#aes128-gcm",
            Self::Aes256Gcm => "http://www.w3.org/2009/xmlenc11#aes256-gcm",
        }
    }

    /// Parses an algorithm from its XML-Enc URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "http://www.w3.org/2009/xmlenc11#aes128-gcm" => Some(Self::Aes128Gcm),
            "http://www.w3.org/2009/xmlenc11#aes256-gcm" => Some(Self::Aes256Gcm),
            _ => None,
        }
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm => 32,
        }
    }

    /// Generates a fresh random content key.
    #[must_use]
    pub fn generate_key(self) -> Vec<u8> {
        random_bytes(self.key_len())
    }

    fn key(self, key: &[u8]) -> CryptoResult<LessSafeKey> {
        let algorithm = match self {
            Self::Aes128Gcm => &AES_128_GCM,
            Self::Aes256Gcm => &AES_256_GCM,
        };
        let unbound = UnboundKey::new(algorithm, key)
            .map_err(|_| CryptoError::InvalidKey(format!("content key must be {} bytes", self.key_len())))?;
        Ok(LessSafeKey::new(unbound))
    }
}

/// Encrypts `plaintext`, returning `IV || ciphertext || tag`.
pub fn seal(
    algorithm: ContentEncryptionAlgorithm,
    key: &[u8],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let key = algorithm.key(key)?;
    let iv = random_bytes(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(&iv)
        .map_err(|_| CryptoError::Encryption("invalid nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Encryption("AES-GCM seal failed".to_string()))?;

    let mut output = iv;
    output.extend_from_slice(&in_out);
    Ok(output)
}

/// Decrypts `IV || ciphertext || tag` produced by an XML-Enc 1.1 GCM encrypter.
pub fn open(
    algorithm: ContentEncryptionAlgorithm,
    key: &[u8],
    cipher_value: &[u8],
) -> CryptoResult<Vec<u8>> {
    if cipher_value.len() < NONCE_LEN {
        return Err(CryptoError::Decryption);
    }
    let key = algorithm.key(key).map_err(|_| CryptoError::Decryption)?;
    let (iv, ciphertext) = cipher_value.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(iv).map_err(|_| CryptoError::Decryption)?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Decryption)?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_recovers_plaintext() {
        let key = ContentEncryptionAlgorithm::Aes128Gcm.generate_key();
        let sealed = seal(ContentEncryptionAlgorithm::Aes128Gcm, &key, b"<saml:Assertion/>").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 17 + 16);

        let opened = open(ContentEncryptionAlgorithm::Aes128Gcm, &key, &sealed).unwrap();
        assert_eq!(opened, b"<saml:Assertion/>");
    }

    #[test]
    fn open_with_wrong_key_fails() {
        let key = ContentEncryptionAlgorithm::Aes256Gcm.generate_key();
        let other = ContentEncryptionAlgorithm::Aes256Gcm.generate_key();
        let sealed = seal(ContentEncryptionAlgorithm::Aes256Gcm, &key, b"secret").unwrap();

        assert!(matches!(
            open(ContentEncryptionAlgorithm::Aes256Gcm, &other, &sealed),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn open_rejects_truncated_input() {
        let key = ContentEncryptionAlgorithm::Aes128Gcm.generate_key();
        assert!(open(ContentEncryptionAlgorithm::Aes128Gcm, &key, &[0u8; 4]).is_err());
    }

    #[test]
    fn uri_roundtrip() {
        for alg in [ContentEncryptionAlgorithm::Aes128Gcm, ContentEncryptionAlgorithm::Aes256Gcm] {
            assert_eq!(ContentEncryptionAlgorithm::from_uri(alg.uri()), Some(alg));
        }
        assert_eq!(ContentEncryptionAlgorithm::from_uri("http://www.w3.org/2001/04/xmlenc#aes128-cbc"), None);
    }
}
