//! XML-Enc decryption.

use base64::Engine;
use saml2_crypto::ContentEncryptionAlgorithm;
use tracing::debug;

use crate::credential::{CredentialUsage, X509Credential};
use crate::error::{SamlError, SamlResult};
use crate::types::{key_transport, EncryptedElement, EncryptedKey};

use super::XmlEncryptionService;

/// Decrypts RSA-OAEP / AES-GCM encrypted elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDecrypter;

impl XmlDecrypter {
    /// Creates a decrypter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn unwrap_key(private_key: &[u8], key: &EncryptedKey) -> SamlResult<Vec<u8>> {
        match key.encryption_method.as_deref() {
            Some(key_transport::RSA_OAEP_MGF1P) => {}
            other => {
                return Err(SamlError::DecryptionFailed(format!(
                    "unsupported key transport algorithm: {}",
                    other.unwrap_or("none")
                )));
            }
        }
        let wrapped = base64::engine::general_purpose::STANDARD
            .decode(&key.cipher_data.cipher_value)
            .map_err(|e| SamlError::DecryptionFailed(format!("invalid encrypted key: {e}")))?;
        saml2_crypto::oaep_decrypt(private_key, &wrapped)
            .map_err(|e| SamlError::DecryptionFailed(format!("key unwrap failed: {e}")))
    }
}

impl XmlEncryptionService for XmlDecrypter {
    fn decrypt(&self, encrypted: &EncryptedElement, credential: &X509Credential) -> SamlResult<String> {
        let data = &encrypted.encrypted_data;
        let algorithm = data
            .encryption_method
            .as_deref()
            .and_then(ContentEncryptionAlgorithm::from_uri)
            .ok_or_else(|| {
                SamlError::DecryptionFailed(format!(
                    "unsupported content encryption algorithm: {}",
                    data.encryption_method.as_deref().unwrap_or("none")
                ))
            })?;
        let private_key = credential
            .require_private_key(CredentialUsage::Decryption)
            .map_err(|e| SamlError::DecryptionFailed(e.to_string()))?;

        let mut last_error = SamlError::DecryptionFailed("no EncryptedKey present".to_string());
        let mut content_key = None;
        for key in encrypted.keys() {
            match Self::unwrap_key(private_key, key) {
                Ok(k) => {
                    content_key = Some(k);
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "encrypted key did not unwrap");
                    last_error = e;
                }
            }
        }
        let content_key = content_key.ok_or(last_error)?;

        let cipher_value = base64::engine::general_purpose::STANDARD
            .decode(&data.cipher_data.cipher_value)
            .map_err(|e| SamlError::DecryptionFailed(format!("invalid cipher value: {e}")))?;
        let plaintext = saml2_crypto::aead::open(algorithm, &content_key, &cipher_value)
            .map_err(|e| SamlError::DecryptionFailed(format!("content decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| SamlError::DecryptionFailed(format!("decrypted content is not utf-8: {e}")))
    }
}
