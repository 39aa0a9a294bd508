//! XML Encryption support.
//!
//! Encrypted assertions and encrypted name identifiers are decrypted through
//! [`XmlEncryptionService`]. Supported algorithms:
//!
//! - key transport: `rsa-oaep-mgf1p`
//! - content: `aes128-gcm`, `aes256-gcm`
//!
//! [`XmlEncrypter`] is the identity-provider side of the same scheme.

mod decrypter;
mod encrypter;

pub use decrypter::XmlDecrypter;
pub use encrypter::XmlEncrypter;

use crate::credential::X509Credential;
use crate::error::SamlResult;
use crate::types::EncryptedElement;

/// XML-Enc decryption used by the response validator.
pub trait XmlEncryptionService: Send + Sync {
    /// Decrypts `encrypted` with `credential`'s private key and returns the
    /// plaintext element as XML text.
    ///
    /// Every failure is reported as [`crate::SamlError::DecryptionFailed`].
    fn decrypt(&self, encrypted: &EncryptedElement, credential: &X509Credential) -> SamlResult<String>;
}
