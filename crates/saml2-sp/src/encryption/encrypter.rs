//! XML-Enc encryption for the identity-provider side.

use base64::Engine;
use saml2_crypto::ContentEncryptionAlgorithm;

use crate::credential::X509Credential;
use crate::error::{SamlError, SamlResult};
use crate::types::{key_transport, SAML_NS, XMLDSIG_NS, XMLENC_NS, XMLENC_TYPE_ELEMENT};

/// Encrypts an element for a recipient certificate.
#[derive(Debug, Clone, Copy)]
pub struct XmlEncrypter {
    algorithm: ContentEncryptionAlgorithm,
}

impl Default for XmlEncrypter {
    fn default() -> Self {
        Self::new(ContentEncryptionAlgorithm::Aes128Gcm)
    }
}

impl XmlEncrypter {
    /// Creates an encrypter using `algorithm` for content encryption.
    #[must_use]
    pub const fn new(algorithm: ContentEncryptionAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Encrypts `element_xml` under a fresh content key wrapped for
    /// `recipient`, returning `<saml:{wrapper}>` (for example
    /// `EncryptedAssertion` or `EncryptedID`).
    pub fn encrypt(
        &self,
        element_xml: &str,
        recipient: &X509Credential,
        wrapper: &str,
    ) -> SamlResult<String> {
        let content_key = self.algorithm.generate_key();
        let cipher_value = saml2_crypto::aead::seal(self.algorithm, &content_key, element_xml.as_bytes())
            .map_err(|e| SamlError::Crypto(format!("content encryption failed: {e}")))?;
        let wrapped_key = saml2_crypto::oaep_encrypt(recipient.public_key_der(), &content_key)
            .map_err(|e| SamlError::Crypto(format!("key wrap failed: {e}")))?;

        let engine = base64::engine::general_purpose::STANDARD;
        Ok(format!(
            r#"<saml:{wrapper} xmlns:saml="{SAML_NS}"><xenc:EncryptedData xmlns:xenc="{XMLENC_NS}" Type="{XMLENC_TYPE_ELEMENT}"><xenc:EncryptionMethod Algorithm="{content_alg}"/><ds:KeyInfo xmlns:ds="{XMLDSIG_NS}"><xenc:EncryptedKey><xenc:EncryptionMethod Algorithm="{key_alg}"/><xenc:CipherData><xenc:CipherValue>{wrapped}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedKey></ds:KeyInfo><xenc:CipherData><xenc:CipherValue>{cipher}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedData></saml:{wrapper}>"#,
            content_alg = self.algorithm.uri(),
            key_alg = key_transport::RSA_OAEP_MGF1P,
            wrapped = engine.encode(wrapped_key),
            cipher = engine.encode(cipher_value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::types::EncryptedElement;
    use crate::xml::XmlElement;

    #[test]
    fn output_parses_as_encrypted_element() {
        let xml = XmlEncrypter::default()
            .encrypt("<saml:NameID>bob</saml:NameID>", &testing::sp_encryption_credential(), "EncryptedID")
            .unwrap();
        assert!(!xml.contains("bob"));

        let root = XmlElement::parse(&xml).unwrap();
        assert_eq!(root.name, "EncryptedID");
        let encrypted = EncryptedElement::from_element(&root).unwrap();
        assert_eq!(
            encrypted.encrypted_data.encryption_method.as_deref(),
            Some(ContentEncryptionAlgorithm::Aes128Gcm.uri())
        );
        assert_eq!(encrypted.keys().count(), 1);
    }
}
