//! X.509 credentials with usage tags.
//!
//! A registration owns an ordered list of credentials. Consumers that verify
//! or decrypt iterate [`crate::RelyingPartyRegistration::credentials_for`] in
//! that order and stop at the first success, so ordering expresses key
//! rollover preference.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};

/// What a credential may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialUsage {
    /// Sign outbound messages. Requires a private key.
    Signing,
    /// Verify inbound signatures.
    Verification,
    /// Encrypt for the peer.
    Encryption,
    /// Decrypt inbound encrypted data. Requires a private key.
    Decryption,
}

impl CredentialUsage {
    /// Returns true if this usage needs the private key.
    #[must_use]
    pub const fn requires_private_key(self) -> bool {
        matches!(self, Self::Signing | Self::Decryption)
    }
}

/// An X.509 certificate, an optional private key and the usages they serve.
#[derive(Clone)]
pub struct X509Credential {
    certificate_der: Vec<u8>,
    public_key_der: Vec<u8>,
    private_key_der: Option<Vec<u8>>,
    usages: BTreeSet<CredentialUsage>,
}

impl X509Credential {
    /// Creates a credential from DER material.
    ///
    /// Fails when no usage is given, when the certificate cannot be parsed, or
    /// when a signing or decryption usage lacks a private key.
    pub fn new(
        certificate_der: Vec<u8>,
        private_key_der: Option<Vec<u8>>,
        usages: impl IntoIterator<Item = CredentialUsage>,
    ) -> SamlResult<Self> {
        let usages: BTreeSet<_> = usages.into_iter().collect();
        if usages.is_empty() {
            return Err(SamlError::Configuration(
                "credential must declare at least one usage".to_string(),
            ));
        }
        if private_key_der.is_none() {
            if let Some(usage) = usages.iter().find(|u| u.requires_private_key()) {
                return Err(SamlError::Configuration(format!(
                    "{usage:?} credential requires a private key"
                )));
            }
        }
        let public_key_der = saml2_crypto::certificate_public_key(&certificate_der)
            .map_err(|e| SamlError::Configuration(format!("invalid certificate: {e}")))?;

        Ok(Self {
            certificate_der,
            public_key_der,
            private_key_der,
            usages,
        })
    }

    /// Creates a credential from PEM text.
    pub fn from_pem(
        certificate_pem: &str,
        private_key_pem: Option<&str>,
        usages: impl IntoIterator<Item = CredentialUsage>,
    ) -> SamlResult<Self> {
        let certificate_der = saml2_crypto::pem_to_der(certificate_pem, "CERTIFICATE")
            .map_err(|e| SamlError::Configuration(format!("invalid certificate PEM: {e}")))?;
        let private_key_der = private_key_pem
            .map(saml2_crypto::private_key_pem_to_der)
            .transpose()
            .map_err(|e| SamlError::Configuration(format!("invalid private key PEM: {e}")))?;
        Self::new(certificate_der, private_key_der, usages)
    }

    /// Creates a verification (and encryption) credential from a peer
    /// certificate.
    pub fn verification(certificate_pem: &str) -> SamlResult<Self> {
        Self::from_pem(
            certificate_pem,
            None,
            [CredentialUsage::Verification, CredentialUsage::Encryption],
        )
    }

    /// Creates a signing (and decryption) credential from the local key pair.
    pub fn signing(certificate_pem: &str, private_key_pem: &str) -> SamlResult<Self> {
        Self::from_pem(
            certificate_pem,
            Some(private_key_pem),
            [CredentialUsage::Signing, CredentialUsage::Decryption],
        )
    }

    /// The certificate in DER form.
    #[must_use]
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The certificate's `SubjectPublicKeyInfo` in DER form.
    #[must_use]
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// The private key in DER form, if present.
    #[must_use]
    pub fn private_key_der(&self) -> Option<&[u8]> {
        self.private_key_der.as_deref()
    }

    /// Returns true if the credential carries `usage`.
    #[must_use]
    pub fn has_usage(&self, usage: CredentialUsage) -> bool {
        self.usages.contains(&usage)
    }

    /// Returns the declared usages.
    #[must_use]
    pub fn usages(&self) -> &BTreeSet<CredentialUsage> {
        &self.usages
    }

    /// Returns the certificate subject as a distinguished name.
    #[must_use]
    pub fn subject(&self) -> String {
        saml2_crypto::certificate_subject(&self.certificate_der).unwrap_or_default()
    }

    /// Returns the private key or a configuration error naming `usage`.
    pub(crate) fn require_private_key(&self, usage: CredentialUsage) -> SamlResult<&[u8]> {
        self.private_key_der().ok_or_else(|| {
            SamlError::Configuration(format!("{usage:?} credential has no private key"))
        })
    }
}

impl fmt::Debug for X509Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X509Credential")
            .field("subject", &self.subject())
            .field("private_key", &self.private_key_der.as_ref().map(|_| "[REDACTED]"))
            .field("usages", &self.usages)
            .finish()
    }
}
