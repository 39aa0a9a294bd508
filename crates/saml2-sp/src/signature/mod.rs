//! XML Signature support for SAML.
//!
//! Signing and verification are reached through the [`XmlSignatureService`]
//! trait so the request factory and response validator can be exercised with
//! test doubles. [`RsaXmlSignatureService`] is the aws-lc-rs backed default.
//!
//! # Signing Algorithms
//!
//! - RSA-SHA256 (default)
//! - RSA-SHA384
//! - RSA-SHA512

mod signer;
mod validator;

use serde::{Deserialize, Serialize};

use saml2_crypto::{DigestAlgorithm, RsaSignatureAlgorithm};

use crate::credential::X509Credential;
use crate::error::SamlResult;
use crate::types::digest_algorithms;

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256.
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        self.rsa().xml_dsig_uri()
    }

    /// Returns the corresponding digest algorithm URI.
    #[must_use]
    pub const fn digest_uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => digest_algorithms::SHA256,
            Self::RsaSha384 => digest_algorithms::SHA384,
            Self::RsaSha512 => digest_algorithms::SHA512,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        [Self::RsaSha256, Self::RsaSha384, Self::RsaSha512]
            .into_iter()
            .find(|a| a.uri() == uri)
    }

    pub(crate) const fn rsa(&self) -> RsaSignatureAlgorithm {
        match self {
            Self::RsaSha256 => RsaSignatureAlgorithm::Rs256,
            Self::RsaSha384 => RsaSignatureAlgorithm::Rs384,
            Self::RsaSha512 => RsaSignatureAlgorithm::Rs512,
        }
    }

    pub(crate) const fn digest(&self) -> DigestAlgorithm {
        match self {
            Self::RsaSha256 => DigestAlgorithm::Sha256,
            Self::RsaSha384 => DigestAlgorithm::Sha384,
            Self::RsaSha512 => DigestAlgorithm::Sha512,
        }
    }
}

/// Maps a `ds:DigestMethod` URI to a digest algorithm.
pub(crate) fn digest_from_uri(uri: &str) -> Option<DigestAlgorithm> {
    match uri {
        digest_algorithms::SHA1 => Some(DigestAlgorithm::Sha1),
        digest_algorithms::SHA256 => Some(DigestAlgorithm::Sha256),
        digest_algorithms::SHA384 => Some(DigestAlgorithm::Sha384),
        digest_algorithms::SHA512 => Some(DigestAlgorithm::Sha512),
        _ => None,
    }
}

/// XML-DSig operations used by the service provider.
///
/// Verification methods return `Ok(())` only for a valid signature; every
/// failure, including an unusable credential, is an error.
pub trait XmlSignatureService: Send + Sync {
    /// Signs the element carrying `ID="reference_id"` with an enveloped
    /// signature placed after its `Issuer` child, and returns the document.
    fn sign_enveloped(
        &self,
        xml: &str,
        reference_id: &str,
        credential: &X509Credential,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<String>;

    /// Verifies the enveloped signature of the element carrying
    /// `ID="reference_id"` against `credential`.
    fn verify_enveloped(
        &self,
        xml: &str,
        reference_id: &str,
        credential: &X509Credential,
    ) -> SamlResult<()>;

    /// Produces a detached signature over `data`.
    fn sign_detached(
        &self,
        data: &[u8],
        credential: &X509Credential,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<Vec<u8>>;

    /// Verifies a detached signature over `data`.
    fn verify_detached(
        &self,
        data: &[u8],
        signature: &[u8],
        credential: &X509Credential,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<()>;
}

/// RSA XML-DSig service with a whitespace-normalizing canonical form.
#[derive(Debug, Clone)]
pub struct RsaXmlSignatureService {
    include_certificate: bool,
}

impl Default for RsaXmlSignatureService {
    fn default() -> Self {
        Self {
            include_certificate: true,
        }
    }
}

impl RsaXmlSignatureService {
    /// Creates the default service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Controls whether `ds:KeyInfo` carries the signing certificate.
    #[must_use]
    pub const fn with_certificate(mut self, include: bool) -> Self {
        self.include_certificate = include;
        self
    }
}

impl XmlSignatureService for RsaXmlSignatureService {
    fn sign_enveloped(
        &self,
        xml: &str,
        reference_id: &str,
        credential: &X509Credential,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<String> {
        signer::sign_enveloped(xml, reference_id, credential, algorithm, self.include_certificate)
    }

    fn verify_enveloped(
        &self,
        xml: &str,
        reference_id: &str,
        credential: &X509Credential,
    ) -> SamlResult<()> {
        validator::verify_enveloped(xml, reference_id, credential)
    }

    fn sign_detached(
        &self,
        data: &[u8],
        credential: &X509Credential,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<Vec<u8>> {
        signer::sign_data(data, credential, algorithm)
    }

    fn verify_detached(
        &self,
        data: &[u8],
        signature: &[u8],
        credential: &X509Credential,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<()> {
        validator::verify_data(data, signature, credential, algorithm)
    }
}
