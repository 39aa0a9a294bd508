//! Protocol codec context.
//!
//! The XML signature and encryption services are passed explicitly to the
//! request factory and the response validator. Nothing in this crate keeps
//! them in global state.

use std::fmt;
use std::sync::Arc;

use crate::encryption::{XmlDecrypter, XmlEncryptionService};
use crate::signature::{RsaXmlSignatureService, XmlSignatureService};

/// XML security services used by one service provider.
#[derive(Clone)]
pub struct SamlContext {
    /// Signature creation and verification.
    pub signatures: Arc<dyn XmlSignatureService>,
    /// Decryption of encrypted assertions and identifiers.
    pub encryption: Arc<dyn XmlEncryptionService>,
}

impl SamlContext {
    /// Creates a context from explicit services.
    #[must_use]
    pub fn new(
        signatures: Arc<dyn XmlSignatureService>,
        encryption: Arc<dyn XmlEncryptionService>,
    ) -> Self {
        Self {
            signatures,
            encryption,
        }
    }
}

impl Default for SamlContext {
    fn default() -> Self {
        Self::new(
            Arc::new(RsaXmlSignatureService::new()),
            Arc::new(XmlDecrypter::new()),
        )
    }
}

impl fmt::Debug for SamlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamlContext").finish_non_exhaustive()
    }
}
