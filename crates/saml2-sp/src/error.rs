//! SAML error types.
//!
//! Every failure of a login attempt maps to exactly one [`SamlError`] variant.
//! Per-assertion validation failures never surface individually: they collapse
//! into [`SamlError::NoValidAssertion`] so callers cannot learn which check
//! rejected a candidate.

use thiserror::Error;

use crate::types::status_codes;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML service provider errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Invalid configuration: bad binding value, empty required registration
    /// field, missing credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No registration matches the requested id or the response issuer.
    #[error("relying party registration not found: {0}")]
    ProviderNotFound(String),

    /// The response was delivered to a URL other than its declared destination.
    #[error("invalid destination: expected {expected}, got {actual}")]
    DestinationMismatch {
        /// The URL the response was actually delivered to.
        expected: String,
        /// The destination declared by the response.
        actual: String,
    },

    /// XML or query-string signature verification failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// Every decryption credential failed.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// No assertion passed validation.
    #[error("no valid assertion found in response")]
    NoValidAssertion,

    /// The accepted assertion carries no extractable subject identifier.
    #[error("assertion is missing a user identifier")]
    MissingUserIdentifier,

    /// The message could not be decoded or parsed.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Outbound signing failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// Key material could not be parsed or used.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Returns a stable, machine readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "invalid_configuration",
            Self::ProviderNotFound(_) => "relying_party_registration_not_found",
            Self::DestinationMismatch { .. } => "invalid_destination",
            Self::SignatureInvalid(_) => "invalid_signature",
            Self::DecryptionFailed(_) => "decryption_error",
            Self::NoValidAssertion => "invalid_assertion",
            Self::MissingUserIdentifier => "subject_not_found",
            Self::MalformedMessage(_) => "malformed_response_data",
            Self::SignatureCreation(_) => "signature_creation_failed",
            Self::Crypto(_) => "invalid_credential",
        }
    }

    /// Returns the SAML status code that best describes this error.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::DestinationMismatch { .. }
            | Self::SignatureInvalid(_)
            | Self::NoValidAssertion
            | Self::MissingUserIdentifier
            | Self::MalformedMessage(_) => status_codes::REQUESTER,
            Self::ProviderNotFound(_) => status_codes::UNKNOWN_PRINCIPAL,
            Self::Configuration(_)
            | Self::DecryptionFailed(_)
            | Self::SignatureCreation(_)
            | Self::Crypto(_) => status_codes::RESPONDER,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MalformedMessage(_) | Self::DestinationMismatch { .. } => 400,
            Self::SignatureInvalid(_)
            | Self::DecryptionFailed(_)
            | Self::NoValidAssertion
            | Self::MissingUserIdentifier => 401,
            Self::ProviderNotFound(_) => 404,
            Self::Configuration(_) | Self::SignatureCreation(_) | Self::Crypto(_) => 500,
        }
    }

    /// Returns true if the error rejects the caller's message rather than
    /// reporting a local fault.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(self.http_status(), 400 | 401)
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::MalformedMessage(format!("xml parse error: {err}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::MalformedMessage(format!("xml attribute error: {err}"))
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::MalformedMessage(format!("base64 decode error: {err}"))
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::MalformedMessage(format!("inflate error: {err}"))
    }
}

impl From<std::string::FromUtf8Error> for SamlError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::MalformedMessage(format!("invalid utf-8 in message: {err}"))
    }
}

impl From<saml2_crypto::CryptoError> for SamlError {
    fn from(err: saml2_crypto::CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_and_statuses() {
        let err = SamlError::DestinationMismatch {
            expected: "https://sp.example/acs".to_string(),
            actual: "https://evil.example/acs".to_string(),
        };
        assert_eq!(err.code(), "invalid_destination");
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.status_code(), status_codes::REQUESTER);
        assert!(err.to_string().contains("https://evil.example/acs"));

        let err = SamlError::ProviderNotFound("idp1".to_string());
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.status_code(), status_codes::UNKNOWN_PRINCIPAL);

        let err = SamlError::Configuration("bad".to_string());
        assert_eq!(err.http_status(), 500);
        assert!(!err.is_authentication_failure());
        assert!(SamlError::NoValidAssertion.is_authentication_failure());
    }

    #[test]
    fn decode_errors_are_malformed_messages() {
        use base64::Engine;

        let err: SamlError = base64::engine::general_purpose::STANDARD
            .decode("not base64!!")
            .unwrap_err()
            .into();
        assert!(matches!(err, SamlError::MalformedMessage(_)));
        assert_eq!(err.code(), "malformed_response_data");
    }
}
