//! SAML bindings implementation.
//!
//! Encodes and decodes protocol messages per transport:
//!
//! - **HTTP-Redirect** - deflate (raw), base64, then percent-encoding into the
//!   query string
//! - **HTTP-POST** - base64 into a hidden field of an auto-submitting form
//!
//! Detached ("simple sign") signatures are computed by [`simple_sign`] over
//! the parameters in their fixed order `SAMLRequest`, `RelayState`, `SigAlg`.

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::credential::X509Credential;
use crate::error::{SamlError, SamlResult};
use crate::signature::{SignatureAlgorithm, XmlSignatureService};

/// Message bindings a registration can use to reach the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Saml2MessageBinding {
    /// HTTP-POST with an enveloped XML signature.
    Post,
    /// HTTP-Redirect with a detached query-string signature.
    #[default]
    Redirect,
    /// HTTP-Redirect carrying an enveloped XML signature.
    RedirectXmlSignature,
    /// HTTP-POST with a detached form-parameter signature.
    PostSimpleSign,
}

impl Saml2MessageBinding {
    /// Every binding, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Post,
        Self::Redirect,
        Self::RedirectXmlSignature,
        Self::PostSimpleSign,
    ];

    /// Returns the binding URN.
    #[must_use]
    pub const fn urn(&self) -> &'static str {
        match self {
            Self::Post => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
            Self::Redirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
            Self::RedirectXmlSignature => "urn:oasis:names:tc:SAML:2.0:bindings:URI",
            Self::PostSimpleSign => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST-SimpleSign",
        }
    }

    /// Parses a binding from its URN.
    #[must_use]
    pub fn from_urn(urn: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.urn() == urn)
    }

    /// Parses a binding from configuration; an unknown URN is a
    /// configuration error naming the value.
    pub fn parse(urn: &str) -> SamlResult<Self> {
        Self::from_urn(urn)
            .ok_or_else(|| SamlError::Configuration(format!("unsupported message binding: {urn}")))
    }

    /// Returns true if the message travels in a redirect URL.
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect | Self::RedirectXmlSignature)
    }

    /// Returns true if the binding carries an enveloped XML signature.
    #[must_use]
    pub const fn uses_xml_signature(&self) -> bool {
        matches!(self, Self::Post | Self::RedirectXmlSignature)
    }
}

impl fmt::Display for Saml2MessageBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.urn())
    }
}

impl Serialize for Saml2MessageBinding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.urn())
    }
}

impl<'de> Deserialize<'de> for Saml2MessageBinding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let urn = String::deserialize(deserializer)?;
        Self::parse(&urn).map_err(serde::de::Error::custom)
    }
}

/// HTTP method a message was delivered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`: the message is deflated.
    Get,
    /// `POST`: the message is not deflated.
    Post,
}

impl HttpMethod {
    /// Parses a method name, case-insensitively.
    pub fn parse(method: &str) -> SamlResult<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(SamlError::MalformedMessage(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest message.
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// Decoded SAML binding message.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The decoded XML message.
    pub xml: String,
    /// The message type (request or response).
    pub message_type: SamlMessageType,
    /// The RelayState if present.
    pub relay_state: Option<String>,
    /// The signature (for simple-sign bindings).
    pub signature: Option<String>,
    /// The signature algorithm (for simple-sign bindings).
    pub sig_alg: Option<String>,
}

/// A detached signature ready to be appended as `SigAlg` / `Signature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleSignature {
    /// Signature algorithm URI.
    pub sig_alg: String,
    /// Base64 signature value.
    pub signature: String,
}

/// Encodes a message for the transport of `binding`.
///
/// Redirect bindings deflate before base64; POST bindings only base64. The
/// result is not yet escaped for its final URL or HTML context.
pub fn encode(xml: &str, binding: Saml2MessageBinding) -> SamlResult<String> {
    if binding.is_redirect() {
        HttpRedirectBinding::encode_message(xml)
    } else {
        Ok(HttpPostBinding::encode_message(xml))
    }
}

/// Decodes a `SAMLRequest`/`SAMLResponse` value delivered with `method`.
///
/// `GET` values are inflated after base64 decoding; `POST` values are not.
pub fn decode(value: &str, method: HttpMethod) -> SamlResult<String> {
    match method {
        HttpMethod::Get => HttpRedirectBinding::decode_message(value),
        HttpMethod::Post => HttpPostBinding::decode_message(value),
    }
}

/// Builds the octets a simple signature covers.
///
/// Redirect bindings sign the percent-encoded query string; POST simple-sign
/// signs the raw parameter values.
#[must_use]
pub fn simple_sign_content(
    binding: Saml2MessageBinding,
    message_type: SamlMessageType,
    encoded_message: &str,
    relay_state: Option<&str>,
    sig_alg: &str,
) -> String {
    let escape = |v: &str| -> String {
        if binding.is_redirect() {
            latin1_percent_encode(v)
        } else {
            v.to_string()
        }
    };
    let mut content = format!("{}={}", message_type.form_param(), escape(encoded_message));
    if let Some(rs) = relay_state {
        content.push_str("&RelayState=");
        content.push_str(&escape(rs));
    }
    content.push_str("&SigAlg=");
    content.push_str(&escape(sig_alg));
    content
}

/// Computes a simple signature with `credential`.
pub fn simple_sign(
    signatures: &dyn XmlSignatureService,
    credential: &X509Credential,
    algorithm: SignatureAlgorithm,
    binding: Saml2MessageBinding,
    message_type: SamlMessageType,
    encoded_message: &str,
    relay_state: Option<&str>,
) -> SamlResult<SimpleSignature> {
    let sig_alg = algorithm.uri();
    let content = simple_sign_content(binding, message_type, encoded_message, relay_state, sig_alg);
    let signature = signatures.sign_detached(content.as_bytes(), credential, algorithm)?;
    Ok(SimpleSignature {
        sig_alg: sig_alg.to_string(),
        signature: base64::engine::general_purpose::STANDARD.encode(signature),
    })
}

/// Verifies a simple signature against each credential in order, accepting
/// on the first that validates.
pub fn verify_simple_signature<'a>(
    signatures: &dyn XmlSignatureService,
    credentials: impl IntoIterator<Item = &'a X509Credential>,
    binding: Saml2MessageBinding,
    message_type: SamlMessageType,
    encoded_message: &str,
    relay_state: Option<&str>,
    signature: &SimpleSignature,
) -> SamlResult<()> {
    let algorithm = SignatureAlgorithm::from_uri(&signature.sig_alg).ok_or_else(|| {
        SamlError::SignatureInvalid(format!("unknown signature algorithm: {}", signature.sig_alg))
    })?;
    let raw = base64::engine::general_purpose::STANDARD
        .decode(signature.signature.split_whitespace().collect::<String>())
        .map_err(|e| SamlError::SignatureInvalid(format!("invalid signature encoding: {e}")))?;
    let content = simple_sign_content(
        binding,
        message_type,
        encoded_message,
        relay_state,
        &signature.sig_alg,
    );

    if credentials
        .into_iter()
        .any(|c| signatures.verify_detached(content.as_bytes(), &raw, c, algorithm).is_ok())
    {
        Ok(())
    } else {
        Err(SamlError::SignatureInvalid(
            "signature verification failed with all credentials".to_string(),
        ))
    }
}
