//! SAML Response types.
//!
//! Response messages sent by an identity provider to this service provider,
//! together with the XML-Enc structures that wrap encrypted assertions and
//! identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assertion::parse_instant;
use super::{Assertion, Status};
use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

/// SAML Response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Timestamp when this response was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_instant: Option<DateTime<Utc>>,

    /// The entity ID of the identity provider that issued this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// The ID of the request this response is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The URL this response declares it was sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The status of the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Plaintext assertions, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,

    /// Encrypted assertions, in document order.
    #[serde(skip)]
    pub encrypted_assertions: Vec<EncryptedElement>,

    /// Whether the response carries an enveloped `ds:Signature` child.
    #[serde(skip)]
    pub signed: bool,
}

impl Response {
    /// Parses a `samlp:Response` document.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        Self::from_element(&XmlElement::parse(xml)?)
    }

    /// Reads a `samlp:Response` element.
    pub fn from_element(element: &XmlElement) -> SamlResult<Self> {
        if element.name != "Response" {
            return Err(SamlError::MalformedMessage(format!(
                "expected Response, found {}",
                element.name
            )));
        }
        let id = element
            .attr("ID")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SamlError::MalformedMessage("response has no ID".to_string()))?
            .to_string();

        Ok(Self {
            id,
            issue_instant: parse_instant(element.attr("IssueInstant"))?,
            issuer: element.child_text("Issuer").map(str::to_string),
            in_response_to: element.attr("InResponseTo").map(str::to_string),
            destination: element.attr("Destination").map(str::to_string),
            status: element.child("Status").map(Status::from_element),
            assertions: element
                .children_named("Assertion")
                .map(Assertion::from_element)
                .collect::<SamlResult<Vec<_>>>()?,
            encrypted_assertions: element
                .children_named("EncryptedAssertion")
                .map(EncryptedElement::from_element)
                .collect::<SamlResult<Vec<_>>>()?,
            signed: element.child("Signature").is_some(),
        })
    }

    /// Returns true unless the response carries a non-success status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_ref().map_or(true, Status::is_success)
    }
}

/// An `EncryptedAssertion` or `EncryptedID`: encrypted data plus any
/// `EncryptedKey` siblings.
#[derive(Debug, Clone)]
pub struct EncryptedElement {
    /// The encrypted data.
    pub encrypted_data: EncryptedData,

    /// Keys carried next to the encrypted data rather than in its `KeyInfo`.
    pub encrypted_keys: Vec<EncryptedKey>,
}

impl EncryptedElement {
    /// Reads an element wrapping `xenc:EncryptedData`.
    pub fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let data = element.child("EncryptedData").ok_or_else(|| {
            SamlError::MalformedMessage(format!("{} has no EncryptedData", element.name))
        })?;
        Ok(Self {
            encrypted_data: EncryptedData::from_element(data)?,
            encrypted_keys: element
                .children_named("EncryptedKey")
                .map(EncryptedKey::from_element)
                .collect::<SamlResult<Vec<_>>>()?,
        })
    }

    /// Returns the encrypted keys to try, `KeyInfo` first.
    pub fn keys(&self) -> impl Iterator<Item = &EncryptedKey> {
        self.encrypted_data
            .key_info
            .as_ref()
            .and_then(|k| k.encrypted_key.as_ref())
            .into_iter()
            .chain(self.encrypted_keys.iter())
    }
}

/// Encrypted data structure.
#[derive(Debug, Clone)]
pub struct EncryptedData {
    /// The content encryption algorithm.
    pub encryption_method: Option<String>,

    /// Key info for decryption.
    pub key_info: Option<KeyInfo>,

    /// The cipher data.
    pub cipher_data: CipherData,
}

impl EncryptedData {
    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            encryption_method: algorithm_of(element),
            key_info: element
                .child("KeyInfo")
                .map(|k| -> SamlResult<KeyInfo> {
                    Ok(KeyInfo {
                        encrypted_key: k
                            .child("EncryptedKey")
                            .map(EncryptedKey::from_element)
                            .transpose()?,
                        key_name: k.child_text("KeyName").map(str::to_string),
                    })
                })
                .transpose()?,
            cipher_data: CipherData::from_parent(element)?,
        })
    }
}

/// Key information for decryption.
#[derive(Debug, Clone, Default)]
pub struct KeyInfo {
    /// Encrypted key data.
    pub encrypted_key: Option<EncryptedKey>,

    /// Key name.
    pub key_name: Option<String>,
}

/// Encrypted key data.
#[derive(Debug, Clone)]
pub struct EncryptedKey {
    /// The key transport algorithm.
    pub encryption_method: Option<String>,

    /// The cipher data containing the encrypted key.
    pub cipher_data: CipherData,
}

impl EncryptedKey {
    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            encryption_method: algorithm_of(element),
            cipher_data: CipherData::from_parent(element)?,
        })
    }
}

/// Cipher data.
#[derive(Debug, Clone)]
pub struct CipherData {
    /// The cipher value, base64 encoded with whitespace removed.
    pub cipher_value: String,
}

impl CipherData {
    fn from_parent(element: &XmlElement) -> SamlResult<Self> {
        let value = element
            .child("CipherData")
            .and_then(|c| c.child("CipherValue"))
            .ok_or_else(|| {
                SamlError::MalformedMessage(format!("{} has no CipherValue", element.name))
            })?;
        Ok(Self {
            cipher_value: value.text.split_whitespace().collect(),
        })
    }
}

fn algorithm_of(element: &XmlElement) -> Option<String> {
    element
        .child("EncryptionMethod")
        .and_then(|m| m.attr("Algorithm"))
        .map(str::to_string)
}
