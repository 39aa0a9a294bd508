//! SAML Status types.

use serde::{Deserialize, Serialize};

use super::status_codes;
use crate::xml::XmlElement;

/// SAML protocol status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The status code.
    pub status_code: StatusCode,

    /// Optional status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status_code: StatusCode::new(status_codes::SUCCESS),
            status_message: None,
        }
    }

    /// Reads a `samlp:Status` element. A missing `StatusCode` is treated as
    /// an empty (non-success) code.
    #[must_use]
    pub fn from_element(element: &XmlElement) -> Self {
        Self {
            status_code: element
                .child("StatusCode")
                .map(StatusCode::from_element)
                .unwrap_or_else(|| StatusCode::new("")),
            status_message: element.child_text("StatusMessage").map(str::to_string),
        }
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}

/// SAML status code, optionally nested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    /// The status code URI value.
    pub value: String,

    /// Optional nested status code providing more detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// Creates a new status code with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status_code: None,
        }
    }

    fn from_element(element: &XmlElement) -> Self {
        Self {
            value: element.attr("Value").unwrap_or_default().to_string(),
            status_code: element
                .child("StatusCode")
                .map(|sub| Box::new(Self::from_element(sub))),
        }
    }

    /// Returns true if this is a success status code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.value == status_codes::SUCCESS
    }

    /// Returns the sub-status code value if present.
    #[must_use]
    pub fn sub_status_value(&self) -> Option<&str> {
        self.status_code.as_ref().map(|s| s.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_element() {
        let xml = r#"<samlp:Status xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol">
            <samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Requester">
                <samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:AuthnFailed"/>
            </samlp:StatusCode>
            <samlp:StatusMessage>bad password</samlp:StatusMessage>
        </samlp:Status>"#;
        let status = Status::from_element(&XmlElement::parse(xml).unwrap());
        assert!(!status.is_success());
        assert_eq!(status.status_code.sub_status_value(), Some(status_codes::AUTHN_FAILED));
        assert_eq!(status.status_message.as_deref(), Some("bad password"));
    }

    #[test]
    fn missing_status_code_is_not_success() {
        let status = Status::from_element(&XmlElement::parse("<Status/>").unwrap());
        assert!(!status.is_success());
        assert!(Status::default().is_success());
    }
}
