//! SAML Name ID types.

use serde::{Deserialize, Serialize};

use super::NameIdFormat;
use crate::xml::XmlElement;

/// SAML Name ID.
///
/// The identifier of the subject an assertion is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The actual identifier value.
    pub value: String,

    /// The format of the name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The security or administrative domain that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_qualifier: Option<String>,

    /// The service provider's entity ID that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,
}

impl NameId {
    /// Creates a new name ID with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }

    /// Reads a `saml:NameID` element.
    #[must_use]
    pub fn from_element(element: &XmlElement) -> Self {
        Self {
            value: element.text.clone(),
            format: element.attr("Format").map(str::to_string),
            name_qualifier: element.attr("NameQualifier").map(str::to_string),
            sp_name_qualifier: element.attr("SPNameQualifier").map(str::to_string),
        }
    }

    /// Returns the parsed format, if it is a known one.
    #[must_use]
    pub fn known_format(&self) -> Option<NameIdFormat> {
        self.format.as_deref().and_then(NameIdFormat::from_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_id_from_element() {
        let xml = r#"<saml:NameID xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"
            Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress"
            SPNameQualifier="https://sp.example">alice@example.com</saml:NameID>"#;
        let name_id = NameId::from_element(&XmlElement::parse(xml).unwrap());
        assert_eq!(name_id.value, "alice@example.com");
        assert_eq!(name_id.known_format(), Some(NameIdFormat::Email));
        assert_eq!(name_id.sp_name_qualifier.as_deref(), Some("https://sp.example"));
        assert!(name_id.name_qualifier.is_none());
    }
}
