//! SAML Assertion types.
//!
//! Assertions contain statements about a subject made by an issuer. The types
//! here are read from inbound documents; they are never written back out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EncryptedElement, NameId, SUBJECT_CONFIRMATION_BEARER};
use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

/// SAML Assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Timestamp when this assertion was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_instant: Option<DateTime<Utc>>,

    /// The entity ID of the identity provider that issued this assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// The subject of this assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,

    /// Conditions that must be evaluated for the assertion to be valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,

    /// Authentication statements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authn_statements: Vec<AuthnStatement>,

    /// Attributes from all attribute statements, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    /// Whether the assertion carries an enveloped `ds:Signature` child.
    #[serde(skip)]
    pub signed: bool,
}

impl Assertion {
    /// Reads a `saml:Assertion` element.
    pub fn from_element(element: &XmlElement) -> SamlResult<Self> {
        let id = element
            .attr("ID")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SamlError::MalformedMessage("assertion has no ID".to_string()))?
            .to_string();

        let subject = element.child("Subject").map(Subject::from_element).transpose()?;
        let conditions = element
            .child("Conditions")
            .map(Conditions::from_element)
            .transpose()?;
        let authn_statements = element
            .children_named("AuthnStatement")
            .map(AuthnStatement::from_element)
            .collect::<SamlResult<Vec<_>>>()?;
        let attributes = element
            .children_named("AttributeStatement")
            .flat_map(|s| s.children_named("Attribute"))
            .map(Attribute::from_element)
            .collect();

        Ok(Self {
            id,
            issue_instant: parse_instant(element.attr("IssueInstant"))?,
            issuer: element.child_text("Issuer").map(str::to_string),
            subject,
            conditions,
            authn_statements,
            attributes,
            signed: element.child("Signature").is_some(),
        })
    }

    /// Returns the first session index of the authentication statements.
    #[must_use]
    pub fn session_index(&self) -> Option<&str> {
        self.authn_statements
            .iter()
            .find_map(|s| s.session_index.as_deref())
    }
}

/// Subject of an assertion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subject {
    /// The plaintext name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id: Option<NameId>,

    /// The encrypted name identifier.
    #[serde(skip)]
    pub encrypted_id: Option<EncryptedElement>,

    /// Subject confirmations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            name_id: element.child("NameID").map(NameId::from_element),
            encrypted_id: element
                .child("EncryptedID")
                .map(EncryptedElement::from_element)
                .transpose()?,
            subject_confirmations: element
                .children_named("SubjectConfirmation")
                .map(SubjectConfirmation::from_element)
                .collect::<SamlResult<Vec<_>>>()?,
        })
    }
}

/// Subject confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// The confirmation method.
    pub method: String,

    /// Additional confirmation data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_confirmation_data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            method: element.attr("Method").unwrap_or_default().to_string(),
            subject_confirmation_data: element
                .child("SubjectConfirmationData")
                .map(SubjectConfirmationData::from_element)
                .transpose()?,
        })
    }

    /// Returns true for the bearer confirmation method.
    #[must_use]
    pub fn is_bearer(&self) -> bool {
        self.method == SUBJECT_CONFIRMATION_BEARER
    }
}

/// Subject confirmation data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    /// Not valid before this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// Not valid on or after this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// The URL the assertion must be delivered to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// The request ID this confirmation responds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,
}

impl SubjectConfirmationData {
    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            not_before: parse_instant(element.attr("NotBefore"))?,
            not_on_or_after: parse_instant(element.attr("NotOnOrAfter"))?,
            recipient: element.attr("Recipient").map(str::to_string),
            in_response_to: element.attr("InResponseTo").map(str::to_string),
        })
    }
}

/// Assertion conditions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conditions {
    /// Not valid before this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// Not valid on or after this time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Audience restrictions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audience_restrictions: Vec<AudienceRestriction>,

    /// Whether a `OneTimeUse` condition is present.
    #[serde(default)]
    pub one_time_use: bool,
}

impl Conditions {
    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            not_before: parse_instant(element.attr("NotBefore"))?,
            not_on_or_after: parse_instant(element.attr("NotOnOrAfter"))?,
            audience_restrictions: element
                .children_named("AudienceRestriction")
                .map(|r| AudienceRestriction {
                    audiences: r.children_named("Audience").map(|a| a.text.clone()).collect(),
                })
                .collect(),
            one_time_use: element.child("OneTimeUse").is_some(),
        })
    }
}

/// Audience restriction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudienceRestriction {
    /// Permitted audiences.
    pub audiences: Vec<String>,
}

/// Authentication statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// When authentication occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_instant: Option<DateTime<Utc>>,

    /// Session index at the identity provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,

    /// Authentication context class reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_context_class_ref: Option<String>,
}

impl AuthnStatement {
    fn from_element(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            authn_instant: parse_instant(element.attr("AuthnInstant"))?,
            session_index: element.attr("SessionIndex").map(str::to_string),
            authn_context_class_ref: element
                .child("AuthnContext")
                .and_then(|c| c.child_text("AuthnContextClassRef"))
                .map(str::to_string),
        })
    }
}

/// Attribute with its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,

    /// Attribute values.
    pub values: Vec<String>,
}

impl Attribute {
    fn from_element(element: &XmlElement) -> Self {
        Self {
            name: element.attr("Name").unwrap_or_default().to_string(),
            friendly_name: element.attr("FriendlyName").map(str::to_string),
            values: element
                .children_named("AttributeValue")
                .map(|v| v.text.clone())
                .collect(),
        }
    }
}

/// Parses an optional `xs:dateTime` attribute.
pub(crate) fn parse_instant(value: Option<&str>) -> SamlResult<Option<DateTime<Utc>>> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| SamlError::MalformedMessage(format!("invalid timestamp '{v}': {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSERTION: &str = r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_a1" IssueInstant="2024-01-01T10:00:00Z" Version="2.0">
        <saml:Issuer>https://idp.example</saml:Issuer>
        <saml:Subject>
            <saml:NameID>alice</saml:NameID>
            <saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">
                <saml:SubjectConfirmationData NotOnOrAfter="2024-01-01T10:05:00Z" Recipient="https://sp.example/acs"/>
            </saml:SubjectConfirmation>
        </saml:Subject>
        <saml:Conditions NotBefore="2024-01-01T09:59:00.000Z" NotOnOrAfter="2024-01-01T10:05:00Z">
            <saml:AudienceRestriction><saml:Audience>https://sp.example</saml:Audience></saml:AudienceRestriction>
        </saml:Conditions>
        <saml:AuthnStatement AuthnInstant="2024-01-01T10:00:00Z" SessionIndex="s-1">
            <saml:AuthnContext><saml:AuthnContextClassRef>urn:oasis:names:tc:SAML:2.0:ac:classes:Password</saml:AuthnContextClassRef></saml:AuthnContext>
        </saml:AuthnStatement>
        <saml:AttributeStatement>
            <saml:Attribute Name="email"><saml:AttributeValue>alice@example.com</saml:AttributeValue></saml:Attribute>
            <saml:Attribute Name="groups"><saml:AttributeValue>a</saml:AttributeValue><saml:AttributeValue>b</saml:AttributeValue></saml:Attribute>
        </saml:AttributeStatement>
    </saml:Assertion>"#;

    #[test]
    fn assertion_from_element() {
        let assertion = Assertion::from_element(&XmlElement::parse(ASSERTION).unwrap()).unwrap();
        assert_eq!(assertion.id, "_a1");
        assert_eq!(assertion.issuer.as_deref(), Some("https://idp.example"));
        assert!(!assertion.signed);

        let subject = assertion.subject.as_ref().unwrap();
        assert_eq!(subject.name_id.as_ref().map(|n| n.value.as_str()), Some("alice"));
        assert!(subject.subject_confirmations[0].is_bearer());
        let data = subject.subject_confirmations[0]
            .subject_confirmation_data
            .as_ref()
            .unwrap();
        assert_eq!(data.recipient.as_deref(), Some("https://sp.example/acs"));

        let conditions = assertion.conditions.as_ref().unwrap();
        assert!(conditions.not_before.is_some());
        assert_eq!(conditions.audience_restrictions[0].audiences, vec!["https://sp.example"]);

        assert_eq!(assertion.session_index(), Some("s-1"));
        assert_eq!(assertion.attributes.len(), 2);
        assert_eq!(assertion.attributes[1].values, vec!["a", "b"]);
    }

    #[test]
    fn assertion_requires_id_and_valid_instants() {
        let no_id = r#"<Assertion><Issuer>x</Issuer></Assertion>"#;
        assert!(Assertion::from_element(&XmlElement::parse(no_id).unwrap()).is_err());

        let bad_time = r#"<Assertion ID="a"><Conditions NotBefore="yesterday"/></Assertion>"#;
        assert!(matches!(
            Assertion::from_element(&XmlElement::parse(bad_time).unwrap()),
            Err(SamlError::MalformedMessage(_))
        ));
    }
}
