//! Test fixtures.
//!
//! Key material for a fictional identity provider and service provider, a
//! preconfigured registration, and an identity-provider side response
//! builder that signs and encrypts with the same services the validator
//! checks against.
//!
//! Available to this crate's tests and, through the `test-support` feature,
//! to downstream test crates. Fixture helpers panic on bad key material.

#![allow(clippy::missing_panics_doc)]

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};

use crate::bindings::Saml2MessageBinding;
use crate::credential::{CredentialUsage, X509Credential};
use crate::encryption::XmlEncrypter;
use crate::registration::{RelyingPartyRegistration, RelyingPartyRegistrationBuilder};
use crate::signature::{RsaXmlSignatureService, SignatureAlgorithm, XmlSignatureService};
use crate::types::{status_codes, NameIdFormat, SAMLP_NS, SAML_NS, SUBJECT_CONFIRMATION_BEARER};
use crate::xml::escape;

/// Identity provider certificate.
pub const IDP_CERTIFICATE: &str = include_str!("../testdata/idp.crt");
/// Identity provider private key (PKCS#8).
pub const IDP_PRIVATE_KEY: &str = include_str!("../testdata/idp.key");
/// Replacement identity provider certificate, used for rollover tests.
pub const IDP_ROTATED_CERTIFICATE: &str = include_str!("../testdata/idp-rotated.crt");
/// Replacement identity provider private key.
pub const IDP_ROTATED_PRIVATE_KEY: &str = include_str!("../testdata/idp-rotated.key");
/// Service provider certificate.
pub const SP_CERTIFICATE: &str = include_str!("../testdata/sp.crt");
/// Service provider private key (PKCS#8).
pub const SP_PRIVATE_KEY: &str = include_str!("../testdata/sp.key");
/// Retired service provider certificate.
pub const SP_RETIRED_CERTIFICATE: &str = include_str!("../testdata/sp-retired.crt");
/// Retired service provider private key.
pub const SP_RETIRED_PRIVATE_KEY: &str = include_str!("../testdata/sp-retired.key");

/// Registration id used by [`registration`].
pub const REGISTRATION_ID: &str = "idp1";
/// Identity provider entity ID.
pub const IDP_ENTITY_ID: &str = "https://idp.example/metadata";
/// Identity provider single sign-on URL.
pub const IDP_SSO_URL: &str = "https://idp.example/sso";
/// Service provider base URL.
pub const SP_BASE_URL: &str = "https://sp.example";
/// Resolved local entity ID of [`registration`] at [`SP_BASE_URL`].
pub const SP_ENTITY_ID: &str = "https://sp.example/saml2/service-provider-metadata/idp1";
/// Resolved assertion consumer service URL of [`registration`] at [`SP_BASE_URL`].
pub const SP_ACS_URL: &str = "https://sp.example/login/saml2/sso/idp1";

fn credential(cert: &str, key: Option<&str>, usages: &[CredentialUsage]) -> X509Credential {
    X509Credential::from_pem(cert, key, usages.iter().copied()).expect("fixture credential")
}

/// The service provider's key pair for signing and decryption.
#[must_use]
pub fn sp_signing_credential() -> X509Credential {
    credential(
        SP_CERTIFICATE,
        Some(SP_PRIVATE_KEY),
        &[CredentialUsage::Signing, CredentialUsage::Decryption],
    )
}

/// The service provider's certificate, as the identity provider uses it to
/// verify requests.
#[must_use]
pub fn sp_verification_credential() -> X509Credential {
    credential(SP_CERTIFICATE, None, &[CredentialUsage::Verification])
}

/// The service provider's certificate, as the identity provider uses it to
/// encrypt assertions.
#[must_use]
pub fn sp_encryption_credential() -> X509Credential {
    credential(SP_CERTIFICATE, None, &[CredentialUsage::Encryption])
}

/// A retired service provider key pair for signing and decryption.
#[must_use]
pub fn retired_sp_credential() -> X509Credential {
    credential(
        SP_RETIRED_CERTIFICATE,
        Some(SP_RETIRED_PRIVATE_KEY),
        &[CredentialUsage::Signing, CredentialUsage::Decryption],
    )
}

/// The identity provider's signing key pair.
#[must_use]
pub fn idp_signing_credential() -> X509Credential {
    credential(IDP_CERTIFICATE, Some(IDP_PRIVATE_KEY), &[CredentialUsage::Signing])
}

/// The identity provider's rotated signing key pair.
#[must_use]
pub fn rotated_idp_signing_credential() -> X509Credential {
    credential(
        IDP_ROTATED_CERTIFICATE,
        Some(IDP_ROTATED_PRIVATE_KEY),
        &[CredentialUsage::Signing],
    )
}

/// The identity provider's certificate for verification and encryption.
#[must_use]
pub fn idp_verification_credential() -> X509Credential {
    credential(
        IDP_CERTIFICATE,
        None,
        &[CredentialUsage::Verification, CredentialUsage::Encryption],
    )
}

/// The identity provider's rotated certificate.
#[must_use]
pub fn rotated_idp_verification_credential() -> X509Credential {
    credential(
        IDP_ROTATED_CERTIFICATE,
        None,
        &[CredentialUsage::Verification, CredentialUsage::Encryption],
    )
}

/// A registration for [`IDP_ENTITY_ID`] trusting the identity provider
/// certificate and owning the service provider key pair.
#[must_use]
pub fn registration(binding: Saml2MessageBinding) -> RelyingPartyRegistrationBuilder {
    RelyingPartyRegistration::with_registration_id(REGISTRATION_ID)
        .remote_idp_entity_id(IDP_ENTITY_ID)
        .idp_web_sso_url(IDP_SSO_URL)
        .binding(binding)
        .credential(idp_verification_credential())
        .credential(sp_signing_credential())
}

/// The current instant truncated to the millisecond precision fixtures
/// render, so skew-edge arithmetic survives a render and parse.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Formats an instant the way assertions carry it.
#[must_use]
pub fn instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// An assertion issued by the fixture identity provider.
///
/// Defaults are valid for [`registration`] at [`SP_BASE_URL`].
#[derive(Debug, Clone)]
pub struct AssertionFixture {
    /// Assertion ID.
    pub id: String,
    /// Issuer entity ID.
    pub issuer: String,
    /// Issue instant.
    pub issued_at: DateTime<Utc>,
    /// Plaintext name identifier.
    pub name_id: Option<String>,
    /// Encrypt the name identifier for the service provider.
    pub encrypt_name_id: bool,
    /// Subject confirmation method.
    pub confirmation_method: String,
    /// Subject confirmation recipient.
    pub recipient: Option<String>,
    /// Audience; `None` omits the restriction.
    pub audience: Option<String>,
    /// `NotBefore` of the conditions and confirmation data.
    pub not_before: Option<DateTime<Utc>>,
    /// `NotOnOrAfter` of the conditions and confirmation data.
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// Session index of the authentication statement.
    pub session_index: Option<String>,
    /// Attribute statement content.
    pub attributes: Vec<(String, Vec<String>)>,
    /// Signing key; `None` leaves the assertion unsigned.
    pub signed_by: Option<X509Credential>,
}

impl AssertionFixture {
    /// Creates a valid assertion issued at `issued_at`.
    #[must_use]
    pub fn new(id: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            issuer: IDP_ENTITY_ID.to_string(),
            issued_at,
            name_id: Some("alice@example.com".to_string()),
            encrypt_name_id: false,
            confirmation_method: SUBJECT_CONFIRMATION_BEARER.to_string(),
            recipient: Some(SP_ACS_URL.to_string()),
            audience: Some(SP_ENTITY_ID.to_string()),
            not_before: Some(issued_at - Duration::minutes(1)),
            not_on_or_after: Some(issued_at + Duration::minutes(5)),
            session_index: Some("_session1".to_string()),
            attributes: vec![("email".to_string(), vec!["alice@example.com".to_string()])],
            signed_by: None,
        }
    }

    /// Signs the assertion with the fixture identity provider key.
    #[must_use]
    pub fn signed(mut self) -> Self {
        self.signed_by = Some(idp_signing_credential());
        self
    }

    /// Renders the assertion, signed when a signing key is set.
    #[must_use]
    pub fn render(&self) -> String {
        let mut xml = format!(
            r#"<saml:Assertion xmlns:saml="{SAML_NS}" ID="{}" Version="2.0" IssueInstant="{}">"#,
            escape(&self.id),
            instant(self.issued_at)
        );
        xml.push_str(&format!("<saml:Issuer>{}</saml:Issuer>", escape(&self.issuer)));
        xml.push_str(&self.render_subject());
        xml.push_str(&self.render_conditions());
        xml.push_str(&format!(
            r#"<saml:AuthnStatement AuthnInstant="{}"{}><saml:AuthnContext><saml:AuthnContextClassRef>urn:oasis:names:tc:SAML:2.0:ac:classes:Password</saml:AuthnContextClassRef></saml:AuthnContext></saml:AuthnStatement>"#,
            instant(self.issued_at),
            optional_attr("SessionIndex", self.session_index.as_deref()),
        ));
        if !self.attributes.is_empty() {
            xml.push_str("<saml:AttributeStatement>");
            for (name, values) in &self.attributes {
                xml.push_str(&format!(r#"<saml:Attribute Name="{}">"#, escape(name)));
                for value in values {
                    xml.push_str(&format!(
                        "<saml:AttributeValue>{}</saml:AttributeValue>",
                        escape(value)
                    ));
                }
                xml.push_str("</saml:Attribute>");
            }
            xml.push_str("</saml:AttributeStatement>");
        }
        xml.push_str("</saml:Assertion>");

        match &self.signed_by {
            Some(key) => RsaXmlSignatureService::new()
                .sign_enveloped(&xml, &self.id, key, SignatureAlgorithm::RsaSha256)
                .expect("fixture assertion signs"),
            None => xml,
        }
    }

    /// Renders the assertion encrypted for the service provider.
    #[must_use]
    pub fn render_encrypted(&self) -> String {
        XmlEncrypter::default()
            .encrypt(&self.render(), &sp_encryption_credential(), "EncryptedAssertion")
            .expect("fixture assertion encrypts")
    }

    fn render_subject(&self) -> String {
        let mut xml = String::from("<saml:Subject>");
        if let Some(name_id) = &self.name_id {
            let name_id_xml = format!(
                r#"<saml:NameID Format="{}">{}</saml:NameID>"#,
                NameIdFormat::Email.uri(),
                escape(name_id)
            );
            if self.encrypt_name_id {
                let standalone = name_id_xml.replacen(
                    "<saml:NameID ",
                    &format!(r#"<saml:NameID xmlns:saml="{SAML_NS}" "#),
                    1,
                );
                xml.push_str(
                    &XmlEncrypter::default()
                        .encrypt(&standalone, &sp_encryption_credential(), "EncryptedID")
                        .expect("fixture identifier encrypts"),
                );
            } else {
                xml.push_str(&name_id_xml);
            }
        }
        xml.push_str(&format!(
            r#"<saml:SubjectConfirmation Method="{}"><saml:SubjectConfirmationData{}{}{}/></saml:SubjectConfirmation>"#,
            escape(&self.confirmation_method),
            optional_attr("NotBefore", self.not_before.map(instant).as_deref()),
            optional_attr("NotOnOrAfter", self.not_on_or_after.map(instant).as_deref()),
            optional_attr("Recipient", self.recipient.as_deref()),
        ));
        xml.push_str("</saml:Subject>");
        xml
    }

    fn render_conditions(&self) -> String {
        let audience = self
            .audience
            .as_deref()
            .map(|a| {
                format!(
                    "<saml:AudienceRestriction><saml:Audience>{}</saml:Audience></saml:AudienceRestriction>",
                    escape(a)
                )
            })
            .unwrap_or_default();
        format!(
            "<saml:Conditions{}{}>{audience}</saml:Conditions>",
            optional_attr("NotBefore", self.not_before.map(instant).as_deref()),
            optional_attr("NotOnOrAfter", self.not_on_or_after.map(instant).as_deref()),
        )
    }
}

/// A response issued by the fixture identity provider.
#[derive(Debug, Clone)]
pub struct ResponseFixture {
    /// Response ID.
    pub id: String,
    /// Issuer entity ID.
    pub issuer: String,
    /// Issue instant.
    pub issued_at: DateTime<Utc>,
    /// Declared destination; `None` omits the attribute.
    pub destination: Option<String>,
    /// Top-level status code.
    pub status_code: String,
    /// Plaintext assertions, in document order.
    pub assertions: Vec<AssertionFixture>,
    /// Assertions to encrypt, placed after the plaintext ones.
    pub encrypted_assertions: Vec<AssertionFixture>,
    /// Signing key; `None` leaves the response unsigned.
    pub signed_by: Option<X509Credential>,
}

impl ResponseFixture {
    /// Creates an unsigned, successful response with no assertions.
    #[must_use]
    pub fn new(issued_at: DateTime<Utc>) -> Self {
        Self {
            id: "_response1".to_string(),
            issuer: IDP_ENTITY_ID.to_string(),
            issued_at,
            destination: Some(SP_ACS_URL.to_string()),
            status_code: status_codes::SUCCESS.to_string(),
            assertions: Vec::new(),
            encrypted_assertions: Vec::new(),
            signed_by: None,
        }
    }

    /// Adds a plaintext assertion.
    #[must_use]
    pub fn assertion(mut self, assertion: AssertionFixture) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Adds an assertion to be encrypted.
    #[must_use]
    pub fn encrypted_assertion(mut self, assertion: AssertionFixture) -> Self {
        self.encrypted_assertions.push(assertion);
        self
    }

    /// Signs the response with the fixture identity provider key.
    #[must_use]
    pub fn signed(mut self) -> Self {
        self.signed_by = Some(idp_signing_credential());
        self
    }

    /// Renders the response XML.
    #[must_use]
    pub fn render(&self) -> String {
        let mut xml = format!(
            r#"<samlp:Response xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{}" Version="2.0" IssueInstant="{}"{}>"#,
            escape(&self.id),
            instant(self.issued_at),
            optional_attr("Destination", self.destination.as_deref()),
        );
        xml.push_str(&format!("<saml:Issuer>{}</saml:Issuer>", escape(&self.issuer)));
        xml.push_str(&format!(
            r#"<samlp:Status><samlp:StatusCode Value="{}"/></samlp:Status>"#,
            escape(&self.status_code)
        ));
        for assertion in &self.assertions {
            xml.push_str(&assertion.render());
        }
        for assertion in &self.encrypted_assertions {
            xml.push_str(&assertion.render_encrypted());
        }
        xml.push_str("</samlp:Response>");

        match &self.signed_by {
            Some(key) => RsaXmlSignatureService::new()
                .sign_enveloped(&xml, &self.id, key, SignatureAlgorithm::RsaSha256)
                .expect("fixture response signs"),
            None => xml,
        }
    }
}

fn optional_attr(name: &str, value: Option<&str>) -> String {
    value
        .map(|v| format!(r#" {name}="{}""#, escape(v)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Response;

    #[test]
    fn fixture_response_parses() {
        let now = Utc::now();
        let xml = ResponseFixture::new(now)
            .assertion(AssertionFixture::new("_a1", now).signed())
            .encrypted_assertion(AssertionFixture::new("_a2", now))
            .signed()
            .render();
        let response = Response::parse(&xml).unwrap();
        assert!(response.signed);
        assert_eq!(response.assertions.len(), 1);
        assert!(response.assertions[0].signed);
        assert_eq!(response.encrypted_assertions.len(), 1);
        assert_eq!(response.destination.as_deref(), Some(SP_ACS_URL));
    }

    #[test]
    fn registration_fixture_resolves_fixture_urls() {
        let registration = registration(Saml2MessageBinding::Post).build().unwrap();
        assert_eq!(registration.resolve_entity_id(SP_BASE_URL), SP_ENTITY_ID);
        assert_eq!(
            registration.resolve_assertion_consumer_service_url(SP_BASE_URL),
            SP_ACS_URL
        );
    }
}
