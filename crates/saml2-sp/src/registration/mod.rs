//! Relying party registrations.
//!
//! A [`RelyingPartyRegistration`] binds one identity provider to one local
//! service provider identity. Registrations are built once through
//! [`RelyingPartyRegistrationBuilder`], then shared read-only across
//! concurrent requests.

mod repository;
mod template;

pub use repository::{InMemoryRelyingPartyRegistrationRepository, RelyingPartyRegistrationRepository};
pub use template::{resolve_url_template, TemplateVariables};

use serde::{Deserialize, Serialize};

use crate::bindings::Saml2MessageBinding;
use crate::credential::{CredentialUsage, X509Credential};
use crate::error::{SamlError, SamlResult};

/// Default template for the local entity ID.
pub const DEFAULT_ENTITY_ID_TEMPLATE: &str = "{baseUrl}/saml2/service-provider-metadata/{registrationId}";

/// Default template for the assertion consumer service URL.
pub const DEFAULT_ACS_URL_TEMPLATE: &str = "{baseUrl}/login/saml2/sso/{registrationId}";

/// How an outbound request is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Saml2SignatureType {
    /// Enveloped `ds:Signature` inside the message.
    XmlSignature,
    /// Detached `SigAlg`/`Signature` parameters.
    SimpleSignature,
}

impl From<Saml2MessageBinding> for Saml2SignatureType {
    fn from(binding: Saml2MessageBinding) -> Self {
        if binding.uses_xml_signature() {
            Self::XmlSignature
        } else {
            Self::SimpleSignature
        }
    }
}

/// Configuration binding one identity provider to one service provider.
#[derive(Debug, Clone)]
pub struct RelyingPartyRegistration {
    registration_id: String,
    remote_idp_entity_id: String,
    idp_web_sso_url: String,
    credentials: Vec<X509Credential>,
    entity_id_template: String,
    assertion_consumer_service_url_template: String,
    binding: Saml2MessageBinding,
    sign_authn_request: bool,
}

impl RelyingPartyRegistration {
    /// Starts a builder for the given registration id.
    #[must_use]
    pub fn with_registration_id(registration_id: impl Into<String>) -> RelyingPartyRegistrationBuilder {
        RelyingPartyRegistrationBuilder::new(registration_id)
    }

    /// The registration id, the sole lookup key.
    #[must_use]
    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    /// The identity provider's entity ID.
    #[must_use]
    pub fn remote_idp_entity_id(&self) -> &str {
        &self.remote_idp_entity_id
    }

    /// The identity provider's single sign-on URL.
    #[must_use]
    pub fn idp_web_sso_url(&self) -> &str {
        &self.idp_web_sso_url
    }

    /// All credentials, in registration order.
    #[must_use]
    pub fn credentials(&self) -> &[X509Credential] {
        &self.credentials
    }

    /// Credentials carrying `usage`, in registration order.
    #[must_use]
    pub fn credentials_for(&self, usage: CredentialUsage) -> Vec<&X509Credential> {
        self.credentials.iter().filter(|c| c.has_usage(usage)).collect()
    }

    /// The unresolved local entity ID template.
    #[must_use]
    pub fn entity_id_template(&self) -> &str {
        &self.entity_id_template
    }

    /// The unresolved assertion consumer service URL template.
    #[must_use]
    pub fn assertion_consumer_service_url_template(&self) -> &str {
        &self.assertion_consumer_service_url_template
    }

    /// The binding used to reach the identity provider.
    #[must_use]
    pub const fn binding(&self) -> Saml2MessageBinding {
        self.binding
    }

    /// Whether outbound authentication requests are signed.
    #[must_use]
    pub const fn sign_authn_request(&self) -> bool {
        self.sign_authn_request
    }

    /// How requests are signed over the configured binding.
    #[must_use]
    pub fn signature_type(&self) -> Saml2SignatureType {
        self.binding.into()
    }

    /// Resolves the local entity ID for `base_url`.
    #[must_use]
    pub fn resolve_entity_id(&self, base_url: &str) -> String {
        resolve_url_template(
            &self.entity_id_template,
            &TemplateVariables {
                base_url,
                registration_id: &self.registration_id,
                relying_party_entity_id: None,
            },
        )
    }

    /// Resolves the assertion consumer service URL for `base_url`.
    #[must_use]
    pub fn resolve_assertion_consumer_service_url(&self, base_url: &str) -> String {
        resolve_url_template(
            &self.assertion_consumer_service_url_template,
            &TemplateVariables {
                base_url,
                registration_id: &self.registration_id,
                relying_party_entity_id: Some(&self.remote_idp_entity_id),
            },
        )
    }
}

/// Builder for [`RelyingPartyRegistration`].
#[derive(Debug)]
pub struct RelyingPartyRegistrationBuilder {
    registration_id: String,
    remote_idp_entity_id: Option<String>,
    idp_web_sso_url: Option<String>,
    credentials: Vec<X509Credential>,
    entity_id_template: String,
    assertion_consumer_service_url_template: String,
    binding: Saml2MessageBinding,
    sign_authn_request: bool,
}

impl RelyingPartyRegistrationBuilder {
    fn new(registration_id: impl Into<String>) -> Self {
        Self {
            registration_id: registration_id.into(),
            remote_idp_entity_id: None,
            idp_web_sso_url: None,
            credentials: Vec::new(),
            entity_id_template: DEFAULT_ENTITY_ID_TEMPLATE.to_string(),
            assertion_consumer_service_url_template: DEFAULT_ACS_URL_TEMPLATE.to_string(),
            binding: Saml2MessageBinding::default(),
            sign_authn_request: true,
        }
    }

    /// Sets the identity provider's entity ID.
    #[must_use]
    pub fn remote_idp_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.remote_idp_entity_id = Some(entity_id.into());
        self
    }

    /// Sets the identity provider's single sign-on URL.
    #[must_use]
    pub fn idp_web_sso_url(mut self, url: impl Into<String>) -> Self {
        self.idp_web_sso_url = Some(url.into());
        self
    }

    /// Appends a credential. Order is preserved.
    #[must_use]
    pub fn credential(mut self, credential: X509Credential) -> Self {
        self.credentials.push(credential);
        self
    }

    /// Appends several credentials. Order is preserved.
    #[must_use]
    pub fn credentials(mut self, credentials: impl IntoIterator<Item = X509Credential>) -> Self {
        self.credentials.extend(credentials);
        self
    }

    /// Sets the local entity ID template.
    #[must_use]
    pub fn entity_id_template(mut self, template: impl Into<String>) -> Self {
        self.entity_id_template = template.into();
        self
    }

    /// Sets the assertion consumer service URL template.
    #[must_use]
    pub fn assertion_consumer_service_url_template(mut self, template: impl Into<String>) -> Self {
        self.assertion_consumer_service_url_template = template.into();
        self
    }

    /// Sets the binding used to reach the identity provider.
    #[must_use]
    pub const fn binding(mut self, binding: Saml2MessageBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Sets whether authentication requests are signed.
    #[must_use]
    pub const fn sign_authn_request(mut self, sign: bool) -> Self {
        self.sign_authn_request = sign;
        self
    }

    /// Validates and builds the registration.
    pub fn build(self) -> SamlResult<RelyingPartyRegistration> {
        let registration_id = non_empty(self.registration_id, "registration id")?;
        let remote_idp_entity_id = non_empty(
            self.remote_idp_entity_id.unwrap_or_default(),
            "remote IdP entity id",
        )?;
        let idp_web_sso_url = non_empty(self.idp_web_sso_url.unwrap_or_default(), "IdP SSO URL")?;
        url::Url::parse(&idp_web_sso_url).map_err(|e| {
            SamlError::Configuration(format!("invalid IdP SSO URL '{idp_web_sso_url}': {e}"))
        })?;
        let entity_id_template = non_empty(self.entity_id_template, "entity id template")?;
        let assertion_consumer_service_url_template = non_empty(
            self.assertion_consumer_service_url_template,
            "assertion consumer service URL template",
        )?;

        if self.credentials.is_empty() {
            return Err(SamlError::Configuration(format!(
                "registration '{registration_id}' has no credentials"
            )));
        }
        if self.sign_authn_request
            && !self.credentials.iter().any(|c| c.has_usage(CredentialUsage::Signing))
        {
            return Err(SamlError::Configuration(format!(
                "registration '{registration_id}' signs requests but has no signing credential"
            )));
        }

        Ok(RelyingPartyRegistration {
            registration_id,
            remote_idp_entity_id,
            idp_web_sso_url,
            credentials: self.credentials,
            entity_id_template,
            assertion_consumer_service_url_template,
            binding: self.binding,
            sign_authn_request: self.sign_authn_request,
        })
    }
}

fn non_empty(value: String, what: &str) -> SamlResult<String> {
    if value.trim().is_empty() {
        Err(SamlError::Configuration(format!("{what} cannot be empty")))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn builder() -> RelyingPartyRegistrationBuilder {
        RelyingPartyRegistration::with_registration_id("idp1")
            .remote_idp_entity_id("https://idp.example/metadata")
            .idp_web_sso_url("https://idp.example/sso")
            .credential(testing::idp_verification_credential())
            .credential(testing::sp_signing_credential())
    }

    #[test]
    fn defaults() {
        let registration = builder().build().unwrap();
        assert_eq!(registration.registration_id(), "idp1");
        assert_eq!(registration.binding(), Saml2MessageBinding::Redirect);
        assert!(registration.sign_authn_request());
        assert_eq!(registration.signature_type(), Saml2SignatureType::SimpleSignature);
        assert_eq!(
            registration.resolve_entity_id("https://sp.example"),
            "https://sp.example/saml2/service-provider-metadata/idp1"
        );
        assert_eq!(
            registration.resolve_assertion_consumer_service_url("https://sp.example"),
            "https://sp.example/login/saml2/sso/idp1"
        );
    }

    #[test]
    fn credentials_for_keeps_registration_order() {
        let registration = builder()
            .credential(testing::rotated_idp_verification_credential())
            .build()
            .unwrap();
        let verification = registration.credentials_for(CredentialUsage::Verification);
        assert_eq!(verification.len(), 2);
        assert_eq!(
            verification[0].certificate_der(),
            testing::idp_verification_credential().certificate_der()
        );
        assert_eq!(registration.credentials_for(CredentialUsage::Signing).len(), 1);
    }

    #[test]
    fn signature_type_follows_binding() {
        for (binding, expected) in [
            (Saml2MessageBinding::Post, Saml2SignatureType::XmlSignature),
            (Saml2MessageBinding::RedirectXmlSignature, Saml2SignatureType::XmlSignature),
            (Saml2MessageBinding::Redirect, Saml2SignatureType::SimpleSignature),
            (Saml2MessageBinding::PostSimpleSign, Saml2SignatureType::SimpleSignature),
        ] {
            assert_eq!(builder().binding(binding).build().unwrap().signature_type(), expected);
        }
    }

    #[test]
    fn empty_fields_are_configuration_errors() {
        let err = RelyingPartyRegistration::with_registration_id("")
            .remote_idp_entity_id("x")
            .idp_web_sso_url("https://idp.example/sso")
            .credential(testing::sp_signing_credential())
            .build()
            .unwrap_err();
        assert!(matches!(err, SamlError::Configuration(_)));

        let err = RelyingPartyRegistration::with_registration_id("idp1")
            .idp_web_sso_url("https://idp.example/sso")
            .credential(testing::sp_signing_credential())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("entity id"));
    }

    #[test]
    fn credentials_are_required() {
        let err = RelyingPartyRegistration::with_registration_id("idp1")
            .remote_idp_entity_id("x")
            .idp_web_sso_url("https://idp.example/sso")
            .sign_authn_request(false)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("no credentials"));
    }

    #[test]
    fn signing_requires_a_signing_credential() {
        let base = RelyingPartyRegistration::with_registration_id("idp1")
            .remote_idp_entity_id("x")
            .idp_web_sso_url("https://idp.example/sso")
            .credential(testing::idp_verification_credential());
        assert!(base.build().is_err());

        let unsigned = RelyingPartyRegistration::with_registration_id("idp1")
            .remote_idp_entity_id("x")
            .idp_web_sso_url("https://idp.example/sso")
            .credential(testing::idp_verification_credential())
            .sign_authn_request(false)
            .build();
        assert!(unsigned.is_ok());
    }

    #[test]
    fn sso_url_must_parse() {
        let err = builder().idp_web_sso_url("not a url").build().unwrap_err();
        assert!(matches!(err, SamlError::Configuration(_)));
    }
}
