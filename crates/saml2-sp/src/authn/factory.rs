//! `samlp:AuthnRequest` rendering.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::bindings::Saml2MessageBinding;
use crate::config::RequestSettings;
use crate::context::SamlContext;
use crate::credential::CredentialUsage;
use crate::error::{SamlError, SamlResult};
use crate::signature::SignatureAlgorithm;
use crate::types::{SAMLP_NS, SAML_NS};
use crate::xml::escape;

use super::Saml2AuthenticationRequest;

/// Renders authentication requests.
#[derive(Debug, Clone)]
pub struct AuthnRequestFactory {
    protocol_binding: Saml2MessageBinding,
    signature_algorithm: SignatureAlgorithm,
    force_authn: bool,
    is_passive: bool,
    name_id_format: Option<String>,
}

impl Default for AuthnRequestFactory {
    fn default() -> Self {
        Self {
            protocol_binding: Saml2MessageBinding::Post,
            signature_algorithm: SignatureAlgorithm::default(),
            force_authn: false,
            is_passive: false,
            name_id_format: None,
        }
    }
}

impl AuthnRequestFactory {
    /// Creates a factory from settings.
    ///
    /// The protocol binding must be the HTTP-POST or HTTP-Redirect URN; any
    /// other value is a configuration error naming it.
    pub fn new(settings: &RequestSettings) -> SamlResult<Self> {
        let protocol_binding = match Saml2MessageBinding::from_urn(&settings.protocol_binding) {
            Some(binding @ (Saml2MessageBinding::Post | Saml2MessageBinding::Redirect)) => binding,
            _ => {
                return Err(SamlError::Configuration(format!(
                    "unsupported protocol binding: {}",
                    settings.protocol_binding
                )));
            }
        };
        Ok(Self {
            protocol_binding,
            signature_algorithm: settings.signature_algorithm,
            force_authn: settings.force_authn,
            is_passive: settings.is_passive,
            name_id_format: settings.name_id_format.clone(),
        })
    }

    /// The binding requested for the response.
    #[must_use]
    pub const fn protocol_binding(&self) -> Saml2MessageBinding {
        self.protocol_binding
    }

    /// The algorithm used for XML and simple signatures.
    #[must_use]
    pub const fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    /// Renders the request XML, signed when the request carries credentials.
    pub fn create_authentication_request(
        &self,
        request: &Saml2AuthenticationRequest,
        context: &SamlContext,
    ) -> SamlResult<String> {
        self.create_authentication_request_at(request, context, Utc::now())
    }

    /// Renders the request XML with an explicit issue instant.
    pub fn create_authentication_request_at(
        &self,
        request: &Saml2AuthenticationRequest,
        context: &SamlContext,
        issue_instant: DateTime<Utc>,
    ) -> SamlResult<String> {
        let id = request_id();
        let xml = self.render(&id, request, issue_instant);

        if request.credentials().is_empty() {
            return Ok(xml);
        }
        let credential = request
            .credentials()
            .iter()
            .find(|c| c.has_usage(CredentialUsage::Signing))
            .ok_or_else(|| SamlError::SignatureCreation("no signing credential".to_string()))?;
        debug!(request_id = %id, algorithm = self.signature_algorithm.uri(), "signing AuthnRequest");
        context
            .signatures
            .sign_enveloped(&xml, &id, credential, self.signature_algorithm)
    }

    fn render(&self, id: &str, request: &Saml2AuthenticationRequest, issue_instant: DateTime<Utc>) -> String {
        let mut xml = format!(
            r#"<samlp:AuthnRequest xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{id}" Version="2.0" IssueInstant="{}" Destination="{}" AssertionConsumerServiceURL="{}" ProtocolBinding="{}""#,
            issue_instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            escape(request.destination()),
            escape(request.assertion_consumer_service_url()),
            self.protocol_binding.urn(),
        );
        if self.force_authn {
            xml.push_str(r#" ForceAuthn="true""#);
        }
        if self.is_passive {
            xml.push_str(r#" IsPassive="true""#);
        }
        xml.push('>');
        xml.push_str(&format!("<saml:Issuer>{}</saml:Issuer>", escape(request.issuer())));
        if let Some(format) = &self.name_id_format {
            xml.push_str(&format!(
                r#"<samlp:NameIDPolicy Format="{}" AllowCreate="true"/>"#,
                escape(format)
            ));
        }
        xml.push_str("</samlp:AuthnRequest>");
        xml
    }
}

/// Generates a request ID. XML IDs must not start with a digit.
fn request_id() -> String {
    format!("ARQ{}", &uuid::Uuid::new_v4().to_string()[1..])
}
