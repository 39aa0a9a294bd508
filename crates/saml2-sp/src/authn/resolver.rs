//! Resolves the outbound request for a registration.

use tracing::debug;

use crate::bindings::{self, SamlMessageType};
use crate::context::SamlContext;
use crate::credential::{CredentialUsage, X509Credential};
use crate::error::{SamlError, SamlResult};
use crate::registration::RelyingPartyRegistration;
use crate::web::RequestContext;

use super::{AuthenticationRequest, AuthnRequestFactory, Saml2AuthenticationRequest};

/// Builds, signs and encodes authentication requests.
#[derive(Debug, Clone, Default)]
pub struct Saml2AuthenticationRequestResolver {
    context: SamlContext,
    factory: AuthnRequestFactory,
}

impl Saml2AuthenticationRequestResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(context: SamlContext, factory: AuthnRequestFactory) -> Self {
        Self { context, factory }
    }

    /// Resolves the request that starts a login at `registration`'s
    /// identity provider.
    ///
    /// XML-signature bindings embed an enveloped signature; the others get a
    /// detached signature over their parameters. An empty `relay_state` is
    /// omitted.
    pub fn resolve(
        &self,
        registration: &RelyingPartyRegistration,
        request: &RequestContext,
        relay_state: Option<&str>,
    ) -> SamlResult<AuthenticationRequest> {
        let base_url = request.base_url();
        let issuer = registration.resolve_entity_id(&base_url);
        let acs_url = registration.resolve_assertion_consumer_service_url(&base_url);
        let binding = registration.binding();
        let relay_state = relay_state.filter(|rs| !rs.is_empty());

        let credentials: Vec<X509Credential> = if registration.sign_authn_request() {
            registration
                .credentials_for(CredentialUsage::Signing)
                .into_iter()
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        let xml_signed = !credentials.is_empty() && binding.uses_xml_signature();

        let description = Saml2AuthenticationRequest::new(&issuer, registration.idp_web_sso_url(), &acs_url)?
            .with_credentials(if xml_signed { credentials.clone() } else { Vec::new() });
        let xml = self.factory.create_authentication_request(&description, &self.context)?;
        let saml_request = bindings::encode(&xml, binding)?;

        let signature = if credentials.is_empty() || binding.uses_xml_signature() {
            None
        } else {
            let credential = credentials
                .first()
                .ok_or_else(|| SamlError::SignatureCreation("no signing credential".to_string()))?;
            Some(bindings::simple_sign(
                &*self.context.signatures,
                credential,
                self.factory.signature_algorithm(),
                binding,
                SamlMessageType::Request,
                &saml_request,
                relay_state,
            )?)
        };

        debug!(
            registration_id = registration.registration_id(),
            %binding,
            signed = !credentials.is_empty(),
            "resolved authentication request"
        );

        Ok(AuthenticationRequest {
            issuer,
            destination: registration.idp_web_sso_url().to_string(),
            assertion_consumer_service_url: acs_url,
            saml_request,
            relay_state: relay_state.map(str::to_string),
            binding,
            credentials,
            signature,
        })
    }
}
