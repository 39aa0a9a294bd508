//! Service provider metadata.
//!
//! Generates the SAML 2.0 metadata document an identity provider imports to
//! trust this service provider.

use base64::Engine;

use crate::bindings::Saml2MessageBinding;
use crate::credential::{CredentialUsage, X509Credential};
use crate::registration::RelyingPartyRegistration;
use crate::types::{MD_NS, SAMLP_NS, XMLDSIG_NS};
use crate::xml::escape;

/// Metadata content type.
pub const METADATA_CONTENT_TYPE: &str = "application/samlmetadata+xml";

/// Service provider metadata writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceProviderMetadata;

impl ServiceProviderMetadata {
    /// Generates metadata for `registration` with URLs resolved against
    /// `base_url`.
    #[must_use]
    pub fn generate(registration: &RelyingPartyRegistration, base_url: &str) -> String {
        let entity_id = registration.resolve_entity_id(base_url);
        let acs_url = registration.resolve_assertion_consumer_service_url(base_url);

        let mut key_descriptors = String::new();
        for credential in registration.credentials_for(CredentialUsage::Signing) {
            key_descriptors.push_str(&key_descriptor("signing", credential));
        }
        for credential in registration.credentials_for(CredentialUsage::Decryption) {
            key_descriptors.push_str(&key_descriptor("encryption", credential));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="{MD_NS}" entityID="{}">
    <md:SPSSODescriptor AuthnRequestsSigned="{}" WantAssertionsSigned="true" protocolSupportEnumeration="{SAMLP_NS}">
{key_descriptors}        <md:AssertionConsumerService Binding="{}" Location="{}" index="1"/>
    </md:SPSSODescriptor>
</md:EntityDescriptor>"#,
            escape(&entity_id),
            registration.sign_authn_request(),
            Saml2MessageBinding::Post.urn(),
            escape(&acs_url),
        )
    }
}

fn key_descriptor(usage: &str, credential: &X509Credential) -> String {
    let certificate = base64::engine::general_purpose::STANDARD.encode(credential.certificate_der());
    format!(
        r#"        <md:KeyDescriptor use="{usage}">
            <ds:KeyInfo xmlns:ds="{XMLDSIG_NS}">
                <ds:X509Data>
                    <ds:X509Certificate>{certificate}</ds:X509Certificate>
                </ds:X509Data>
            </ds:KeyInfo>
        </md:KeyDescriptor>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, SP_ACS_URL, SP_BASE_URL, SP_ENTITY_ID};
    use crate::xml::XmlElement;

    #[test]
    fn metadata_describes_the_service_provider() {
        let registration = testing::registration(Saml2MessageBinding::Redirect).build().unwrap();
        let xml = ServiceProviderMetadata::generate(&registration, SP_BASE_URL);
        let root = XmlElement::parse(&xml).unwrap();
        assert_eq!(root.name, "EntityDescriptor");
        assert_eq!(root.attr("entityID"), Some(SP_ENTITY_ID));

        let descriptor = root.child("SPSSODescriptor").unwrap();
        assert_eq!(descriptor.attr("AuthnRequestsSigned"), Some("true"));
        assert_eq!(descriptor.attr("WantAssertionsSigned"), Some("true"));

        let acs = descriptor.child("AssertionConsumerService").unwrap();
        assert_eq!(acs.attr("Location"), Some(SP_ACS_URL));
        assert_eq!(acs.attr("Binding"), Some(Saml2MessageBinding::Post.urn()));
        assert_eq!(acs.attr("index"), Some("1"));

        let uses: Vec<_> = descriptor
            .children_named("KeyDescriptor")
            .map(|k| k.attr("use").unwrap_or_default().to_string())
            .collect();
        assert_eq!(uses, ["signing", "encryption"]);
    }

    #[test]
    fn verification_certificates_are_not_published() {
        let registration = testing::registration(Saml2MessageBinding::Post)
            .sign_authn_request(false)
            .build()
            .unwrap();
        let xml = ServiceProviderMetadata::generate(&registration, SP_BASE_URL);
        let idp_der = testing::idp_verification_credential().certificate_der().to_vec();
        let idp_b64 = base64::engine::general_purpose::STANDARD.encode(idp_der);
        assert!(!xml.contains(&idp_b64));
        assert!(xml.contains(r#"AuthnRequestsSigned="false""#));
    }
}
