//! Common test utilities and fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use saml2_sp::bindings::{HttpMethod, HttpPostBinding, HttpRedirectBinding, Saml2MessageBinding};
use saml2_sp::encryption::XmlDecrypter;
use saml2_sp::registration::{InMemoryRelyingPartyRegistrationRepository, RelyingPartyRegistrationBuilder};
use saml2_sp::signature::{RsaXmlSignatureService, SignatureAlgorithm, XmlSignatureService};
use saml2_sp::testing::{self, SP_ACS_URL};
use saml2_sp::web::Saml2WebSsoAuthenticationProcessor;
use saml2_sp::{
    RequestContext, Saml2ResponseValidator, SamlContext, SamlResult, ValidatorSettings, X509Credential,
};

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("saml2_sp=debug")
        .with_test_writer()
        .try_init();
}

/// A repository holding the built `registration`.
pub fn repository(registration: RelyingPartyRegistrationBuilder) -> anyhow::Result<InMemoryRelyingPartyRegistrationRepository> {
    Ok(InMemoryRelyingPartyRegistrationRepository::new([registration.build()?])?)
}

/// The default fixture registration for `binding`.
pub fn default_repository(binding: Saml2MessageBinding) -> anyhow::Result<InMemoryRelyingPartyRegistrationRepository> {
    repository(testing::registration(binding))
}

/// A processor with default settings over `context`.
pub fn processor(context: SamlContext) -> Saml2WebSsoAuthenticationProcessor {
    Saml2WebSsoAuthenticationProcessor::new(Saml2ResponseValidator::new(context, ValidatorSettings::default()))
}

/// The ACS request an identity provider would produce for `xml` over `method`.
pub fn acs_request(xml: &str, method: HttpMethod) -> anyhow::Result<RequestContext> {
    Ok(match method {
        HttpMethod::Post => RequestContext::from_url(HttpMethod::Post, SP_ACS_URL)?
            .with_parameter("SAMLResponse", HttpPostBinding::encode_message(xml)),
        HttpMethod::Get => {
            let encoded = HttpRedirectBinding::encode_message(xml)?;
            RequestContext::from_url(
                HttpMethod::Get,
                &format!("{SP_ACS_URL}?SAMLResponse={}", saml2_sp::bindings::latin1_percent_encode(&encoded)),
            )?
        }
    })
}

/// Signature service that counts verification attempts.
#[derive(Debug, Default)]
pub struct CountingSignatures {
    inner: RsaXmlSignatureService,
    verifications: AtomicUsize,
}

impl CountingSignatures {
    /// Number of enveloped verifications attempted so far.
    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }
}

impl XmlSignatureService for CountingSignatures {
    fn sign_enveloped(
        &self,
        xml: &str,
        reference_id: &str,
        credential: &X509Credential,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<String> {
        self.inner.sign_enveloped(xml, reference_id, credential, algorithm)
    }

    fn verify_enveloped(&self, xml: &str, reference_id: &str, credential: &X509Credential) -> SamlResult<()> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        self.inner.verify_enveloped(xml, reference_id, credential)
    }

    fn sign_detached(
        &self,
        data: &[u8],
        credential: &X509Credential,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<Vec<u8>> {
        self.inner.sign_detached(data, credential, algorithm)
    }

    fn verify_detached(
        &self,
        data: &[u8],
        signature: &[u8],
        credential: &X509Credential,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<()> {
        self.inner.verify_detached(data, signature, credential, algorithm)
    }
}

/// A context whose signature service is `signatures`.
pub fn counting_context(signatures: &Arc<CountingSignatures>) -> SamlContext {
    SamlContext::new(signatures.clone(), Arc::new(XmlDecrypter::new()))
}

/// Extracts the value of the hidden input `name` from a POST form.
pub fn form_field<'a>(html: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!(r#"name="{name}" value=""#);
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')? + start;
    Some(&html[start..end])
}
