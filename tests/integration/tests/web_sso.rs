//! Web SSO round trips: outbound request through inbound response.

use std::sync::Arc;

use saml2_sp::bindings::{HttpMethod, HttpPostBinding, Saml2MessageBinding};
use saml2_sp::registration::RelyingPartyRegistrationRepository;
use saml2_sp::testing::{self, AssertionFixture, ResponseFixture, IDP_SSO_URL, REGISTRATION_ID, SP_BASE_URL};
use saml2_sp::xml::XmlElement;
use saml2_sp::{EncodedRequest, RequestContext, Saml2AuthenticationRequestResolver, SamlContext, SamlError};

use crate::common::{self, CountingSignatures};

/// POST binding without signing yields a form whose request targets the
/// identity provider and carries no signature.
#[test]
fn unsigned_post_request_form() -> anyhow::Result<()> {
    common::init_tracing();
    let repository = common::repository(
        testing::registration(Saml2MessageBinding::Post).sign_authn_request(false),
    )?;
    let registration = repository.require(REGISTRATION_ID)?;
    let request = RequestContext::from_url(
        HttpMethod::Get,
        &format!("{SP_BASE_URL}/saml2/authenticate/{REGISTRATION_ID}"),
    )?;

    let resolved = Saml2AuthenticationRequestResolver::default().resolve(&registration, &request, None)?;
    let EncodedRequest::PostForm(html) = resolved.encode() else {
        anyhow::bail!("expected a POST form");
    };

    let saml_request = common::form_field(&html, "SAMLRequest")
        .ok_or_else(|| anyhow::anyhow!("form has no SAMLRequest"))?;
    let xml = HttpPostBinding::decode_message(saml_request)?;
    let root = XmlElement::parse(&xml)?;
    assert_eq!(root.name, "AuthnRequest");
    assert_eq!(root.attr("Destination"), Some(IDP_SSO_URL));
    assert!(root.child("Signature").is_none());
    assert!(common::form_field(&html, "Signature").is_none());
    Ok(())
}

/// A signed response delivered by GET authenticates; the same response with
/// another destination fails before any signature is checked.
#[test]
fn redirected_response_and_destination_mismatch() -> anyhow::Result<()> {
    common::init_tracing();
    let repository = common::default_repository(Saml2MessageBinding::Redirect)?;
    let now = testing::now();

    let valid = ResponseFixture::new(now)
        .assertion(AssertionFixture::new("_a1", now))
        .signed()
        .render();
    let processor = common::processor(SamlContext::default());
    let validated = processor.attempt_authentication_at(
        &repository,
        &common::acs_request(&valid, HttpMethod::Get)?,
        now,
    )?;
    assert_eq!(validated.subject, "alice@example.com");

    let mut misdirected = ResponseFixture::new(now)
        .assertion(AssertionFixture::new("_a1", now))
        .signed();
    misdirected.destination = Some("https://other.example/login/saml2/sso/idp1".to_string());
    let signatures = Arc::new(CountingSignatures::default());
    let err = common::processor(common::counting_context(&signatures))
        .attempt_authentication_at(
            &repository,
            &common::acs_request(&misdirected.render(), HttpMethod::Get)?,
            now,
        )
        .unwrap_err();
    assert!(matches!(err, SamlError::DestinationMismatch { .. }));
    assert_eq!(signatures.verifications(), 0);
    Ok(())
}

/// The relay state survives the redirect binding unchanged.
#[test]
fn relay_state_is_carried() -> anyhow::Result<()> {
    let repository = common::default_repository(Saml2MessageBinding::Redirect)?;
    let registration = repository.require(REGISTRATION_ID)?;
    let request = RequestContext::for_base_url(HttpMethod::Get, SP_BASE_URL)?;

    let resolved = Saml2AuthenticationRequestResolver::default().resolve(
        &registration,
        &request,
        Some("/app/page?x=1&y=2 z"),
    )?;
    let EncodedRequest::Redirect(url) = resolved.encode() else {
        anyhow::bail!("expected a redirect");
    };
    let decoded = saml2_sp::bindings::HttpRedirectBinding::decode_url(&url)?;
    assert_eq!(decoded.relay_state.as_deref(), Some("/app/page?x=1&y=2 z"));
    assert!(decoded.sig_alg.is_some());
    Ok(())
}

/// Responses for registrations nobody configured are rejected.
#[test]
fn unknown_registration() -> anyhow::Result<()> {
    let repository = common::default_repository(Saml2MessageBinding::Post)?;
    let request = RequestContext::from_url(HttpMethod::Post, &format!("{SP_BASE_URL}/login/saml2/sso/nope"))?
        .with_parameter("SAMLResponse", "PHg+PC94Pg==");
    let err = common::processor(SamlContext::default())
        .attempt_authentication(&repository, &request)
        .unwrap_err();
    assert!(matches!(err, SamlError::ProviderNotFound(_)));
    assert_eq!(err.http_status(), 404);
    Ok(())
}
