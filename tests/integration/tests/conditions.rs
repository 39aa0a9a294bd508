//! Assertion condition checks through the full validator.

use chrono::Duration;
use saml2_sp::bindings::Saml2MessageBinding;
use saml2_sp::testing::{self, AssertionFixture, ResponseFixture, SP_ACS_URL, SP_BASE_URL};
use saml2_sp::{
    RelyingPartyRegistration, Saml2AuthenticationToken, Saml2ResponseValidator, SamlContext, SamlError,
    ValidatorSettings,
};

fn validate(
    registration: &RelyingPartyRegistration,
    assertion: AssertionFixture,
) -> Result<saml2_sp::ValidatedAssertion, SamlError> {
    let now = assertion.issued_at;
    let xml = ResponseFixture::new(now).assertion(assertion).signed().render();
    let token = Saml2AuthenticationToken::for_registration(registration, xml, SP_ACS_URL, SP_BASE_URL);
    Saml2ResponseValidator::new(SamlContext::default(), ValidatorSettings::default()).authenticate_at(&token, now)
}

#[test]
fn skew_boundary_is_inclusive() -> anyhow::Result<()> {
    let registration = testing::registration(Saml2MessageBinding::Post).build()?;
    let now = testing::now();
    let skew = Duration::minutes(5);

    let mut at_edge = AssertionFixture::new("_edge", now);
    at_edge.not_before = Some(now + skew);
    validate(&registration, at_edge)?;

    let mut past_edge = AssertionFixture::new("_past", now);
    past_edge.not_before = Some(now + skew + Duration::milliseconds(1));
    assert!(matches!(validate(&registration, past_edge), Err(SamlError::NoValidAssertion)));

    let mut expired_at_edge = AssertionFixture::new("_expired_edge", now);
    expired_at_edge.not_before = None;
    expired_at_edge.not_on_or_after = Some(now - skew);
    validate(&registration, expired_at_edge)?;

    let mut expired = AssertionFixture::new("_expired", now);
    expired.not_before = None;
    expired.not_on_or_after = Some(now - skew - Duration::milliseconds(1));
    assert!(matches!(validate(&registration, expired), Err(SamlError::NoValidAssertion)));

    let mut far_future = AssertionFixture::new("_future", now);
    far_future.not_on_or_after = Some(now + skew + Duration::milliseconds(1));
    validate(&registration, far_future)?;
    Ok(())
}

#[test]
fn audience_must_equal_the_resolved_entity_id() -> anyhow::Result<()> {
    let now = testing::now();
    let exact = testing::registration(Saml2MessageBinding::Post).build()?;
    validate(&exact, AssertionFixture::new("_a", now))?;

    for template in [
        "{baseUrl}/saml2/service-provider-metadata/{registrationId}/",
        "{baseUrl}/SAML2/service-provider-metadata/{registrationId}",
        "{baseUrl}/saml2/service-provider-metadata/{registrationId}/extra",
    ] {
        let registration = testing::registration(Saml2MessageBinding::Post)
            .entity_id_template(template)
            .build()?;
        assert!(
            matches!(
                validate(&registration, AssertionFixture::new("_a", now)),
                Err(SamlError::NoValidAssertion)
            ),
            "{template} must not match"
        );
    }
    Ok(())
}

#[test]
fn recipient_must_match_the_delivery_url() -> anyhow::Result<()> {
    let registration = testing::registration(Saml2MessageBinding::Post).build()?;
    let mut assertion = AssertionFixture::new("_a", testing::now());
    assertion.recipient = Some(format!("{SP_ACS_URL}/"));
    assert!(matches!(validate(&registration, assertion), Err(SamlError::NoValidAssertion)));
    Ok(())
}
