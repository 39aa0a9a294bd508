//! Multi-key verification and decryption.

use saml2_sp::bindings::Saml2MessageBinding;
use saml2_sp::credential::X509Credential;
use saml2_sp::registration::RelyingPartyRegistration;
use saml2_sp::testing::{self, AssertionFixture, ResponseFixture, IDP_ENTITY_ID, IDP_SSO_URL, SP_ACS_URL, SP_BASE_URL};
use saml2_sp::{Saml2AuthenticationToken, Saml2ResponseValidator, SamlContext, SamlError, ValidatorSettings};

fn registration(credentials: impl IntoIterator<Item = X509Credential>) -> anyhow::Result<RelyingPartyRegistration> {
    Ok(RelyingPartyRegistration::with_registration_id("idp1")
        .remote_idp_entity_id(IDP_ENTITY_ID)
        .idp_web_sso_url(IDP_SSO_URL)
        .binding(Saml2MessageBinding::Post)
        .sign_authn_request(false)
        .credentials(credentials)
        .build()?)
}

fn validate(registration: &RelyingPartyRegistration, xml: String) -> Result<saml2_sp::ValidatedAssertion, SamlError> {
    let token = Saml2AuthenticationToken::for_registration(registration, xml, SP_ACS_URL, SP_BASE_URL);
    Saml2ResponseValidator::new(SamlContext::default(), ValidatorSettings::default())
        .authenticate_at(&token, testing::now())
}

fn response_signed_by(credential: X509Credential) -> String {
    let now = testing::now();
    let mut response = ResponseFixture::new(now).assertion(AssertionFixture::new("_a1", now));
    response.signed_by = Some(credential);
    response.render()
}

#[test]
fn any_verification_credential_may_validate() -> anyhow::Result<()> {
    let orders = [
        vec![testing::idp_verification_credential(), testing::rotated_idp_verification_credential()],
        vec![testing::rotated_idp_verification_credential(), testing::idp_verification_credential()],
    ];
    for credentials in orders {
        let registration = registration(credentials)?;
        validate(&registration, response_signed_by(testing::idp_signing_credential()))?;
        validate(&registration, response_signed_by(testing::rotated_idp_signing_credential()))?;
    }
    Ok(())
}

#[test]
fn rejected_only_when_every_credential_fails() -> anyhow::Result<()> {
    let registration = registration([
        testing::rotated_idp_verification_credential(),
        testing::sp_verification_credential(),
    ])?;
    let err = validate(&registration, response_signed_by(testing::idp_signing_credential())).unwrap_err();
    assert!(matches!(err, SamlError::NoValidAssertion));
    Ok(())
}

#[test]
fn decryption_tries_credentials_in_order() -> anyhow::Result<()> {
    let now = testing::now();
    let xml = ResponseFixture::new(now)
        .encrypted_assertion(AssertionFixture::new("_enc", now).signed())
        .render();

    let rolled = registration([
        testing::idp_verification_credential(),
        testing::retired_sp_credential(),
        testing::sp_signing_credential(),
    ])?;
    assert_eq!(validate(&rolled, xml.clone())?.assertion_id, "_enc");

    let retired_only = registration([testing::idp_verification_credential(), testing::retired_sp_credential()])?;
    assert!(matches!(validate(&retired_only, xml), Err(SamlError::DecryptionFailed(_))));
    Ok(())
}
