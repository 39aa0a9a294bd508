//! Response validation.

use std::path::Path;

use saml2_sp::bindings::{self, HttpMethod};
use saml2_sp::{Saml2AuthenticationToken, Saml2ResponseValidator, SamlContext, SpConfig};
use tracing::info;

use super::find_registration;

/// Validates the response stored in `response_file` as if delivered to the
/// registration's assertion consumer service, returning the identity as
/// JSON.
pub fn run_validate(
    config: &SpConfig,
    registration_id: &str,
    base_url: &str,
    method: HttpMethod,
    response_file: &Path,
) -> crate::CliResult<String> {
    let registration = find_registration(config, registration_id)?;
    let encoded = std::fs::read_to_string(response_file)?;
    let xml = bindings::decode(encoded.trim(), method)?;

    let base_url = base_url.trim_end_matches('/');
    let acs_url = registration.resolve_assertion_consumer_service_url(base_url);
    let token = Saml2AuthenticationToken::for_registration(&registration, xml, acs_url, base_url);

    let validator = Saml2ResponseValidator::new(SamlContext::default(), config.validator.clone());
    let validated = validator.authenticate(&token)?;
    info!(registration_id, subject = %validated.subject, "response is valid");

    Ok(serde_json::to_string_pretty(&validated)?)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use saml2_sp::bindings::{HttpPostBinding, Saml2MessageBinding};
    use saml2_sp::testing::{now, AssertionFixture, ResponseFixture, SP_BASE_URL};
    use saml2_sp::SamlError;

    use super::*;
    use crate::commands::test_support;
    use crate::CliError;

    fn write_response(name: &str, xml: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("saml2-cli-{}-{name}", std::process::id()));
        std::fs::write(&path, HttpPostBinding::encode_message(xml)).unwrap();
        path
    }

    #[test]
    fn prints_validated_identity() {
        let now = now();
        let xml = ResponseFixture::new(now)
            .assertion(AssertionFixture::new("_a1", now))
            .signed()
            .render();
        let path = write_response("valid", &xml);
        let config = test_support::config(Saml2MessageBinding::Post.urn());

        let json = run_validate(&config, "idp1", SP_BASE_URL, HttpMethod::Post, &path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["subject"], "alice@example.com");
        assert_eq!(value["authorities"][0], "ROLE_USER");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn unsigned_response_is_rejected() {
        let now = now();
        let xml = ResponseFixture::new(now)
            .assertion(AssertionFixture::new("_a1", now))
            .render();
        let path = write_response("unsigned", &xml);
        let config = test_support::config(Saml2MessageBinding::Post.urn());

        let err = run_validate(&config, "idp1", SP_BASE_URL, HttpMethod::Post, &path).unwrap_err();
        assert!(matches!(err, CliError::Saml(SamlError::NoValidAssertion)));
        std::fs::remove_file(path).ok();
    }
}
