//! AuthnRequest generation.

use saml2_sp::authn::AuthnRequestFactory;
use saml2_sp::bindings::HttpMethod;
use saml2_sp::{EncodedRequest, RequestContext, Saml2AuthenticationRequestResolver, SamlContext, SpConfig};
use tracing::info;

use super::find_registration;
use crate::output::warning;

/// Builds the request and returns the redirect URL or the HTML form.
pub fn run_authn_request(
    config: &SpConfig,
    registration_id: &str,
    base_url: &str,
    relay_state: Option<&str>,
) -> crate::CliResult<String> {
    let registration = find_registration(config, registration_id)?;
    if !registration.sign_authn_request() {
        warning(&format!("registration '{registration_id}' sends unsigned requests"));
    }

    let resolver = Saml2AuthenticationRequestResolver::new(
        SamlContext::default(),
        AuthnRequestFactory::new(&config.request)?,
    );
    let request = RequestContext::for_base_url(HttpMethod::Get, base_url)?;
    let resolved = resolver.resolve(&registration, &request, relay_state)?;
    info!(
        registration_id,
        binding = %resolved.binding(),
        destination = resolved.destination(),
        "built AuthnRequest"
    );

    Ok(match resolved.encode() {
        EncodedRequest::Redirect(url) => url,
        EncodedRequest::PostForm(html) => html,
    })
}

#[cfg(test)]
mod tests {
    use saml2_sp::bindings::Saml2MessageBinding;
    use saml2_sp::testing::{IDP_SSO_URL, SP_BASE_URL};

    use super::*;
    use crate::commands::test_support;

    #[test]
    fn redirect_registration_prints_url() {
        let config = test_support::config(Saml2MessageBinding::Redirect.urn());
        let url = run_authn_request(&config, "idp1", SP_BASE_URL, Some("xyz")).unwrap();
        assert!(url.starts_with(&format!("{IDP_SSO_URL}?SAMLRequest=")));
        assert!(url.contains("&RelayState=xyz&SigAlg="));
    }

    #[test]
    fn post_registration_prints_form() {
        let config = test_support::config(Saml2MessageBinding::Post.urn());
        let html = run_authn_request(&config, "idp1", SP_BASE_URL, None).unwrap();
        assert!(html.contains(&format!(r#"action="{IDP_SSO_URL}""#)));
    }
}
