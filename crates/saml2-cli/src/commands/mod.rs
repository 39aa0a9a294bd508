//! Command implementations.
//!
//! Each command renders its result to a `String`; `main` prints it.

pub mod authn_request;
pub mod decode;
pub mod metadata;
pub mod validate;

pub use authn_request::run_authn_request;
pub use decode::run_decode;
pub use metadata::run_metadata;
pub use validate::run_validate;

use saml2_sp::{RelyingPartyRegistration, SpConfig};

use crate::{CliError, CliResult};

/// Finds the registration `registration_id` in `config`.
pub fn find_registration(config: &SpConfig, registration_id: &str) -> CliResult<RelyingPartyRegistration> {
    if config.registrations.is_empty() {
        return Err(CliError::Config("no registrations configured".to_string()));
    }
    config
        .registrations()?
        .into_iter()
        .find(|r| r.registration_id() == registration_id)
        .ok_or_else(|| CliError::RegistrationNotFound(registration_id.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use saml2_sp::testing::{IDP_ENTITY_ID, IDP_SSO_URL, REGISTRATION_ID};
    use saml2_sp::SpConfig;

    /// A configuration over the core crate's fixture key material.
    pub fn config(binding: &str) -> SpConfig {
        let mut config = SpConfig::from_toml(&format!(
            r#"
[[registration]]
registration_id = "{REGISTRATION_ID}"
entity_id = "{IDP_ENTITY_ID}"
web_sso_url = "{IDP_SSO_URL}"
binding = "{binding}"
verification_certificates = ["idp.crt"]

[[registration.signing]]
private_key = "sp.key"
certificate = "sp.crt"
"#
        ))
        .unwrap();
        config.base_dir = Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../saml2-sp/testdata"));
        config
    }
}

#[cfg(test)]
mod tests {
    use saml2_sp::bindings::Saml2MessageBinding;

    use super::*;

    #[test]
    fn unknown_registration_is_reported() {
        let config = test_support::config(Saml2MessageBinding::Post.urn());
        assert!(find_registration(&config, "idp1").is_ok());
        assert!(matches!(
            find_registration(&config, "other"),
            Err(CliError::RegistrationNotFound(id)) if id == "other"
        ));
    }

    #[test]
    fn empty_configuration_is_reported() {
        assert!(matches!(
            find_registration(&SpConfig::default(), "idp1"),
            Err(CliError::Config(_))
        ));
    }
}
