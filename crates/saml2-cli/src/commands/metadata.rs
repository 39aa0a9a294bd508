//! Metadata generation.

use saml2_sp::metadata::ServiceProviderMetadata;
use saml2_sp::SpConfig;

use super::find_registration;

/// Returns the metadata document for `registration_id`.
pub fn run_metadata(config: &SpConfig, registration_id: &str, base_url: &str) -> crate::CliResult<String> {
    let registration = find_registration(config, registration_id)?;
    Ok(ServiceProviderMetadata::generate(&registration, base_url.trim_end_matches('/')))
}

#[cfg(test)]
mod tests {
    use saml2_sp::bindings::Saml2MessageBinding;
    use saml2_sp::testing::{SP_BASE_URL, SP_ENTITY_ID};

    use super::*;
    use crate::commands::test_support;

    #[test]
    fn prints_entity_descriptor() {
        let config = test_support::config(Saml2MessageBinding::Post.urn());
        let xml = run_metadata(&config, "idp1", &format!("{SP_BASE_URL}/")).unwrap();
        assert!(xml.contains(&format!(r#"entityID="{SP_ENTITY_ID}""#)));
        assert!(xml.contains(r#"<md:KeyDescriptor use="signing">"#));
    }
}
