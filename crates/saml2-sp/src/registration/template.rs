//! URL template resolution.
//!
//! Registration URLs are stored as templates and resolved against the live
//! request at use time. Recognized placeholders:
//!
//! | Placeholder              | Value                                      |
//! |--------------------------|--------------------------------------------|
//! | `{baseUrl}`              | `scheme://host[:port]context_path`         |
//! | `{baseScheme}`           | scheme of the base URL                     |
//! | `{baseHost}`             | host of the base URL                       |
//! | `{basePort}`             | `:port` when not the scheme default, or "" |
//! | `{basePath}`             | context path of the base URL               |
//! | `{registrationId}`       | the registration id                        |
//! | `{relyingPartyEntityId}` | the remote identity provider entity ID     |
//!
//! Unknown placeholders are left untouched.

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVariables<'a> {
    /// Application base URL.
    pub base_url: &'a str,
    /// Registration id.
    pub registration_id: &'a str,
    /// Remote identity provider entity ID, when it may be substituted.
    pub relying_party_entity_id: Option<&'a str>,
}

/// Resolves every known placeholder in `template`.
#[must_use]
pub fn resolve_url_template(template: &str, vars: &TemplateVariables<'_>) -> String {
    if !template.contains('{') {
        return template.to_string();
    }

    let base_url = vars.base_url.trim_end_matches('/');
    let (scheme, host, port, path) = match url::Url::parse(base_url) {
        Ok(parsed) => (
            parsed.scheme().to_string(),
            parsed.host_str().unwrap_or_default().to_string(),
            parsed.port().map(|p| format!(":{p}")).unwrap_or_default(),
            parsed.path().trim_end_matches('/').to_string(),
        ),
        Err(_) => Default::default(),
    };

    let mut resolved = template
        .replace("{baseUrl}", base_url)
        .replace("{baseScheme}", &scheme)
        .replace("{baseHost}", &host)
        .replace("{basePort}", &port)
        .replace("{basePath}", &path)
        .replace("{registrationId}", vars.registration_id);
    if let Some(entity_id) = vars.relying_party_entity_id {
        resolved = resolved.replace("{relyingPartyEntityId}", entity_id);
    }
    resolved
}
