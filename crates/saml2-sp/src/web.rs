//! Web SSO request handling.
//!
//! HTTP routing is left to the caller. It describes each request with a
//! [`RequestContext`] and hands it to the resolver (outbound) or to
//! [`Saml2WebSsoAuthenticationProcessor`] (inbound).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use url::Url;

use crate::bindings::{self, HttpMethod, SamlMessageType};
use crate::error::{SamlError, SamlResult};
use crate::registration::RelyingPartyRegistrationRepository;
use crate::validator::{Saml2AuthenticationToken, Saml2ResponseValidator, ValidatedAssertion};

/// Path prefix that starts a login for a registration.
pub const AUTHENTICATE_PATH_PREFIX: &str = "/saml2/authenticate/";

/// Path prefix of the assertion consumer service.
pub const SSO_PATH_PREFIX: &str = "/login/saml2/sso/";

/// Path prefix of the metadata endpoint.
pub const METADATA_PATH_PREFIX: &str = "/saml2/service-provider-metadata/";

/// Extracts the registration ID from `path` when it is `prefix` followed by
/// a single non-empty segment.
#[must_use]
pub fn match_registration_id<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

/// What the service provider needs to know about one HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// `http` or `https`.
    pub scheme: String,
    /// Host name.
    pub host: String,
    /// Explicit port, if any.
    pub port: Option<u16>,
    /// Application context path, empty or starting with `/`.
    pub context_path: String,
    /// Request path including the context path, without query.
    pub request_uri: String,
    /// Request method.
    pub method: HttpMethod,
    /// Query and form parameters; the first value of a name wins.
    pub parameters: HashMap<String, String>,
}

impl RequestContext {
    /// Builds a context from an absolute request URL, reading parameters
    /// from its query string.
    pub fn from_url(method: HttpMethod, url: &str) -> SamlResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| SamlError::MalformedMessage(format!("invalid request URL '{url}': {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| SamlError::MalformedMessage(format!("request URL '{url}' has no host")))?
            .to_string();

        let mut context = Self {
            scheme: parsed.scheme().to_string(),
            host,
            port: parsed.port(),
            context_path: String::new(),
            request_uri: parsed.path().to_string(),
            method,
            parameters: HashMap::new(),
        };
        context.add_parameters(parsed.query_pairs());
        Ok(context)
    }

    /// Builds a context for the application root at `base_url`, whose path
    /// becomes the context path.
    pub fn for_base_url(method: HttpMethod, base_url: &str) -> SamlResult<Self> {
        let context = Self::from_url(method, base_url)?;
        let context_path = context.request_uri.clone();
        Ok(context.with_context_path(context_path))
    }

    /// Sets the application context path.
    #[must_use]
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into().trim_end_matches('/').to_string();
        self
    }

    /// Adds the parameters of a `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn with_form(mut self, body: &str) -> Self {
        self.add_parameters(url::form_urlencoded::parse(body.as_bytes()));
        self
    }

    /// Adds a single parameter, keeping an existing value.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.entry(name.into()).or_insert_with(|| value.into());
        self
    }

    fn add_parameters<'a>(
        &mut self,
        pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
    ) {
        for (name, value) in pairs {
            self.parameters
                .entry(name.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// `scheme://host[:port]context_path`, omitting default ports.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}{}", self.origin(), self.context_path)
    }

    /// The request URL without query string.
    #[must_use]
    pub fn request_url(&self) -> String {
        format!("{}{}", self.origin(), self.request_uri)
    }

    /// The request path below the context path.
    #[must_use]
    pub fn path_within_application(&self) -> &str {
        self.request_uri
            .strip_prefix(self.context_path.as_str())
            .unwrap_or(&self.request_uri)
    }

    /// The registration ID addressed by this request under `prefix`.
    #[must_use]
    pub fn registration_id(&self, prefix: &str) -> Option<&str> {
        match_registration_id(self.path_within_application(), prefix)
    }

    fn origin(&self) -> String {
        let default_port = match self.scheme.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        };
        match self.port {
            Some(port) if Some(port) != default_port => {
                format!("{}://{}:{port}", self.scheme, self.host)
            }
            _ => format!("{}://{}", self.scheme, self.host),
        }
    }
}

/// Consumes responses delivered to the assertion consumer service.
#[derive(Debug, Clone)]
pub struct Saml2WebSsoAuthenticationProcessor {
    validator: Saml2ResponseValidator,
}

impl Saml2WebSsoAuthenticationProcessor {
    /// Creates a processor.
    #[must_use]
    pub fn new(validator: Saml2ResponseValidator) -> Self {
        Self { validator }
    }

    /// Whether `request` targets the assertion consumer service and carries a
    /// response.
    #[must_use]
    pub fn requires_authentication(&self, request: &RequestContext) -> bool {
        request.registration_id(SSO_PATH_PREFIX).is_some()
            && request
                .parameter(SamlMessageType::Response.form_param())
                .is_some_and(|v| !v.trim().is_empty())
    }

    /// Authenticates the response carried by `request`.
    pub fn attempt_authentication(
        &self,
        repository: &dyn RelyingPartyRegistrationRepository,
        request: &RequestContext,
    ) -> SamlResult<ValidatedAssertion> {
        self.attempt_authentication_at(repository, request, Utc::now())
    }

    /// Authenticates the response carried by `request` as of `now`.
    pub fn attempt_authentication_at(
        &self,
        repository: &dyn RelyingPartyRegistrationRepository,
        request: &RequestContext,
        now: DateTime<Utc>,
    ) -> SamlResult<ValidatedAssertion> {
        let (Some(registration_id), Some(saml_response)) = (
            request.registration_id(SSO_PATH_PREFIX),
            request
                .parameter(SamlMessageType::Response.form_param())
                .filter(|v| !v.trim().is_empty()),
        ) else {
            return Err(SamlError::MalformedMessage("missing SAML2 response data".to_string()));
        };

        let registration = repository.require(registration_id)?;
        let xml = bindings::decode(saml_response, request.method)?;
        debug!(registration_id, method = ?request.method, "decoded SAML response");

        let token = Saml2AuthenticationToken::for_registration(
            &registration,
            xml,
            request.request_url(),
            &request.base_url(),
        );
        self.validator.authenticate_at(&token, now).map_err(|e| {
            warn!(registration_id, code = e.code(), "SAML login failed");
            e
        })
    }
}
