//! Outbound authentication requests.
//!
//! [`AuthnRequestFactory`] renders (and optionally signs) the
//! `samlp:AuthnRequest` XML. [`Saml2AuthenticationRequestResolver`] drives
//! it for a registration and a live request, encodes the result for the
//! registration's binding and hands back an [`AuthenticationRequest`] ready
//! to be sent as a redirect or an auto-submitting form.

mod factory;
mod resolver;

pub use factory::AuthnRequestFactory;
pub use resolver::Saml2AuthenticationRequestResolver;

use crate::bindings::{
    HttpPostBinding, HttpRedirectBinding, Saml2MessageBinding, SamlMessageType, SimpleSignature,
};
use crate::credential::X509Credential;
use crate::error::{SamlError, SamlResult};

/// Input to [`AuthnRequestFactory`].
#[derive(Debug, Clone)]
pub struct Saml2AuthenticationRequest {
    issuer: String,
    destination: String,
    assertion_consumer_service_url: String,
    credentials: Vec<X509Credential>,
}

impl Saml2AuthenticationRequest {
    /// Creates an unsigned request description.
    pub fn new(
        issuer: impl Into<String>,
        destination: impl Into<String>,
        assertion_consumer_service_url: impl Into<String>,
    ) -> SamlResult<Self> {
        Ok(Self {
            issuer: required(issuer.into(), "issuer")?,
            destination: required(destination.into(), "destination")?,
            assertion_consumer_service_url: required(
                assertion_consumer_service_url.into(),
                "assertion consumer service URL",
            )?,
            credentials: Vec::new(),
        })
    }

    /// Sets the credentials to sign with. An empty list means unsigned.
    #[must_use]
    pub fn with_credentials(mut self, credentials: impl IntoIterator<Item = X509Credential>) -> Self {
        self.credentials = credentials.into_iter().collect();
        self
    }

    /// Local entity ID.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Identity provider single sign-on URL.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Where the identity provider should deliver its response.
    #[must_use]
    pub fn assertion_consumer_service_url(&self) -> &str {
        &self.assertion_consumer_service_url
    }

    /// Signing credentials.
    #[must_use]
    pub fn credentials(&self) -> &[X509Credential] {
        &self.credentials
    }
}

/// An encoded authentication request ready for its binding.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    pub(crate) issuer: String,
    pub(crate) destination: String,
    pub(crate) assertion_consumer_service_url: String,
    pub(crate) saml_request: String,
    pub(crate) relay_state: Option<String>,
    pub(crate) binding: Saml2MessageBinding,
    pub(crate) credentials: Vec<X509Credential>,
    pub(crate) signature: Option<SimpleSignature>,
}

impl AuthenticationRequest {
    /// Local entity ID.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Identity provider single sign-on URL.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Where the identity provider should deliver its response.
    #[must_use]
    pub fn assertion_consumer_service_url(&self) -> &str {
        &self.assertion_consumer_service_url
    }

    /// The `SAMLRequest` value, encoded for the binding but not yet escaped.
    #[must_use]
    pub fn saml_request(&self) -> &str {
        &self.saml_request
    }

    /// Relay state, if any.
    #[must_use]
    pub fn relay_state(&self) -> Option<&str> {
        self.relay_state.as_deref()
    }

    /// Binding the request is sent with.
    #[must_use]
    pub const fn binding(&self) -> Saml2MessageBinding {
        self.binding
    }

    /// Credentials the request was signed with; empty when unsigned.
    #[must_use]
    pub fn credentials(&self) -> &[X509Credential] {
        &self.credentials
    }

    /// Detached signature, when the binding uses simple signing.
    #[must_use]
    pub fn simple_signature(&self) -> Option<&SimpleSignature> {
        self.signature.as_ref()
    }

    /// Produces the redirect URL or the auto-submitting form.
    #[must_use]
    pub fn encode(&self) -> EncodedRequest {
        if self.binding.is_redirect() {
            EncodedRequest::Redirect(HttpRedirectBinding::build_url(
                &self.destination,
                SamlMessageType::Request,
                &self.saml_request,
                self.relay_state.as_deref(),
                self.signature.as_ref(),
            ))
        } else {
            EncodedRequest::PostForm(HttpPostBinding::render_form(
                &self.destination,
                SamlMessageType::Request,
                &self.saml_request,
                self.relay_state.as_deref(),
                self.signature.as_ref(),
            ))
        }
    }
}

/// What the caller sends to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedRequest {
    /// Redirect to this URL.
    Redirect(String),
    /// Serve this HTML document.
    PostForm(String),
}

fn required(value: String, what: &str) -> SamlResult<String> {
    if value.trim().is_empty() {
        Err(SamlError::Configuration(format!("{what} cannot be empty")))
    } else {
        Ok(value)
    }
}
