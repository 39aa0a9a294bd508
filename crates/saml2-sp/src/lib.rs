//! SAML 2.0 Service Provider protocol core.
//!
//! This crate builds authentication requests for an identity provider and
//! validates the responses it sends back:
//!
//! - **AuthnRequest construction** - render, sign and encode per binding
//! - **Bindings** - HTTP-Redirect (deflate), HTTP-POST, simple sign and URI
//! - **Response validation** - destination, issuer, multi-key signature
//!   verification, decryption with key fallback, assertion conditions
//! - **Metadata** - service provider `EntityDescriptor` generation
//!
//! # Architecture
//!
//! - [`registration`] - per identity provider settings and credentials
//! - [`authn`] - request factory and resolver
//! - [`bindings`] - wire encodings
//! - [`validator`] - response and assertion validation
//! - [`web`] - request context and the assertion consumer entry point
//! - [`signature`] / [`encryption`] - XML security services behind traits
//! - [`context`] - the services handed to the factory and validator
//! - [`error`] - error types
//!
//! # Example
//!
//! ```rust,ignore
//! use saml2_sp::web::{RequestContext, Saml2WebSsoAuthenticationProcessor};
//! use saml2_sp::validator::Saml2ResponseValidator;
//!
//! let processor = Saml2WebSsoAuthenticationProcessor::new(Saml2ResponseValidator::new(
//!     SamlContext::default(),
//!     ValidatorSettings::default(),
//! ));
//! let identity = processor.attempt_authentication(&repository, &request)?;
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [SAML 2.0 Profiles](https://docs.oasis-open.org/security/saml/v2.0/saml-profiles-2.0-os.pdf)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authn;
pub mod bindings;
pub mod config;
pub mod context;
pub mod credential;
pub mod encryption;
pub mod error;
pub mod metadata;
pub mod registration;
pub mod signature;
pub mod types;
pub mod validator;
pub mod web;
pub mod xml;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use authn::{AuthenticationRequest, EncodedRequest, Saml2AuthenticationRequestResolver};
pub use bindings::Saml2MessageBinding;
pub use config::{SpConfig, ValidatorSettings};
pub use context::SamlContext;
pub use credential::{CredentialUsage, X509Credential};
pub use error::{SamlError, SamlResult};
pub use registration::{RelyingPartyRegistration, RelyingPartyRegistrationRepository};
pub use validator::{Saml2AuthenticationToken, Saml2ResponseValidator, ValidatedAssertion};
pub use web::RequestContext;
