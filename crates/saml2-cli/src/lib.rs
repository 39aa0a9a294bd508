//! # saml2-cli
//!
//! Command-line driver for the SAML 2.0 service provider core.
//!
//! Loads relying party registrations from a TOML file and exposes:
//! - AuthnRequest generation (redirect URL or auto-submitting form)
//! - Service provider metadata generation
//! - Decoding of `SAMLRequest`/`SAMLResponse` values
//! - Response validation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use error::{CliError, CliResult};
