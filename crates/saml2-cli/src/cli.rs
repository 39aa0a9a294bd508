//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use saml2_sp::bindings::HttpMethod;

/// SAML 2.0 service provider tool.
#[derive(Debug, Parser)]
#[command(name = "saml2")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, env = "SAML2_CONFIG", default_value = "saml2.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the AuthnRequest for a registration.
    AuthnRequest {
        /// Registration ID.
        registration_id: String,

        /// Application base URL the templates resolve against.
        #[arg(long)]
        base_url: String,

        /// Relay state to carry through the login.
        #[arg(long)]
        relay_state: Option<String>,
    },

    /// Print service provider metadata for a registration.
    Metadata {
        /// Registration ID.
        registration_id: String,

        /// Application base URL the templates resolve against.
        #[arg(long)]
        base_url: String,
    },

    /// Decode a SAMLRequest or SAMLResponse value.
    Decode {
        /// HTTP method the value was delivered with.
        #[arg(long, value_enum, default_value = "post")]
        method: Method,

        /// The encoded value.
        value: String,
    },

    /// Validate a SAMLResponse for a registration.
    Validate {
        /// Registration ID.
        registration_id: String,

        /// Application base URL the templates resolve against.
        #[arg(long)]
        base_url: String,

        /// HTTP method the response was delivered with.
        #[arg(long, value_enum, default_value = "post")]
        method: Method,

        /// File holding the encoded SAMLResponse value.
        #[arg(long)]
        response_file: PathBuf,
    },
}

/// HTTP method argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Method {
    /// Deflated, as sent by the redirect binding.
    Get,
    /// Base64 only, as sent by the POST binding.
    Post,
}

impl From<Method> for HttpMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::Get,
            Method::Post => Self::Post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authn_request() {
        let cli = Cli::try_parse_from([
            "saml2",
            "authn-request",
            "idp1",
            "--base-url",
            "https://sp.example",
            "--relay-state",
            "abc",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("saml2.toml"));
        assert!(matches!(
            cli.command,
            Command::AuthnRequest { ref registration_id, ref relay_state, .. }
                if registration_id == "idp1" && relay_state.as_deref() == Some("abc")
        ));
    }

    #[test]
    fn parses_validate_with_global_flags() {
        let cli = Cli::try_parse_from([
            "saml2",
            "validate",
            "idp1",
            "--base-url",
            "https://sp.example",
            "--method",
            "get",
            "--response-file",
            "response.txt",
            "--config",
            "other.toml",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Command::Validate { method: Method::Get, .. }));
    }

    #[test]
    fn rejects_unknown_method() {
        assert!(Cli::try_parse_from(["saml2", "decode", "--method", "put", "x"]).is_err());
    }
}
