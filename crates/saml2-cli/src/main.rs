//! # saml2
//!
//! Command-line driver for the SAML 2.0 service provider core.

#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use saml2_cli::{
    cli::{Cli, Command},
    commands::{run_authn_request, run_decode, run_metadata, run_validate},
    output::{error, success},
};
use saml2_sp::SpConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            error(&format!("{e:#}"));
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let config_path = cli.config;
    let load_config = || {
        SpConfig::load(&config_path)
            .and_then(SpConfig::from_env_overrides)
            .with_context(|| format!("failed to load configuration from {}", config_path.display()))
    };

    let output = match cli.command {
        Command::AuthnRequest {
            registration_id,
            base_url,
            relay_state,
        } => run_authn_request(&load_config()?, &registration_id, &base_url, relay_state.as_deref())?,
        Command::Metadata {
            registration_id,
            base_url,
        } => run_metadata(&load_config()?, &registration_id, &base_url)?,
        Command::Decode { method, value } => run_decode(&value, method.into())?,
        Command::Validate {
            registration_id,
            base_url,
            method,
            response_file,
        } => {
            let identity = run_validate(
                &load_config()?,
                &registration_id,
                &base_url,
                method.into(),
                &response_file,
            )?;
            success("response is valid");
            identity
        }
    };
    Ok(output)
}
