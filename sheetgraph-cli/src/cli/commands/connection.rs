//! Endpoint and credential resolution
//!
//! Precedence: command-line flags, then environment (`.env` included), then
//! the selected configuration profile.

use anyhow::{Context, Result, bail};
use is_terminal::IsTerminal;

use sheetgraph::api::{Credentials, EndpointPolicy, GraphqlClient};
use sheetgraph::config::Config;

use crate::cli::ConnectionArgs;

pub const USERNAME_VAR: &str = "SHEETGRAPH_USERNAME";
pub const PASSWORD_VAR: &str = "SHEETGRAPH_PASSWORD";

/// Ordered endpoint list for a command
pub fn resolve_endpoints(args: &ConnectionArgs, config: &Config) -> Result<Vec<String>> {
    if !args.endpoints.is_empty() {
        return Ok(args.endpoints.clone());
    }
    let Some(name) = &args.profile else {
        bail!("No endpoint given: use --endpoint URL or --profile NAME");
    };
    let profile = config
        .profile(name)
        .with_context(|| format!("Profile '{}' not found in configuration", name))?;
    if profile.endpoints.is_empty() {
        bail!("Profile '{}' has no endpoints", name);
    }
    Ok(profile.endpoints.clone())
}

/// Credentials from flags, environment or profile; prompts for a missing password
pub fn resolve_credentials(args: &ConnectionArgs, config: &Config) -> Result<Option<Credentials>> {
    let profile_username = args
        .profile
        .as_deref()
        .and_then(|name| config.profile(name))
        .and_then(|p| p.username.clone());

    let Some(username) = args
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_VAR).ok())
        .or(profile_username)
    else {
        log::debug!("No username configured, sending requests without authentication");
        return Ok(None);
    };

    let password = match args
        .password
        .clone()
        .or_else(|| std::env::var(PASSWORD_VAR).ok())
    {
        Some(password) => password,
        None if std::io::stdin().is_terminal() => {
            rpassword::prompt_password(format!("Password for {}: ", username))
                .context("Failed to read password")?
        }
        None => bail!(
            "No password for user '{}': use --password or set {}",
            username,
            PASSWORD_VAR
        ),
    };

    Ok(Some(Credentials { username, password }))
}

/// Build the HTTP client for a command
pub fn build_client(args: &ConnectionArgs, config: &Config) -> Result<GraphqlClient> {
    let endpoints = resolve_endpoints(args, config)?;
    let credentials = resolve_credentials(args, config)?;
    log::info!("Using endpoint(s): {}", endpoints.join(", "));
    GraphqlClient::new(
        EndpointPolicy::new(endpoints),
        credentials,
        config.http.resilience(),
    )
}
