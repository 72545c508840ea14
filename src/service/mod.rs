//! The remote snapshot service seam: the trait the policy engine drives and
//! the DigitalOcean implementation of it.

pub mod digitalocean;
pub mod traits;

pub use digitalocean::DigitalOceanClient;
pub use traits::{Snapshot, SnapshotId, SnapshotService};

use crate::error::ConfigError;

/// Environment variables searched for the API token when `--token` is not
/// given, in order.
const TOKEN_ENV_VARS: [&str; 2] = ["DIGITALOCEAN_TOKEN", "DO_TOKEN"];

/// Resolves the API token: an explicit value wins, then the environment.
/// A missing token is an error, never a sentinel that fails later at the
/// service.
pub fn resolve_token(explicit: Option<&str>) -> Result<String, ConfigError> {
    resolve_token_with(explicit, |var| std::env::var(var).ok())
}

fn resolve_token_with<F>(explicit: Option<&str>, env: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    TOKEN_ENV_VARS
        .iter()
        .filter_map(|var| env(var))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .ok_or(ConfigError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_token_wins_over_the_environment() {
        let token = resolve_token_with(Some("flag-token"), |_| Some("env-token".into()));
        assert_eq!(token.unwrap(), "flag-token");
    }

    #[test]
    fn explicit_token_is_trimmed() {
        let token = resolve_token_with(Some("  flag-token  "), |_| None);
        assert_eq!(token.unwrap(), "flag-token");
    }

    #[test]
    fn blank_explicit_token_falls_through_to_the_environment() {
        let token = resolve_token_with(Some("   "), |var| {
            (var == "DIGITALOCEAN_TOKEN").then(|| "env-token".into())
        });
        assert_eq!(token.unwrap(), "env-token");
    }

    #[test]
    fn do_token_is_the_second_choice() {
        let token = resolve_token_with(None, |var| {
            (var == "DO_TOKEN").then(|| "fallback-token".into())
        });
        assert_eq!(token.unwrap(), "fallback-token");
    }

    #[test]
    fn primary_env_var_shadows_the_fallback() {
        let token = resolve_token_with(None, |var| match var {
            "DIGITALOCEAN_TOKEN" => Some("primary".into()),
            _ => Some("fallback".into()),
        });
        assert_eq!(token.unwrap(), "primary");
    }

    #[test]
    fn missing_everywhere_is_a_config_error() {
        let err = resolve_token_with(None, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }
}
