//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If nothing is configured there, falls back to loading from a file
//! 3. Probes conventional paths for config files
//! 4. Supports JSON and TOML formats (detected by extension)
//!
//! ## Environment Variables
//! Each provider is configured independently; a provider whose variables
//! are absent is simply left unconfigured.
//! - `BEACON_GOOGLE_CLIENT_ID` / `BEACON_GOOGLE_CLIENT_SECRET`
//! - `BEACON_SLACK_CLIENT_ID` / `BEACON_SLACK_CLIENT_SECRET` /
//!   `BEACON_SLACK_USER_ID`
//! - `BEACON_JIRA_DOMAIN` / `BEACON_JIRA_EMAIL` / `BEACON_JIRA_API_TOKEN` /
//!   `BEACON_JIRA_PROJECT_KEY`
//! - `BEACON_CONFLUENCE_DOMAIN` / `BEACON_CONFLUENCE_EMAIL` /
//!   `BEACON_CONFLUENCE_API_TOKEN` / `BEACON_CONFLUENCE_SPACE_KEY`
//! - `BEACON_ZOOM_CLIENT_ID` / `BEACON_ZOOM_CLIENT_SECRET`
//! - `BEACON_RELAY_URL`
//! - `BEACON_POLL_INTERVAL` (seconds, default 10)
//!
//! ## File Locations
//! The loader probes `./beacon.json`, `./beacon.toml`, `./config.json`,
//! and `./config.toml` (current working directory, then parent).

use std::path::{Path, PathBuf};

use beacon_domain::{
    BeaconConfig, BeaconError, ConfluenceConfig, GoogleConfig, JiraConfig, RelayConfig, Result,
    SlackConfig, ZoomConfig,
};
use tracing::{debug, info};

/// Load configuration with automatic fallback strategy.
///
/// # Errors
/// Returns `BeaconError::Config` if neither environment variables nor a
/// config file yield a valid configuration.
pub fn load() -> Result<BeaconConfig> {
    let from_env = load_from_env()?;
    if has_any_provider(&from_env) {
        info!("configuration loaded from environment variables");
        return Ok(from_env);
    }

    debug!("no providers configured via environment; trying config file");
    load_from_file(None)
}

/// Load configuration from environment variables.
///
/// Providers with incomplete variable sets are rejected rather than half
/// configured.
///
/// # Errors
/// Returns `BeaconError::Config` when a provider's variables are partially
/// present or a value fails validation.
pub fn load_from_env() -> Result<BeaconConfig> {
    let google = provider_from_env(
        "google",
        &["BEACON_GOOGLE_CLIENT_ID", "BEACON_GOOGLE_CLIENT_SECRET"],
        |v| GoogleConfig { client_id: v[0].clone(), client_secret: v[1].clone() },
    )?;

    let slack = provider_from_env(
        "slack",
        &["BEACON_SLACK_CLIENT_ID", "BEACON_SLACK_CLIENT_SECRET", "BEACON_SLACK_USER_ID"],
        |v| SlackConfig {
            client_id: v[0].clone(),
            client_secret: v[1].clone(),
            user_id: v[2].clone(),
        },
    )?;

    let jira = provider_from_env(
        "jira",
        &[
            "BEACON_JIRA_DOMAIN",
            "BEACON_JIRA_EMAIL",
            "BEACON_JIRA_API_TOKEN",
            "BEACON_JIRA_PROJECT_KEY",
        ],
        |v| JiraConfig {
            domain: v[0].clone(),
            email: v[1].clone(),
            api_token: v[2].clone(),
            project_key: v[3].clone(),
        },
    )?;

    let confluence = provider_from_env(
        "confluence",
        &[
            "BEACON_CONFLUENCE_DOMAIN",
            "BEACON_CONFLUENCE_EMAIL",
            "BEACON_CONFLUENCE_API_TOKEN",
            "BEACON_CONFLUENCE_SPACE_KEY",
        ],
        |v| ConfluenceConfig {
            domain: v[0].clone(),
            email: v[1].clone(),
            api_token: v[2].clone(),
            space_key: v[3].clone(),
        },
    )?;

    let zoom = provider_from_env(
        "zoom",
        &["BEACON_ZOOM_CLIENT_ID", "BEACON_ZOOM_CLIENT_SECRET"],
        |v| ZoomConfig { client_id: v[0].clone(), client_secret: v[1].clone() },
    )?;

    let relay = std::env::var("BEACON_RELAY_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|base_url| RelayConfig { base_url });

    let poll_interval_seconds = match std::env::var("BEACON_POLL_INTERVAL") {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| BeaconError::Config(format!("invalid BEACON_POLL_INTERVAL: {e}")))?,
        Err(_) => 10,
    };

    let config =
        BeaconConfig { google, slack, jira, confluence, zoom, relay, poll_interval_seconds };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes conventional locations. Supports JSON and
/// TOML, detected by file extension.
///
/// # Errors
/// Returns `BeaconError::Config` if no file is found, the format is
/// invalid, or validation fails.
pub fn load_from_file(path: Option<&Path>) -> Result<BeaconConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => probe_config_paths().ok_or_else(|| {
            BeaconError::Config("no beacon config file found in conventional locations".to_string())
        })?,
    };

    let raw = std::fs::read_to_string(&path)
        .map_err(|e| BeaconError::Config(format!("failed to read {}: {e}", path.display())))?;

    let config: BeaconConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&raw)
            .map_err(|e| BeaconError::Config(format!("invalid TOML in {}: {e}", path.display())))?,
        _ => serde_json::from_str(&raw)
            .map_err(|e| BeaconError::Config(format!("invalid JSON in {}: {e}", path.display())))?,
    };

    config.validate()?;
    info!(path = %path.display(), "configuration loaded from file");
    Ok(config)
}

/// Probe conventional config file locations, nearest first.
fn probe_config_paths() -> Option<PathBuf> {
    const CANDIDATES: [&str; 4] = ["beacon.json", "beacon.toml", "config.json", "config.toml"];

    for dir in [".", ".."] {
        for name in CANDIDATES {
            let candidate = Path::new(dir).join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn has_any_provider(config: &BeaconConfig) -> bool {
    config.google.is_some()
        || config.slack.is_some()
        || config.jira.is_some()
        || config.confluence.is_some()
        || config.zoom.is_some()
        || config.relay.is_some()
}

/// Build one provider config from its environment variables: all present
/// builds it, all absent skips it, a mix is a configuration error.
fn provider_from_env<T>(
    name: &str,
    vars: &[&str],
    build: impl FnOnce(&[String]) -> T,
) -> Result<Option<T>> {
    let values: Vec<Option<String>> = vars
        .iter()
        .map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .collect();

    if values.iter().all(Option::is_none) {
        return Ok(None);
    }

    if values.iter().any(Option::is_none) {
        let missing: Vec<&str> = vars
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.is_none())
            .map(|(var, _)| *var)
            .collect();
        return Err(BeaconError::Config(format!(
            "incomplete {name} configuration; missing {}",
            missing.join(", ")
        )));
    }

    let values: Vec<String> = values.into_iter().flatten().collect();
    Ok(Some(build(&values)))
}

#[cfg(test)]
mod tests {
    //! Unit tests for config file parsing.
    use super::*;

    #[test]
    fn json_config_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.json");
        std::fs::write(
            &path,
            r#"{
                "jira": {
                    "domain": "acme.atlassian.net",
                    "email": "bot@acme.dev",
                    "api_token": "secret",
                    "project_key": "AMP"
                },
                "poll_interval_seconds": 15
            }"#,
        )
        .unwrap();

        let config = load_from_file(Some(&path)).unwrap();
        assert_eq!(config.jira.unwrap().project_key, "AMP");
        assert_eq!(config.poll_interval_seconds, 15);
        assert!(config.google.is_none());
    }

    #[test]
    fn toml_config_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.toml");
        std::fs::write(
            &path,
            r#"
            poll_interval_seconds = 30

            [google]
            client_id = "id"
            client_secret = "secret"
            "#,
        )
        .unwrap();

        let config = load_from_file(Some(&path)).unwrap();
        assert_eq!(config.google.unwrap().client_id, "id");
        assert_eq!(config.poll_interval_seconds, 30);
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.json");
        std::fs::write(&path, "not json at all").unwrap();

        let err = load_from_file(Some(&path)).unwrap_err();
        assert!(matches!(err, BeaconError::Config(_)));
    }

    #[test]
    fn file_failing_validation_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.json");
        std::fs::write(
            &path,
            r#"{ "google": { "client_id": "", "client_secret": "x" } }"#,
        )
        .unwrap();

        assert!(load_from_file(Some(&path)).is_err());
    }
}
