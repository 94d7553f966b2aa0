//! Provider REST adapters
//!
//! One module per provider, each implementing the core port traits over the
//! vendor's REST API with `reqwest`. Shared plumbing (the in-memory token
//! slot and HTTP status classification) lives here.

pub mod confluence;
pub mod google;
pub mod jira;
pub mod slack;
pub mod zoom;

use beacon_domain::{BeaconError, CredentialRecord, Provider, Result};
use parking_lot::RwLock;
use reqwest::StatusCode;

/// In-memory credential slot shared by every OAuth-backed client.
///
/// `set` replaces the record wholesale (the coordinator's hot-swap);
/// `access_token` fails with an auth error when no usable token is held, so
/// an unconfigured client surfaces the same taxonomy as an expired one.
pub(crate) struct TokenSlot {
    provider: Provider,
    record: RwLock<Option<CredentialRecord>>,
}

impl TokenSlot {
    pub(crate) fn new(provider: Provider) -> Self {
        Self { provider, record: RwLock::new(None) }
    }

    pub(crate) fn set(&self, record: CredentialRecord) {
        *self.record.write() = Some(record);
    }

    pub(crate) fn access_token(&self) -> Result<String> {
        self.record
            .read()
            .as_ref()
            .filter(|record| record.is_connected())
            .map(|record| record.access_token.clone())
            .ok_or_else(|| {
                BeaconError::Auth(format!("no access token configured for {}", self.provider))
            })
    }
}

/// Classify a non-success HTTP status: 401/403 are authorization failures
/// (they drive the coordinator's refresh-and-retry), everything else is a
/// plain network-level error.
pub(crate) fn map_status_error(status: StatusCode, context: &str, body: &str) -> BeaconError {
    let message = if body.is_empty() {
        format!("{context} returned status {status}")
    } else {
        format!("{context} returned status {status}: {body}")
    };

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        BeaconError::Auth(message)
    } else {
        BeaconError::Network(message)
    }
}

/// Map a transport-level reqwest failure.
pub(crate) fn map_request_error(err: reqwest::Error, context: &str) -> BeaconError {
    BeaconError::Network(format!("{context} request failed: {err}"))
}

/// Map a body-decoding failure.
pub(crate) fn map_parse_error(err: reqwest::Error, context: &str) -> BeaconError {
    BeaconError::InvalidInput(format!("failed to parse {context} response: {err}"))
}
