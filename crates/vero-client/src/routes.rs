//! Control API routes and address handling.

use reqwest::Url;
use shared_types::GeneratorChannelId;

use crate::error::ClientError;

pub const LOGIN: &str = "/auth/login";
pub const GENLOCK: &str = "/api/settings/genlock";
pub const GENERATOR_PROFILES: &str = "/api/generator/profiles";
pub const CAPTURE_JOBS: &str = "/api/capture/jobs";

/// Socket.IO endpoint on the appliance.
pub const EVENT_FEED_PATH: &str = "/socket.io/";

/// Engine.IO protocol revision spoken by the event feed.
pub const ENGINE_IO_VERSION: &str = "4";

pub fn generator_start(channel: GeneratorChannelId) -> String {
    format!("/api/generator/{channel}/start")
}

pub fn capture_source(kind: &str, index: usize) -> String {
    format!("/api/capture/sources/{kind}/{index}")
}

/// Parse the user supplied host into the control API base URL.
///
/// Accepts `host`, `host:port`, or a full `http(s)://` URL.
pub fn base_url(address: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty address".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Derive the WebSocket URL of the event feed from the API base URL.
pub fn event_feed_url(base: &Url) -> Result<Url, ClientError> {
    let mut url = base.join(EVENT_FEED_PATH).map_err(|e| ClientError::InvalidAddress {
        address: base.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme).map_err(|()| ClientError::InvalidAddress {
        address: base.to_string(),
        reason: format!("cannot switch to {scheme}"),
    })?;

    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", ENGINE_IO_VERSION)
        .append_pair("transport", "websocket");
    Ok(url)
}
