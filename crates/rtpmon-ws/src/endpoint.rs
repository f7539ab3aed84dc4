//! Endpoint derivation from the dashboard origin.
//!
//! The feed always lives at a fixed path on the same host that serves the
//! dashboard; only the scheme follows the origin (secure origin → `wss`).

use crate::error::{WsError, WsResult};

/// Path of the snapshot feed on the dashboard host.
pub const WS_PATH: &str = "/webapp/ws";

/// Build the WebSocket URL for `origin`.
///
/// Accepts `http(s)://host[:port][/...]`, `ws(s)://...` or a bare
/// `host[:port]`. Any path on the origin is replaced by [`WS_PATH`].
pub fn endpoint_url(origin: &str) -> WsResult<String> {
    let origin = origin.trim();
    let (scheme, rest) = match origin.split_once("://") {
        Some((scheme, rest)) => match scheme.to_ascii_lowercase().as_str() {
            "https" | "wss" => ("wss", rest),
            "http" | "ws" => ("ws", rest),
            other => {
                return Err(WsError::InvalidEndpoint(format!(
                    "unsupported scheme '{other}' in {origin}"
                )))
            }
        },
        None => ("ws", origin),
    };

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(WsError::InvalidEndpoint(format!("missing host in '{origin}'")));
    }

    Ok(format!("{scheme}://{host}{WS_PATH}"))
}
