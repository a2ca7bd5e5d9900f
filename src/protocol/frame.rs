use std::sync::LazyLock;

use regex::Regex;

/// Marker that brackets the decimal length in every frame header.
pub const FRAME_MARKER: &str = "~m~";

static FRAME_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~m~\d+~m~").expect("frame header pattern is valid"));

static HEARTBEAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^~h~\d+$").expect("heartbeat pattern is valid"));

/// Prefix `payload` with its `~m~<len>~m~` header. The length counts bytes.
pub fn encode(payload: &str) -> String {
    format!("{FRAME_MARKER}{}{FRAME_MARKER}{payload}", payload.len())
}

/// Split one physical read into the payloads it carries, in arrival order.
///
/// Assumes a read always holds whole frames, which holds for the websocket
/// transport since every text message is a complete set of frames. The
/// declared length is therefore not re-validated against the payload.
pub fn decode(buffer: &str) -> Vec<&str> {
    let mut parts = FRAME_HEADER.split(buffer);
    let mut messages = Vec::new();

    if let Some(first) = parts.next() {
        if !first.is_empty() {
            messages.push(first);
        }
    }
    messages.extend(parts);
    messages
}

/// True for the feed's `~h~<n>` liveness probe once the header is stripped.
pub fn is_heartbeat(message: &str) -> bool {
    HEARTBEAT.is_match(message.trim())
}
