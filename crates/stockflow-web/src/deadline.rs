use std::time::Duration;

use axum::http::HeaderMap;
use tokio::time::Instant;

/// Inbound header carrying the caller's remaining budget in milliseconds.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// Converts the caller's budget into an absolute deadline.
///
/// Missing, unparsable or unrepresentable values mean no deadline.
pub fn deadline_from_headers(headers: &HeaderMap) -> Option<Instant> {
    let raw = headers.get(REQUEST_TIMEOUT_HEADER)?;
    let Some(millis) = raw.to_str().ok().and_then(|value| value.trim().parse::<u64>().ok())
    else {
        tracing::debug!(value = ?raw, "ignoring unparsable request timeout header");
        return None;
    };
    let deadline = Instant::now().checked_add(Duration::from_millis(millis));
    if deadline.is_none() {
        tracing::debug!(millis, "request timeout beyond clock range; ignoring");
    }
    deadline
}
