//! Shared constants and small helpers.

/// The `x` value of the first entry of every chain.
pub const GENESIS: &str = "GENESIS";

/// Status recorded on every appended entry.
pub const STATUS_SUCCESS: &str = "success";

/// Generate an opaque identifier such as `agent_3f2a...`.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
