pub mod error;

/// Current time in milliseconds since the Unix epoch.
///
/// Centralized so that tests can be reasoned about without needing to
/// mock the system clock: callers that need determinism go through the
/// store's own monotonic bookkeeping instead of calling this directly
/// from command handlers where avoidable.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}
