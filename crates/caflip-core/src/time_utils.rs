use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch; saturates to zero on a pre-epoch clock.
pub fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}
