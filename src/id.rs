//! ID generation utilities.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Generate a unique request ID
///
/// Format: `req-{timestamp_ms}-{random_hex}`
pub fn generate_request_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("req-{}-{:04x}", timestamp, random)
}

/// Generate a short suffix for artifact filenames
///
/// Format: 8 hex chars, e.g. `a1b2c3d4`
pub fn generate_artifact_suffix() -> String {
    let random: u32 = rand::rng().random();
    format!("{:08x}", random)
}
