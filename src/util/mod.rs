pub mod rand_kv;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix seconds, clamped to the `u32` the record header
/// stores (good until 2106).
pub(crate) fn unix_timestamp() -> u32 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs() as u32)
    .unwrap_or(0)
}
