//! Time-plus-counter identifiers.
//!
//! A [`Uid`] packs nanoseconds since 2018-07-31T00:00:00Z into the high
//! 48 bits and a process-wide counter into the low 16, so ids created
//! in one process are unique and sort roughly by creation time. The
//! counter starts at a random value to keep ids from separate process
//! runs within the same tick from colliding.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 2018-07-31T00:00:00Z, the epoch the time component counts from.
const UID_EPOCH_SECS: u64 = 1_532_995_200;

/// Low bits reserved for the counter.
const COUNTER_MASK: u64 = 0xffff;

lazy_static! {
  static ref COUNTER: AtomicU32 = AtomicU32::new(rand::random());
}

fn uid_epoch() -> SystemTime {
  UNIX_EPOCH + Duration::from_secs(UID_EPOCH_SECS)
}

/// Unique identifier built from a timestamp and a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(u64);

impl Uid {
  /// Builds a fresh identifier from the current time and the next
  /// counter value.
  pub fn new() -> Uid {
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed).wrapping_add(1) as u16;
    let nanos = SystemTime::now()
      .duration_since(uid_epoch())
      .map(|d| d.as_nanos() as u64)
      .unwrap_or(0);
    Uid((nanos & !COUNTER_MASK) | counter as u64)
  }

  /// Lowest identifier for the given time: the time component alone,
  /// counter zero. Useful as a range cursor. Times before the Uid
  /// epoch clamp to zero.
  pub fn from_time(time: SystemTime) -> Uid {
    let nanos = time
      .duration_since(uid_epoch())
      .map(|d| d.as_nanos() as u64)
      .unwrap_or(0);
    Uid(nanos & !COUNTER_MASK)
  }

  /// Creation time carried by the identifier.
  pub fn time(&self) -> SystemTime {
    uid_epoch() + Duration::from_nanos(self.0 & !COUNTER_MASK)
  }

  /// Counter component.
  pub fn counter(&self) -> u16 {
    self.0 as u16
  }

  pub fn as_u64(&self) -> u64 {
    self.0
  }

  pub fn from_u64(raw: u64) -> Uid {
    Uid(raw)
  }

  /// Big-endian binary form, suitable as a store key.
  pub fn to_be_bytes(&self) -> [u8; 8] {
    self.0.to_be_bytes()
  }

  pub fn from_be_bytes(raw: [u8; 8]) -> Uid {
    Uid(u64::from_be_bytes(raw))
  }
}

impl Default for Uid {
  fn default() -> Uid {
    Uid::new()
  }
}

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

impl fmt::Display for Uid {
  /// Base-36 text form, the shortest alphanumeric rendering of the
  /// 64-bit value.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut digits = [0u8; 13]; // ceil(64 / log2(36))
    let mut at = digits.len();
    let mut rest = self.0;
    loop {
      at -= 1;
      digits[at] = BASE36_DIGITS[(rest % 36) as usize];
      rest /= 36;
      if rest == 0 {
        break;
      }
    }
    // digits are ASCII by construction
    f.write_str(std::str::from_utf8(&digits[at..]).unwrap())
  }
}

impl FromStr for Uid {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> std::result::Result<Uid, Self::Err> {
    u64::from_str_radix(s, 36).map(Uid)
  }
}

impl Serialize for Uid {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Uid {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Uid, D::Error> {
    let text = String::deserialize(deserializer)?;
    if text.is_empty() {
      return Ok(Uid(0));
    }
    text.parse().map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_uid_unique_and_ordered_counters() {
    let mut seen = std::collections::HashSet::new();
    for _ in 0..1000 {
      assert!(seen.insert(Uid::new()));
    }
  }

  #[test]
  fn test_uid_text_round_trip() {
    for _ in 0..25 {
      let uid = Uid::new();
      let parsed: Uid = uid.to_string().parse().unwrap();
      assert_eq!(parsed, uid);
    }
    assert_eq!(Uid(0).to_string(), "0");
    assert_eq!("0".parse::<Uid>().unwrap(), Uid(0));
    assert_eq!(Uid(35).to_string(), "z");
    assert_eq!(Uid(36).to_string(), "10");
  }

  #[test]
  fn test_uid_binary_round_trip() {
    let uid = Uid::new();
    assert_eq!(Uid::from_be_bytes(uid.to_be_bytes()), uid);
  }

  #[test]
  fn test_uid_time_component() {
    let uid = Uid::new();
    let elapsed = SystemTime::now()
      .duration_since(uid.time())
      .expect("uid time should not be in the future");
    assert!(elapsed < Duration::from_secs(1));
  }

  #[test]
  fn test_from_time() {
    assert_eq!(Uid::from_time(uid_epoch()), Uid(0));
    assert_eq!(Uid::from_time(uid_epoch() - Duration::from_secs(3600)), Uid(0));

    let later = uid_epoch() + Duration::from_secs(12 * 3600);
    let uid = Uid::from_time(later);
    assert_eq!(uid.counter(), 0);
    assert_eq!(uid.time(), later);
  }

  #[test]
  fn test_uid_serde_as_base36_string() {
    let uid = Uid::new();
    let json = serde_json::to_string(&uid).unwrap();
    assert_eq!(json, format!("\"{uid}\""));
    let back: Uid = serde_json::from_str(&json).unwrap();
    assert_eq!(back, uid);

    let empty: Uid = serde_json::from_str("\"\"").unwrap();
    assert_eq!(empty, Uid(0));
  }
}
