//! JSON-friendly timestamp wrapper.
//!
//! [`Timestamp`] serialises a `SystemTime` as plain integer Unix
//! seconds instead of an RFC 3339 string, which keeps stored JSON
//! values compact and language-neutral.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub SystemTime);

impl Timestamp {
  pub fn now() -> Timestamp {
    Timestamp(SystemTime::now())
  }

  /// Seconds since the Unix epoch, negative for times before it.
  /// Sub-second precision is dropped.
  pub fn unix_seconds(&self) -> i64 {
    match self.0.duration_since(UNIX_EPOCH) {
      Ok(d) => d.as_secs() as i64,
      Err(e) => -(e.duration().as_secs() as i64),
    }
  }

  pub fn from_unix_seconds(secs: i64) -> Timestamp {
    if secs >= 0 {
      Timestamp(UNIX_EPOCH + Duration::from_secs(secs as u64))
    } else {
      Timestamp(UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()))
    }
  }
}

impl From<SystemTime> for Timestamp {
  fn from(time: SystemTime) -> Timestamp {
    Timestamp(time)
  }
}

impl Serialize for Timestamp {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(self.unix_seconds())
  }
}

impl<'de> Deserialize<'de> for Timestamp {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
    let secs = i64::deserialize(deserializer)?;
    Ok(Timestamp::from_unix_seconds(secs))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_serialize_as_unix_seconds() {
    let ts = Timestamp::from_unix_seconds(62_290_800);
    assert_eq!(serde_json::to_string(&ts).unwrap(), "62290800");
  }

  #[test]
  fn test_round_trip() {
    let ts = Timestamp::from_unix_seconds(1_700_000_000);
    let json = serde_json::to_string(&ts).unwrap();
    let back: Timestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ts);
  }

  #[test]
  fn test_pre_epoch() {
    let ts = Timestamp::from_unix_seconds(-86_400);
    assert_eq!(ts.unix_seconds(), -86_400);
    let json = serde_json::to_string(&ts).unwrap();
    assert_eq!(json, "-86400");
    let back: Timestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ts);
  }

  #[test]
  fn test_now_drops_subseconds() {
    let ts = Timestamp::now();
    let back = Timestamp::from_unix_seconds(ts.unix_seconds());
    let diff = ts
      .0
      .duration_since(back.0)
      .expect("truncation only moves backwards");
    assert!(diff < Duration::from_secs(1));
  }
}
