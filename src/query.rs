//! Key selection: filter by prefix, order, apply a cursor, paginate.
//!
//! Keys are ordered by length first and only then lexicographically, so
//! short keys always come before longer ones (fixed-width encodings
//! such as big-endian integers therefore list in numeric order). The
//! `asc` flag reverses both criteria at once.

use std::cmp::Ordering;

use bytes::Bytes;

/// Length-first ascending comparison.
fn compare(a: &[u8], b: &[u8]) -> Ordering {
  a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_dir(a: &[u8], b: &[u8], asc: bool) -> Ordering {
  let ord = compare(a, b);
  if asc {
    ord
  } else {
    ord.reverse()
  }
}

/// Applies the full selection pipeline to a key snapshot.
///
/// `last` is a cursor: the result starts right after the position where
/// `last` falls in the ordered list, whether or not it is present. Zero
/// `offset`/`limit` mean no skip / no cap.
pub fn select(
  mut keys: Vec<Bytes>,
  prefix: &[u8],
  last: &[u8],
  offset: u32,
  limit: u32,
  asc: bool,
) -> Vec<Bytes> {
  if !prefix.is_empty() {
    keys.retain(|key| key.starts_with(prefix));
  }
  keys.sort_unstable_by(|a, b| compare_dir(a, b, asc));

  if !last.is_empty() {
    let mut from = keys.partition_point(|key| compare_dir(key, last, asc) == Ordering::Less);
    if from < keys.len() && keys[from] == last {
      from += 1;
    }
    keys.drain(..from);
  }
  if offset > 0 {
    keys.drain(..(offset as usize).min(keys.len()));
  }
  if limit > 0 {
    keys.truncate(limit as usize);
  }
  keys
}
