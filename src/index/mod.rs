//! In-memory structures rebuilt from the data file at open time: the
//! key index over live records and the free set of reusable regions.

pub mod free;

use std::collections::HashMap;

use bytes::Bytes;

use crate::data::record::RecordPos;

/// Mapping from raw key bytes to the live record's file location.
///
/// Invariant: every live record in the file has exactly one entry, and
/// every entry points at a live record whose stored sizes match.
#[derive(Debug, Default)]
pub struct KeyIndex {
  map: HashMap<Vec<u8>, RecordPos>,
}

impl KeyIndex {
  pub fn new() -> KeyIndex {
    KeyIndex::default()
  }

  pub fn get(&self, key: &[u8]) -> Option<RecordPos> {
    self.map.get(key).copied()
  }

  pub fn insert(&mut self, key: Vec<u8>, pos: RecordPos) -> Option<RecordPos> {
    self.map.insert(key, pos)
  }

  pub fn remove(&mut self, key: &[u8]) -> Option<RecordPos> {
    self.map.remove(key)
  }

  pub fn contains(&self, key: &[u8]) -> bool {
    self.map.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }

  /// Snapshot of all keys, in no particular order. The query layer
  /// sorts it.
  pub fn keys_snapshot(&self) -> Vec<Bytes> {
    self
      .map
      .keys()
      .map(|key| Bytes::copy_from_slice(key))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pos(offset: u64) -> RecordPos {
    RecordPos {
      offset,
      key_size: 2,
      data_size: 8,
      empty_size: 0,
    }
  }

  #[test]
  fn test_insert_get_remove() {
    let mut index = KeyIndex::new();
    assert!(index.is_empty());

    assert_eq!(index.insert(b"k1".to_vec(), pos(12)), None);
    assert_eq!(index.insert(b"k2".to_vec(), pos(36)), None);
    assert_eq!(index.len(), 2);
    assert!(index.contains(b"k1"));
    assert_eq!(index.get(b"k1").unwrap().offset, 12);

    let old = index.insert(b"k1".to_vec(), pos(60)).unwrap();
    assert_eq!(old.offset, 12);
    assert_eq!(index.len(), 2);

    assert_eq!(index.remove(b"k1").unwrap().offset, 60);
    assert_eq!(index.get(b"k1"), None);
    assert!(!index.contains(b"k1"));
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn test_keys_snapshot() {
    let mut index = KeyIndex::new();
    index.insert(b"b".to_vec(), pos(12));
    index.insert(b"a".to_vec(), pos(36));

    let mut keys = index.keys_snapshot();
    keys.sort();
    assert_eq!(keys, vec![Bytes::from("a"), Bytes::from("b")]);
  }
}
