//! JSON convenience layer over the byte-oriented store API.
//!
//! Values are encoded with `serde_json` before the write and decoded
//! after the read; the storage layer itself only ever sees bytes.
//! Failures to encode, decode or validate surface as
//! [`Errors::InvalidJson`] carrying the offending key.

use std::collections::HashMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::db::Store;
use crate::errors::{Errors, Result};

fn invalid_json(key: &[u8]) -> Errors {
  Errors::InvalidJson {
    key: String::from_utf8_lossy(key).into_owned(),
  }
}

impl Store {
  /// Serialises `value` as JSON and stores it under `key`.
  pub fn put_json<T: Serialize>(&self, key: Bytes, value: &T) -> Result<()> {
    let data = serde_json::to_vec(value).map_err(|_| invalid_json(&key))?;
    self.put(key, Bytes::from(data))
  }

  /// Reads the value under `key` and deserialises it from JSON.
  pub fn get_json<T: DeserializeOwned>(&self, key: Bytes) -> Result<T> {
    let data = self.get(key.clone())?;
    serde_json::from_slice(&data).map_err(|_| invalid_json(&key))
  }

  /// Serialises every value and writes the batch under one lock
  /// acquisition. Nothing is written unless every value encodes.
  pub fn puts_json<T: Serialize>(&self, values: HashMap<Bytes, T>) -> Result<()> {
    let mut encoded = HashMap::with_capacity(values.len());
    for (key, value) in &values {
      let data = serde_json::to_vec(value).map_err(|_| invalid_json(key))?;
      encoded.insert(key.clone(), Bytes::from(data));
    }
    self.puts(encoded)
  }

  /// Reads several keys as raw JSON documents, validating each one.
  /// Missing keys yield `None`; a stored value that is not valid JSON
  /// fails the whole call.
  pub fn gets_json(&self, keys: &[Bytes]) -> Result<Vec<Option<Box<RawValue>>>> {
    let values = self.gets(keys)?;
    let mut result = Vec::with_capacity(values.len());
    for (key, value) in keys.iter().zip(values) {
      match value {
        None => result.push(None),
        Some(data) => {
          let text = String::from_utf8(data.to_vec()).map_err(|_| invalid_json(key))?;
          let raw = RawValue::from_string(text).map_err(|_| invalid_json(key))?;
          result.push(Some(raw));
        }
      }
    }
    Ok(result)
  }
}
