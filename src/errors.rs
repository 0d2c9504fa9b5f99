use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Errors>;

#[derive(Debug, Error)]
pub enum Errors {
  /// The key is not present in the index. Batch variants treat this as
  /// a normal signal rather than a failure.
  #[error("key not found")]
  KeyNotFound,

  /// The file exists but does not start with the store signature.
  #[error("bad file format: {}", path.display())]
  BadFormat { path: PathBuf },

  /// An underlying read/write/seek/fsync failed. `op` names the
  /// operation that produced the error.
  #[error("{op}: {source}")]
  Io {
    op: &'static str,
    #[source]
    source: io::Error,
  },

  /// A JSON wrapper could not encode or decode the value stored under
  /// `key`.
  #[error("invalid JSON value for key {key:?}")]
  InvalidJson { key: String },

  /// Keys are length-prefixed with a single byte on disk.
  #[error("key length {len} exceeds 255 bytes")]
  KeyTooLong { len: usize },

  /// The store handle was closed by an earlier `close` call.
  #[error("store is closed")]
  Closed,
}

impl Errors {
  pub(crate) fn io(op: &'static str, source: io::Error) -> Errors {
    Errors::Io { op, source }
  }

  /// True for the miss signal that batch operations swallow.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Errors::KeyNotFound)
  }
}
