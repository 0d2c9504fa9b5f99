//! Keyfile: an embedded key-value store that keeps every record in a
//! single append-oriented data file.
//!
//! The whole store is one file: a 12-byte header followed by records.
//! Opening scans the file once to rebuild an in-memory key index and a
//! set of reusable free slots; after that, reads cost one positional
//! read and writes cost one positional write. Deleted records are
//! tombstoned in place and their space is handed back to later writes
//! by best-fit, so the file does not grow under churn. There is no
//! separate index file, no write-ahead log and no compaction thread,
//! which keeps operational handling trivial for stores of modest size
//! (the open scan is O(file size)).
//!
//! # Features
//!
//! * Single-file layout with in-place space reuse
//! * Durable writes with a per-store sync switch
//! * Batch put/get/delete under one lock acquisition
//! * Key listing with prefix filter, cursor and pagination
//! * Persisted monotonic sequence counter
//! * JSON convenience wrappers and a process-wide store registry
//!
//! # Basic Usage
//!
//! ```
//! use bytes::Bytes;
//! use keyfile::Store;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = Store::open(dir.path().join("data.db")).expect("failed to open store");
//!
//! // Store a key-value pair
//! let key = Bytes::from(b"hello".to_vec());
//! let value = Bytes::from(b"world".to_vec());
//! store.put(key.clone(), value.clone()).expect("failed to put");
//!
//! // Retrieve the value
//! let retrieved = store.get(key.clone()).expect("failed to get");
//! assert_eq!(retrieved, value);
//!
//! // Delete the key
//! store.delete(key).expect("failed to delete");
//! ```

mod data;
mod fio;
mod index;
mod json;
mod query;

pub mod db;
pub mod errors;
pub mod registry;
pub mod time;
pub mod uid;
pub mod util;

pub use db::Store;
pub use errors::{Errors, Result};
pub use registry::{close_all, close_global, open_all, open_global, remove};
pub use time::Timestamp;
pub use uid::Uid;
