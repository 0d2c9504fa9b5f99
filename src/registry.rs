//! Process-wide registry of open stores.
//!
//! The registry hands out shared handles keyed by canonical path, so
//! two callers opening the same file get the same `Store` and never
//! race two write cursors over one file. Stores deregister themselves
//! on [`Store::close`], and [`close_all`] drains whatever is left.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use log::debug;
use parking_lot::Mutex;

use crate::db::Store;
use crate::errors::{Errors, Result};

lazy_static! {
  static ref STORES: Mutex<HashMap<PathBuf, Arc<Store>>> = Mutex::new(HashMap::new());
}

/// Resolves the registry key for `path`: the canonicalised parent
/// directory joined with the file name. The parent is created first so
/// canonicalisation cannot fail on a store that does not exist yet.
fn canonical(path: &Path) -> Result<PathBuf> {
  let parent = match path.parent() {
    Some(dir) if !dir.as_os_str().is_empty() => dir,
    _ => Path::new("."),
  };
  if !parent.exists() {
    crate::db::create_dir_all(parent).map_err(|e| Errors::io("create store directory", e))?;
  }
  let parent = parent
    .canonicalize()
    .map_err(|e| Errors::io("canonicalize store path", e))?;
  match path.file_name() {
    Some(name) => Ok(parent.join(name)),
    None => Ok(parent),
  }
}

/// Returns the store backed by `path`, opening it on first use and
/// returning the cached handle afterwards.
pub fn open_global<P: AsRef<Path>>(path: P) -> Result<Arc<Store>> {
  let key = canonical(path.as_ref())?;
  let mut stores = STORES.lock();
  if let Some(store) = stores.get(&key) {
    return Ok(Arc::clone(store));
  }
  let store = Arc::new(Store::open(key.clone())?);
  debug!("registered {}", key.display());
  stores.insert(key, Arc::clone(&store));
  Ok(store)
}

/// Opens every path, stopping at the first failure.
pub fn open_all<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
  for path in paths {
    open_global(path)?;
  }
  Ok(())
}

/// Closes the store backed by `path`. Does nothing if it is not open.
pub fn close_global<P: AsRef<Path>>(path: P) -> Result<()> {
  let key = canonical(path.as_ref())?;
  let store = STORES.lock().remove(&key);
  match store {
    Some(store) => store.close(),
    None => Ok(()),
  }
}

/// Closes every open store, ignoring individual close failures.
pub fn close_all() {
  let drained: Vec<Arc<Store>> = STORES.lock().drain().map(|(_, store)| store).collect();
  for store in drained {
    let _ = store.close();
  }
}

/// Closes the store backed by `path` and unlinks its file.
pub fn remove<P: AsRef<Path>>(path: P) -> Result<()> {
  let key = canonical(path.as_ref())?;
  close_global(&key)?;
  match fs::remove_file(&key) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(Errors::io("remove store file", e)),
  }
}

/// Drops the registry entry without closing the store. Called by
/// [`Store::close`] so a handle closed directly does not linger here.
pub(crate) fn deregister(path: &Path) {
  STORES.lock().remove(path);
}

#[cfg(test)]
mod tests {
  use super::*;
  use bytes::Bytes;

  // The registry is process-global state, so the whole lifecycle runs
  // in one test to keep `close_all` from racing parallel test threads.
  #[test]
  fn test_global_registry_lifecycle() {
    let dir = tempfile::tempdir().unwrap();

    // Repeated opens share one handle.
    let path = dir.path().join("registry.db");
    let a = open_global(&path).unwrap();
    let b = open_global(&path).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    a.put(Bytes::from("k"), Bytes::from("v")).unwrap();
    assert_eq!(b.get(Bytes::from("k")).unwrap(), Bytes::from("v"));

    // Relative path segments resolve to the same store.
    let dotted = dir.path().join(".").join("registry.db");
    let c = open_global(&dotted).unwrap();
    assert!(Arc::ptr_eq(&a, &c));

    // close_global drops the entry and closes the handle everywhere.
    close_global(&path).unwrap();
    assert!(matches!(a.get(Bytes::from("k")), Err(Errors::Closed)));
    let fresh = open_global(&path).unwrap();
    assert!(!Arc::ptr_eq(&a, &fresh));
    assert_eq!(fresh.count(), 1);

    // Closing the store directly deregisters it as well.
    fresh.close().unwrap();
    let reopened = open_global(&path).unwrap();
    assert!(!Arc::ptr_eq(&fresh, &reopened));

    // open_all + close_all drain everything at once.
    let more = [dir.path().join("t1.db"), dir.path().join("t2.db")];
    open_all(&more).unwrap();
    close_all();
    assert!(matches!(reopened.get(Bytes::from("k")), Err(Errors::Closed)));

    // remove closes and unlinks; a missing file is not an error.
    let doomed = dir.path().join("remove-me.db");
    let store = open_global(&doomed).unwrap();
    store.put(Bytes::from("k"), Bytes::from("v")).unwrap();
    remove(&doomed).unwrap();
    assert!(!doomed.exists());
    remove(dir.path().join("never-opened.db")).unwrap();
  }
}
