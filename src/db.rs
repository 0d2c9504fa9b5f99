//! The store engine: one data file, one reader-writer lock, an
//! in-memory key index and a free-slot set rebuilt by scanning the file
//! at open time.
//!
//! Mutations never relocate records. A delete patches the tombstone
//! flag in place and hands the record's region to the free set; a put
//! first tombstones any previous record for the key, then writes the
//! new record either into the best-fitting free slot or at the end of
//! the file, as a single positional write of header + key + value.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::{debug, warn};
use parking_lot::RwLock;

use crate::data::record::{
  tombstone_patch, RecordHeader, RecordPos, RECORD_HEADER_SIZE,
};
use crate::errors::{Errors, Result};
use crate::fio::FileIo;
use crate::index::free::FreeSet;
use crate::index::KeyIndex;
use crate::query;
use crate::registry;
use crate::util::unix_timestamp;

/// First four bytes of every store file.
pub(crate) const MAGIC: u32 = 0xD3EF_AA03;

/// Magic plus the persisted sequence counter.
pub(crate) const FILE_HEADER_SIZE: u64 = 12;

/// The sequence counter sits right behind the magic.
const COUNTER_OFFSET: u64 = 4;

/// Scratch buffers kept for reuse by the write path.
const MAX_POOLED_BUFFERS: usize = 4;

/// A single-file key-value store.
///
/// All methods take `&self`; a per-store [`parking_lot::RwLock`] keeps
/// readers concurrent and writers exclusive, so a `Store` can be shared
/// across threads behind an `Arc`.
pub struct Store {
  path: PathBuf,
  inner: RwLock<StoreInner>,
}

struct StoreInner {
  file: Option<FileIo>,
  index: KeyIndex,
  free: FreeSet,
  counter: u64,
  sync: bool,
  buffers: Vec<Vec<u8>>,
}

impl StoreInner {
  fn file(&self) -> Result<&FileIo> {
    self.file.as_ref().ok_or(Errors::Closed)
  }

  fn take_buffer(&mut self) -> Vec<u8> {
    match self.buffers.pop() {
      Some(mut buf) => {
        buf.clear();
        buf
      }
      None => Vec::new(),
    }
  }

  fn return_buffer(&mut self, buf: Vec<u8>) {
    if self.buffers.len() < MAX_POOLED_BUFFERS {
      self.buffers.push(buf);
    }
  }
}

impl Store {
  /// Opens the store at `path`, creating the file (mode 0666) and its
  /// parent directory (mode 0777) if they do not exist, then rebuilds
  /// the key index and the free set by scanning every record.
  ///
  /// A freshly opened store syncs after every mutation; call
  /// [`Store::set_sync`] with `false` to leave durability to the OS.
  pub fn open<P: Into<PathBuf>>(path: P) -> Result<Store> {
    let path = path.into();
    if let Some(dir) = path.parent() {
      if !dir.as_os_str().is_empty() && !dir.exists() {
        create_dir_all(dir).map_err(|e| Errors::io("create store directory", e))?;
      }
    }
    let file = FileIo::open(&path).map_err(|e| Errors::io("open store file", e))?;

    let file_len = file.len().map_err(|e| Errors::io("stat store file", e))?;
    let counter = if file_len == 0 {
      let mut header = Vec::with_capacity(FILE_HEADER_SIZE as usize);
      header.extend_from_slice(&MAGIC.to_be_bytes());
      header.extend_from_slice(&0u64.to_be_bytes());
      file
        .write_all_at(&header, 0)
        .map_err(|e| Errors::io("write file header", e))?;
      0
    } else {
      let mut header = [0u8; FILE_HEADER_SIZE as usize];
      file
        .read_exact_at(&mut header, 0)
        .map_err(|e| Errors::io("read file header", e))?;
      let magic = u32::from_be_bytes(header[..4].try_into().unwrap());
      if magic != MAGIC {
        return Err(Errors::BadFormat { path });
      }
      u64::from_be_bytes(header[4..].try_into().unwrap())
    };

    let (index, free, end) = load_index(&file)?;
    if end < file_len {
      // A record torn by a crash mid-write is unreachable garbage with
      // no checksum to reject it later, so cut it off now. The next
      // append lands exactly where the torn record began.
      warn!(
        "{}: truncating torn tail ({} bytes past offset {end})",
        path.display(),
        file_len - end
      );
      file
        .set_len(end)
        .map_err(|e| Errors::io("truncate torn tail", e))?;
    }
    debug!(
      "opened {}: {} keys, {} free slots, counter {}",
      path.display(),
      index.len(),
      free.len(),
      counter
    );

    Ok(Store {
      path,
      inner: RwLock::new(StoreInner {
        file: Some(file),
        index,
        free,
        counter,
        sync: true,
        buffers: Vec::new(),
      }),
    })
  }

  /// Path of the backing file.
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Number of live keys.
  pub fn count(&self) -> u32 {
    self.inner.read().index.len() as u32
  }

  /// True when `key` is present.
  pub fn has(&self, key: Bytes) -> bool {
    self.inner.read().index.contains(&key)
  }

  /// Returns the value stored under `key`, or [`Errors::KeyNotFound`].
  /// An empty stored value comes back as an empty `Bytes`.
  pub fn get(&self, key: Bytes) -> Result<Bytes> {
    let inner = self.inner.read();
    get_locked(&inner, &key)
  }

  /// Looks up several keys under one lock acquisition. Missing keys
  /// yield `None`; any other failure aborts the whole call.
  pub fn gets(&self, keys: &[Bytes]) -> Result<Vec<Option<Bytes>>> {
    let inner = self.inner.read();
    let mut result = Vec::with_capacity(keys.len());
    for key in keys {
      match get_locked(&inner, key) {
        Ok(value) => result.push(Some(value)),
        Err(Errors::KeyNotFound) => result.push(None),
        Err(e) => return Err(e),
      }
    }
    Ok(result)
  }

  /// Stores `value` under `key`, overwriting any previous value.
  pub fn put(&self, key: Bytes, value: Bytes) -> Result<()> {
    let mut inner = self.inner.write();
    put_locked(&mut inner, &key, &value)?;
    sync_if_enabled(&inner)
  }

  /// Stores every pair under one lock acquisition. The first failure
  /// aborts; pairs already written stay written.
  pub fn puts(&self, values: HashMap<Bytes, Bytes>) -> Result<()> {
    let mut inner = self.inner.write();
    for (key, value) in &values {
      put_locked(&mut inner, key, value)?;
    }
    sync_if_enabled(&inner)
  }

  /// Removes `key`, or fails with [`Errors::KeyNotFound`].
  pub fn delete(&self, key: Bytes) -> Result<()> {
    let mut inner = self.inner.write();
    delete_locked(&mut inner, &key)?;
    sync_if_enabled(&inner)
  }

  /// Removes every key under one lock acquisition; keys that are not
  /// present are skipped silently.
  pub fn deletes(&self, keys: &[Bytes]) -> Result<()> {
    let mut inner = self.inner.write();
    for key in keys {
      match delete_locked(&mut inner, key) {
        Ok(()) | Err(Errors::KeyNotFound) => {}
        Err(e) => return Err(e),
      }
    }
    sync_if_enabled(&inner)
  }

  /// Keys matching `prefix`, ordered by length first and then
  /// lexicographically (both reversed when `asc` is false), starting
  /// after the cursor `last`, skipping `offset` keys and capped at
  /// `limit`. Zero `offset`/`limit` mean no skip / no cap.
  pub fn keys(&self, prefix: &[u8], last: &[u8], offset: u32, limit: u32, asc: bool) -> Vec<Bytes> {
    let snapshot = self.inner.read().index.keys_snapshot();
    query::select(snapshot, prefix, last, offset, limit, asc)
  }

  /// Increments the persisted 64-bit counter and returns the new
  /// value. The counter survives close and reopen.
  pub fn next_sequence(&self) -> Result<u64> {
    let mut inner = self.inner.write();
    let next = inner.counter + 1;
    inner
      .file()?
      .write_all_at(&next.to_be_bytes(), COUNTER_OFFSET)
      .map_err(|e| Errors::io("write sequence counter", e))?;
    inner.counter = next;
    sync_if_enabled(&inner)?;
    Ok(next)
  }

  /// Turns per-mutation fsync on or off. On by default.
  pub fn set_sync(&self, sync: bool) {
    self.inner.write().sync = sync;
  }

  /// Flushes OS caches for the backing file.
  pub fn sync(&self) -> Result<()> {
    self
      .inner
      .read()
      .file()?
      .sync()
      .map_err(|e| Errors::io("fsync", e))
  }

  /// Syncs (when sync-mode is on) and closes the backing file, and
  /// drops this store from the process-wide registry. Repeated calls
  /// are no-ops.
  pub fn close(&self) -> Result<()> {
    registry::deregister(&self.path);
    let mut inner = self.inner.write();
    if inner.file.is_none() {
      return Ok(());
    }
    // The handle is dropped even when the final sync fails; the error
    // is still reported.
    let synced = if inner.sync {
      inner.file()?.sync().map_err(|e| Errors::io("fsync on close", e))
    } else {
      Ok(())
    };
    inner.file = None;
    debug!("closed {}", self.path.display());
    synced
  }
}

fn sync_if_enabled(inner: &StoreInner) -> Result<()> {
  if inner.sync {
    inner.file()?.sync().map_err(|e| Errors::io("fsync", e))?;
  }
  Ok(())
}

fn get_locked(inner: &StoreInner, key: &[u8]) -> Result<Bytes> {
  let pos = inner.index.get(key).ok_or(Errors::KeyNotFound)?;
  let mut data = vec![0u8; pos.data_size as usize];
  inner
    .file()?
    .read_exact_at(&mut data, pos.data_offset())
    .map_err(|e| Errors::io("read value", e))?;
  Ok(Bytes::from(data))
}

fn delete_locked(inner: &mut StoreInner, key: &[u8]) -> Result<()> {
  let pos = inner.index.get(key).ok_or(Errors::KeyNotFound)?;
  let patch = tombstone_patch(unix_timestamp());
  inner
    .file()?
    .write_all_at(&patch, pos.offset)
    .map_err(|e| Errors::io("write tombstone", e))?;
  inner.index.remove(key);
  inner.free.insert(pos);
  Ok(())
}

fn put_locked(inner: &mut StoreInner, key: &[u8], value: &[u8]) -> Result<()> {
  if key.len() > u8::MAX as usize {
    return Err(Errors::KeyTooLong { len: key.len() });
  }
  // Tombstone the previous record first; its region joins the free set
  // and may be picked right back up below.
  match delete_locked(inner, key) {
    Ok(()) | Err(Errors::KeyNotFound) => {}
    Err(e) => return Err(e),
  }

  let need = (key.len() + value.len()) as u32;
  let (offset, empty_size) = match inner.free.take_best_fit(need) {
    Some(slot) => (slot.offset, slot.size() - need),
    None => {
      let end = inner
        .file()?
        .len()
        .map_err(|e| Errors::io("seek to end", e))?;
      (end, 0)
    }
  };

  let pos = RecordPos {
    offset,
    key_size: key.len() as u8,
    data_size: value.len() as u32,
    empty_size,
  };
  let header = RecordHeader {
    time: unix_timestamp(),
    deleted: false,
    key_size: pos.key_size,
    data_size: pos.data_size,
    empty_size: pos.empty_size,
  };

  let mut buf = inner.take_buffer();
  header.encode_into(&mut buf);
  buf.extend_from_slice(key);
  buf.extend_from_slice(value);
  let written = inner.file()?.write_all_at(&buf, offset);
  inner.return_buffer(buf);
  written.map_err(|e| Errors::io("write record", e))?;

  inner.index.insert(key.to_vec(), pos);
  Ok(())
}

/// Scans every record from the end of the file header to end-of-file
/// and rebuilds the key index and the free set. Returns the offset
/// just past the last whole record.
///
/// A header or key cut short by end-of-file ends the scan cleanly: the
/// torn tail is treated as empty space past the last whole record, and
/// the caller truncates it away. Any other read error aborts the open.
fn load_index(file: &FileIo) -> Result<(KeyIndex, FreeSet, u64)> {
  let mut index = KeyIndex::new();
  let mut free = Vec::new();
  // Write timestamps of the records currently in the index, for
  // resolving duplicate live keys left behind by a torn overwrite.
  let mut times: HashMap<Vec<u8>, u32> = HashMap::new();

  let mut offset = FILE_HEADER_SIZE;
  loop {
    let mut raw = [0u8; RECORD_HEADER_SIZE];
    match file.read_exact_at(&mut raw, offset) {
      Ok(()) => {}
      Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
      Err(e) => return Err(Errors::io("read record header", e)),
    }
    let header = RecordHeader::decode(&raw);

    let mut key = vec![0u8; header.key_size as usize];
    match file.read_exact_at(&mut key, offset + RECORD_HEADER_SIZE as u64) {
      Ok(()) => {}
      Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
        warn!("torn record at offset {offset}, truncating scan");
        break;
      }
      Err(e) => return Err(Errors::io("read record key", e)),
    }

    let pos = RecordPos {
      offset,
      key_size: header.key_size,
      data_size: header.data_size,
      empty_size: header.empty_size,
    };

    if header.deleted {
      free.push(pos);
    } else if let Some(current) = index.get(&key) {
      // Two live records for one key can only come from a write torn
      // between the tombstone patch and the new record. The newer
      // timestamp wins; a tie keeps the record seen first.
      warn!("duplicate live key at offsets {} and {}", current.offset, offset);
      if times.get(&key).copied().unwrap_or(0) < header.time {
        free.push(current);
        times.insert(key.clone(), header.time);
        index.insert(key, pos);
      } else {
        free.push(pos);
      }
    } else {
      times.insert(key.clone(), header.time);
      index.insert(key, pos);
    }

    offset += pos.footprint();
  }

  Ok((index, FreeSet::from_unsorted(free), offset))
}

/// Creates `dir` and its missing parents. Mode 0777 (before umask),
/// matching the permissive default the store file itself uses.
pub(crate) fn create_dir_all(dir: &Path) -> std::io::Result<()> {
  let mut builder = fs::DirBuilder::new();
  builder.recursive(true);
  #[cfg(unix)]
  {
    use std::os::unix::fs::DirBuilderExt;
    builder.mode(0o777);
  }
  builder.create(dir)
}
