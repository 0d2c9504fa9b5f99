//! On-disk record layout.
//!
//! Every record is a fixed 14-byte header followed by the key bytes,
//! the value bytes and optional trailing padding:
//!
//! `time(4) | deleted(1) | key_size(1) | data_size(4) | empty_size(4) | key | value | padding`
//!
//! All integers are big-endian. The padding (`empty_size` bytes) is the
//! unused tail of a reused free slot; it stays inside the record so the
//! slot keeps its full size when the record is tombstoned again.

use bytes::{Buf, BufMut};

/// Size of the fixed record header in bytes.
pub const RECORD_HEADER_SIZE: usize = 14;

/// A tombstone patch rewrites only the first bytes of the header:
/// the timestamp and the deleted flag.
pub const TOMBSTONE_PATCH_SIZE: usize = 5;

/// Decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
  /// Unix seconds at last write or tombstone.
  pub time: u32,
  pub deleted: bool,
  pub key_size: u8,
  pub data_size: u32,
  /// Trailing free bytes kept inside this record.
  pub empty_size: u32,
}

impl RecordHeader {
  /// Appends the 14 header bytes to `buf` in the exact on-disk layout.
  pub fn encode_into(&self, buf: &mut Vec<u8>) {
    buf.put_u32(self.time);
    buf.put_u8(self.deleted as u8);
    buf.put_u8(self.key_size);
    buf.put_u32(self.data_size);
    buf.put_u32(self.empty_size);
  }

  /// Decodes a header from the 14 bytes at the start of `raw`.
  pub fn decode(raw: &[u8; RECORD_HEADER_SIZE]) -> RecordHeader {
    let mut buf = &raw[..];
    RecordHeader {
      time: buf.get_u32(),
      deleted: buf.get_u8() != 0,
      key_size: buf.get_u8(),
      data_size: buf.get_u32(),
      empty_size: buf.get_u32(),
    }
  }
}

/// Encodes the 5-byte patch that turns a live record into a tombstone
/// in place: new timestamp plus the deleted flag. The size fields that
/// follow are left untouched on disk; recovery depends on them.
pub fn tombstone_patch(time: u32) -> [u8; TOMBSTONE_PATCH_SIZE] {
  let mut patch = [0u8; TOMBSTONE_PATCH_SIZE];
  patch[..4].copy_from_slice(&time.to_be_bytes());
  patch[4] = 1;
  patch
}

/// In-memory location of a record. Shared by the key index (live
/// records) and the free set (tombstoned regions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPos {
  /// Offset of the record header from the start of the file.
  pub offset: u64,
  pub key_size: u8,
  pub data_size: u32,
  pub empty_size: u32,
}

impl RecordPos {
  /// Payload size: key plus value plus padding, header excluded. This
  /// is the quantity the free set orders by and best-fit compares
  /// against.
  pub fn size(&self) -> u32 {
    self.key_size as u32 + self.data_size + self.empty_size
  }

  /// Bytes the record occupies on disk, header included.
  pub fn footprint(&self) -> u64 {
    RECORD_HEADER_SIZE as u64 + self.size() as u64
  }

  /// File offset of the value bytes.
  pub fn data_offset(&self) -> u64 {
    self.offset + RECORD_HEADER_SIZE as u64 + self.key_size as u64
  }
}
