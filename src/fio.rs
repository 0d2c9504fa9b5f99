//! Positional file I/O.
//!
//! The store never moves a shared cursor: every read and write names
//! its offset, so readers can run concurrently under the store's read
//! lock while the writer composes records elsewhere in the file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

pub struct FileIo {
  file: File,
}

impl FileIo {
  /// Opens `path` read+write, creating it with mode 0666 if missing.
  pub fn open(path: &Path) -> io::Result<FileIo> {
    let mut options = OpenOptions::new();
    options.create(true).read(true).write(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::OpenOptionsExt;
      options.mode(0o666);
    }
    let file = options.open(path)?;
    Ok(FileIo { file })
  }

  pub fn len(&self) -> io::Result<u64> {
    Ok(self.file.metadata()?.len())
  }

  pub fn sync(&self) -> io::Result<()> {
    self.file.sync_all()
  }

  pub fn set_len(&self, len: u64) -> io::Result<()> {
    self.file.set_len(len)
  }

  #[cfg(unix)]
  pub fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    self.file.read_exact_at(buf, offset)
  }

  #[cfg(unix)]
  pub fn write_all_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    self.file.write_all_at(buf, offset)
  }

  #[cfg(windows)]
  pub fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
      match self.file.seek_read(buf, offset) {
        Ok(0) => {
          return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "failed to fill whole buffer",
          ));
        }
        Ok(n) => {
          buf = &mut buf[n..];
          offset += n as u64;
        }
        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
        Err(e) => return Err(e),
      }
    }
    Ok(())
  }

  #[cfg(windows)]
  pub fn write_all_at(&self, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
      match self.file.seek_write(buf, offset) {
        Ok(0) => {
          return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "failed to write whole buffer",
          ));
        }
        Ok(n) => {
          buf = &buf[n..];
          offset += n as u64;
        }
        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
        Err(e) => return Err(e),
      }
    }
    Ok(())
  }
}
