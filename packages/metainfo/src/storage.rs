//! Partial-file byte storage, the surface consumed by download clients.
//!
//! While a torrent is being downloaded its data lives next to the target
//! path with a `.!pc` suffix. Once the download completes, [`finish`]
//! promotes the partial file to the target path.
//!
//! [`finish`]: ByteStorage::finish
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Suffix appended to the target path while the data is incomplete.
pub const PARTIAL_FILE_SUFFIX: &str = ".!pc";

/// Errors raised by the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage i/o error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A read or write did not fit inside the declared size.
    #[error("storage underrun: offset {offset} + length {len} exceeds size {size}")]
    Underrun { offset: u64, len: u64, size: u64 },
}

/// Byte-level storage for one torrent's data.
pub trait ByteStorage {
    /// Reads `buf.len()` bytes at `offset`, returning the number of bytes
    /// actually read.
    ///
    /// # Errors
    ///
    /// [`StorageError::Underrun`] when `offset + buf.len()` exceeds
    /// [`size`](ByteStorage::size), [`StorageError::Io`] on OS failures.
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, StorageError>;

    /// Writes the whole of `buf` at `offset`.
    ///
    /// # Errors
    ///
    /// [`StorageError::Underrun`] when `offset + buf.len()` exceeds
    /// [`size`](ByteStorage::size), [`StorageError::Io`] on OS failures.
    fn write(&mut self, buf: &[u8], offset: u64) -> Result<(), StorageError>;

    /// Total declared size in bytes.
    fn size(&self) -> u64;

    /// Flushes and releases the underlying file.
    ///
    /// # Errors
    ///
    /// [`StorageError::Io`] on OS failures.
    fn close(&mut self) -> Result<(), StorageError>;

    /// Marks the download complete, atomically replacing the target with
    /// the partial file.
    ///
    /// # Errors
    ///
    /// [`StorageError::Io`] on OS failures.
    fn finish(&mut self) -> Result<(), StorageError>;

    /// Whether [`finish`](ByteStorage::finish) has completed for this
    /// storage.
    fn is_finished(&self) -> bool;
}

/// File-backed [`ByteStorage`] writing to `<target>.!pc` until finished.
pub struct PartialFileStorage {
    target: PathBuf,
    partial: PathBuf,
    file: Option<File>,
    size: u64,
    finished: bool,
}

impl PartialFileStorage {
    /// Opens storage for `target` with the given declared size.
    ///
    /// A pre-existing target with no partial file alongside is treated as a
    /// finished download; otherwise the partial file is created (or resumed)
    /// and writes go there until [`finish`](ByteStorage::finish).
    ///
    /// # Errors
    ///
    /// [`StorageError::Io`] when neither file can be opened.
    pub fn open<P: AsRef<Path>>(target: P, size: u64) -> Result<PartialFileStorage, StorageError> {
        let target = target.as_ref().to_path_buf();
        let partial = partial_path(&target);

        let finished = target.exists() && !partial.exists();
        let backing = if finished { &target } else { &partial };

        let file = OpenOptions::new().read(true).write(true).create(true).open(backing)?;
        file.set_len(size)?;

        debug!(target = %target.display(), finished, "opened storage");

        Ok(PartialFileStorage {
            target,
            partial,
            file: Some(file),
            size,
            finished,
        })
    }

    /// The path downloads are promoted to on finish.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    fn backing_file(&mut self) -> Result<&mut File, StorageError> {
        self.file.as_mut().ok_or_else(|| StorageError::Io {
            source: std::io::Error::new(std::io::ErrorKind::NotConnected, "storage is closed"),
        })
    }

    fn validate_range(&self, offset: u64, len: usize) -> Result<(), StorageError> {
        let len = len as u64;
        if offset.checked_add(len).map_or(true, |end| end > self.size) {
            return Err(StorageError::Underrun {
                offset,
                len,
                size: self.size,
            });
        }
        Ok(())
    }
}

impl ByteStorage for PartialFileStorage {
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, StorageError> {
        self.validate_range(offset, buf.len())?;

        let file = self.backing_file()?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(file.read(buf)?)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<(), StorageError> {
        self.validate_range(offset, buf.len())?;

        let file = self.backing_file()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn close(&mut self) -> Result<(), StorageError> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StorageError> {
        if self.finished {
            return Ok(());
        }

        if let Some(file) = &self.file {
            file.sync_all()?;
        }
        self.file = None;

        // Delete-then-rename promotion of the partial file.
        if self.target.exists() {
            std::fs::remove_file(&self.target)?;
        }
        std::fs::rename(&self.partial, &self.target)?;

        self.file = Some(OpenOptions::new().read(true).write(true).open(&self.target)?);
        self.finished = true;

        debug!(target = %self.target.display(), "finished storage");

        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut file_name = target.file_name().unwrap_or_default().to_os_string();
    file_name.push(PARTIAL_FILE_SUFFIX);
    target.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::{ByteStorage, PartialFileStorage, StorageError, PARTIAL_FILE_SUFFIX};

    #[test]
    fn it_should_write_to_the_partial_file_until_finished() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("artifact.bin");

        let mut storage = PartialFileStorage::open(&target, 16).unwrap();
        storage.write(b"0123456789abcdef", 0).unwrap();

        assert!(!storage.is_finished());
        assert!(target.with_file_name(format!("artifact.bin{PARTIAL_FILE_SUFFIX}")).exists());
        assert!(!target.exists());
    }

    #[test]
    fn it_should_promote_the_partial_file_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("artifact.bin");

        let mut storage = PartialFileStorage::open(&target, 4).unwrap();
        storage.write(b"data", 0).unwrap();
        storage.finish().unwrap();

        assert!(storage.is_finished());
        assert!(target.exists());
        assert!(!target.with_file_name(format!("artifact.bin{PARTIAL_FILE_SUFFIX}")).exists());
        assert_eq!(std::fs::read(&target).unwrap(), b"data");
    }

    #[test]
    fn it_should_read_back_what_was_written() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("artifact.bin");

        let mut storage = PartialFileStorage::open(&target, 10).unwrap();
        storage.write(b"hello", 2).unwrap();

        let mut buf = [0u8; 5];
        let read = storage.read(&mut buf, 2).unwrap();

        assert_eq!(read, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn it_should_reject_out_of_bounds_access() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("artifact.bin");

        let mut storage = PartialFileStorage::open(&target, 8).unwrap();

        let write = storage.write(b"toolongvalue", 0);
        assert!(matches!(write.unwrap_err(), StorageError::Underrun { .. }));

        let mut buf = [0u8; 4];
        let read = storage.read(&mut buf, 6);
        assert!(matches!(read.unwrap_err(), StorageError::Underrun { .. }));
    }

    #[test]
    fn it_should_treat_an_existing_target_without_partial_as_finished() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("artifact.bin");
        std::fs::write(&target, b"done").unwrap();

        let storage = PartialFileStorage::open(&target, 4).unwrap();

        assert!(storage.is_finished());
    }

    #[test]
    fn it_should_reject_access_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("artifact.bin");

        let mut storage = PartialFileStorage::open(&target, 8).unwrap();
        storage.close().unwrap();

        assert!(storage.write(b"data", 0).is_err());
    }
}
