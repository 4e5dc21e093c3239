//! # Extension Helpers
//!
//! [`VfsExt`] layers the everyday conveniences over the protocol traits:
//! whole-file reads and writes, text helpers, and cross-backend copying.
//! Everything here is trivial glue over [`FsRead`]/[`FsWrite`]; backends
//! get it all through the blanket implementation.

use std::io::{self, Read, Write};

use crate::error::VfsError;
use crate::path::UPath;
use crate::traits::{FileStream, FsRead, FsWrite};
use crate::types::{FileAccess, FileShare, OpenMode};

/// Convenience methods available on every backend.
///
/// Write-side helpers are constrained to backends that implement
/// [`FsWrite`]; on a read-only backend they simply do not exist.
///
/// ```rust
/// use unifs::{MemoryFileSystem, UPath, VfsExt};
///
/// let fs = MemoryFileSystem::new();
/// fs.write_all_text(&UPath::new("/greeting"), "hello")?;
/// assert_eq!(fs.read_all_text(&UPath::new("/greeting"))?, "hello");
/// # Ok::<(), unifs::VfsError>(())
/// ```
pub trait VfsExt: FsRead {
    /// Whether anything (file or directory) exists at `path`.
    fn exists(&self, path: &UPath) -> Result<bool, VfsError> {
        Ok(self.file_exists(path)? || self.directory_exists(path)?)
    }

    /// Read the entire file at `path`.
    fn read_all_bytes(&self, path: &UPath) -> Result<Vec<u8>, VfsError> {
        let mut stream = self.open_read(path)?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).map_err(VfsError::Io)?;
        Ok(bytes)
    }

    /// Read the entire file at `path` as UTF-8 text.
    fn read_all_text(&self, path: &UPath) -> Result<String, VfsError> {
        let bytes = self.read_all_bytes(path)?;
        String::from_utf8(bytes).map_err(|_| {
            VfsError::Io(io::Error::new(io::ErrorKind::InvalidData, "file is not valid UTF-8"))
        })
    }

    /// Create or truncate the file at `path` and write `bytes` to it.
    fn write_all_bytes(&self, path: &UPath, bytes: &[u8]) -> Result<(), VfsError>
    where
        Self: FsWrite,
    {
        let mut stream =
            self.open_file(path, OpenMode::Create, FileAccess::Write, FileShare::NONE)?;
        stream.write_all(bytes).map_err(VfsError::Io)?;
        Ok(())
    }

    /// Create or truncate the file at `path` and write `text` to it.
    fn write_all_text(&self, path: &UPath, text: &str) -> Result<(), VfsError>
    where
        Self: FsWrite,
    {
        self.write_all_bytes(path, text.as_bytes())
    }

    /// Append `text` to the file at `path`, creating it if missing.
    fn append_all_text(&self, path: &UPath, text: &str) -> Result<(), VfsError>
    where
        Self: FsWrite,
    {
        let mut stream =
            self.open_file(path, OpenMode::Append, FileAccess::Write, FileShare::NONE)?;
        stream.write_all(text.as_bytes()).map_err(VfsError::Io)?;
        Ok(())
    }

    /// Create (or truncate) the file at `path` and return its handle.
    fn create_file(&self, path: &UPath) -> Result<Box<dyn FileStream>, VfsError>
    where
        Self: FsWrite,
    {
        self.open_file(path, OpenMode::Create, FileAccess::ReadWrite, FileShare::NONE)
    }

    /// Copy the file at `src` to `dest` on another backend.
    ///
    /// Contents are streamed; the last-write time is carried over on a
    /// best-effort basis.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if `src` does not exist
    /// - [`VfsError::DestinationExists`] if `dest` exists on `dest_fs` and
    ///   `overwrite` is `false`
    fn copy_file_to(
        &self,
        src: &UPath,
        dest_fs: &dyn FsWrite,
        dest: &UPath,
        overwrite: bool,
    ) -> Result<(), VfsError> {
        if !overwrite && dest_fs.file_exists(dest)? {
            return Err(VfsError::DestinationExists { path: dest.clone(), operation: "copy_file_to" });
        }
        let mut reader = self.open_read(src)?;
        let mode = if overwrite { OpenMode::Create } else { OpenMode::CreateNew };
        {
            let mut writer = dest_fs.open_file(dest, mode, FileAccess::Write, FileShare::NONE)?;
            io::copy(&mut reader, &mut writer).map_err(VfsError::Io)?;
        }
        if let Ok(time) = self.last_write_time(src) {
            if let Err(err) = dest_fs.set_last_write_time(dest, time) {
                tracing::debug!(%dest, %err, "copy_file_to could not carry the write time");
            }
        }
        Ok(())
    }
}

impl<T: FsRead + ?Sized> VfsExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFileSystem;

    fn p(path: &str) -> UPath {
        UPath::new(path)
    }

    #[test]
    fn text_round_trip() {
        let fs = MemoryFileSystem::new();
        fs.write_all_text(&p("/t.txt"), "héllo").unwrap();
        assert_eq!(fs.read_all_text(&p("/t.txt")).unwrap(), "héllo");
    }

    #[test]
    fn read_all_text_rejects_invalid_utf8() {
        let fs = MemoryFileSystem::new();
        fs.write_all_bytes(&p("/bin"), &[0xff, 0xfe]).unwrap();
        assert!(matches!(fs.read_all_text(&p("/bin")), Err(VfsError::Io(_))));
    }

    #[test]
    fn append_creates_then_extends() {
        let fs = MemoryFileSystem::new();
        fs.append_all_text(&p("/log"), "a").unwrap();
        fs.append_all_text(&p("/log"), "b").unwrap();
        assert_eq!(fs.read_all_text(&p("/log")).unwrap(), "ab");
    }

    #[test]
    fn exists_covers_files_and_directories() {
        let fs = MemoryFileSystem::new();
        fs.create_directory(&p("/d")).unwrap();
        fs.write_all_bytes(&p("/f"), b"x").unwrap();
        assert!(fs.exists(&p("/d")).unwrap());
        assert!(fs.exists(&p("/f")).unwrap());
        assert!(!fs.exists(&p("/missing")).unwrap());
    }

    #[test]
    fn copy_between_backends() {
        let a = MemoryFileSystem::new();
        let b = MemoryFileSystem::new();
        a.write_all_bytes(&p("/src.bin"), &[9, 8, 7]).unwrap();

        a.copy_file_to(&p("/src.bin"), &b, &p("/dst.bin"), false).unwrap();
        assert_eq!(b.read_all_bytes(&p("/dst.bin")).unwrap(), vec![9, 8, 7]);

        // Second copy without overwrite hits the guard.
        assert!(matches!(
            a.copy_file_to(&p("/src.bin"), &b, &p("/dst.bin"), false),
            Err(VfsError::DestinationExists { .. })
        ));
        a.copy_file_to(&p("/src.bin"), &b, &p("/dst.bin"), true).unwrap();
    }

    #[test]
    fn create_file_returns_a_readwrite_handle() {
        let fs = MemoryFileSystem::new();
        let mut handle = fs.create_file(&p("/f")).unwrap();
        handle.write_all(b"data").unwrap();
        drop(handle);
        assert_eq!(fs.read_all_bytes(&p("/f")).unwrap(), b"data");
    }
}
