//! Atomic local file writer used by downloads.
//!
//! ## `write_atomic` protocol
//!
//! 1. Create missing parent directories (idempotent).
//! 2. Stream the body into an anonymous temp file in the same directory.
//! 3. Persist it over the final path (atomic rename on POSIX).
//! 4. On any failure the temp file is dropped and deleted; the final path
//!    keeps its old content.
//!
//! The temp file gets a random name, so no user file name is reserved.

use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{io_err, ActionError};

/// Atomically replace `path` with everything `body` yields.
///
/// Returns the number of bytes written.
pub fn write_atomic(path: &Path, mut body: impl Read) -> Result<u64, ActionError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| io_err(parent, e))?;
    let written = copy_into(&mut tmp, &mut body).map_err(|e| io_err(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| io_err(path, e.error))?;

    tracing::debug!("wrote {written} byte(s) to {}", path.display());
    Ok(written)
}

fn copy_into(tmp: &mut NamedTempFile, body: &mut impl Read) -> io::Result<u64> {
    let mut out = BufWriter::new(tmp.as_file_mut());
    let n = io::copy(body, &mut out)?;
    out.flush()?;
    out.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Yields some bytes, then fails.
    struct Broken(usize);

    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0 == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"));
            }
            let n = self.0.min(buf.len());
            buf[..n].fill(b'z');
            self.0 -= n;
            Ok(n)
        }
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn writes_bytes_and_reports_length() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.json");
        let n = write_atomic(&path, &b"1"[..]).unwrap();
        assert_eq!(n, 1);
        assert_eq!(fs::read(&path).unwrap(), b"1");
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sub").join("deeper").join("y.json");
        write_atomic(&path, &b"2"[..]).unwrap();
        assert!(path.exists());

        // Parents already present is not an error.
        write_atomic(&path, &b"3"[..]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"3");
    }

    #[test]
    fn no_stray_files_after_write() {
        let tmp = TempDir::new().unwrap();
        write_atomic(&tmp.path().join("clean.bin"), &b"data"[..]).unwrap();
        assert_eq!(names(tmp.path()), vec!["clean.bin"]);
    }

    #[test]
    fn file_named_like_a_temp_file_is_written_normally() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.bucketsync.tmp");
        write_atomic(&path, &b"mine"[..]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"mine");
        assert_eq!(names(tmp.path()), vec!["notes.bucketsync.tmp"]);
    }

    #[test]
    fn failed_stream_keeps_original_and_cleans_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.json");
        fs::write(&path, "original").unwrap();

        let err = write_atomic(&path, Broken(5)).unwrap_err();
        assert!(matches!(err, ActionError::Io { .. }), "got: {err}");
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert_eq!(names(tmp.path()), vec!["a.json"]);
    }

    #[test]
    #[cfg(unix)]
    fn readonly_directory_leaves_original_untouched() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("file.md");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let result = write_atomic(&path, &b"new content"[..]);

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Root ignores directory permissions; the write then succeeds.
        if result.is_ok() {
            return;
        }
        assert!(matches!(result, Err(ActionError::Io { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert_eq!(names(&readonly_dir), vec!["file.md"]);
    }
}
