//! Content fingerprints.
//!
//! The digest is MD5, hex-encoded in lowercase, because S3-compatible stores
//! report exactly that as the ETag of a single-part upload. Local fingerprints
//! and remote content tags are therefore directly comparable.
//!
//! Multi-part uploads get ETags of the form `<md5-of-part-md5s>-<parts>`, which
//! never equal a local fingerprint. Such objects are always classified as
//! needing transfer; that false positive is accepted rather than special-cased.

use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

use crate::types::Fingerprint;

const CHUNK: usize = 64 * 1024;

/// Fingerprint an in-memory buffer.
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    let mut h = Md5::new();
    h.update(bytes);
    Fingerprint(hex::encode(h.finalize()))
}

/// Fingerprint a byte stream, consuming it to the end.
pub fn fingerprint_reader(mut reader: impl Read) -> io::Result<Fingerprint> {
    let mut h = Md5::new();
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        h.update(&buf[..n]);
    }
    Ok(Fingerprint(hex::encode(h.finalize())))
}

/// Fingerprint the full contents of the file at `path`.
pub fn fingerprint_file(path: &Path) -> io::Result<Fingerprint> {
    let file = std::fs::File::open(path)?;
    fingerprint_reader(io::BufReader::new(file))
}
