//! SHA-1 file fingerprints
//!
//! Digests are an integrity check between the original test data and what
//! comes back out of a decompressor, not a security boundary.

use crate::error::{CoreError, Result};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Chunk size for hashing and copying test data (1 MiB)
pub const BUF_SIZE: usize = 1024 * 1024;

/// Hex-encoded SHA-1 of the file at `path`, read in `BUF_SIZE` chunks
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| CoreError::io(path, e))?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(CoreError::io(path, e)),
        };
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc");
        std::fs::write(&path, b"abc").unwrap();

        assert_eq!(
            hash_file(&path).unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_digest_spans_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big");
        let data: Vec<u8> = (0..BUF_SIZE * 2 + 17).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let expected = hex::encode(Sha1::digest(&data));
        assert_eq!(hash_file(&path).unwrap(), expected);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_file(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
