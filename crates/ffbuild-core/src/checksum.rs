//! SHA-256 verification of downloaded source tarballs.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// A tarball whose digest does not match the pinned value.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("sha256 hash of {name} tarball do not match!\nExpected: {expected}\nGot: {actual}")]
    Mismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}

/// Hash `path` and compare against `expected`. Returns the computed digest on a match.
pub fn verify_sha256(name: &str, path: &Path, expected: &str) -> Result<String> {
    let actual = sha256_path(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        return Ok(actual);
    }
    Err(ChecksumError::Mismatch {
        name: name.to_string(),
        expected: expected.to_string(),
        actual,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_SHA256: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    #[test]
    fn sha256_path_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_path_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        assert_eq!(sha256_path(f.path()).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn verify_accepts_uppercase_expected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let got = verify_sha256("hello", f.path(), &HELLO_SHA256.to_uppercase()).unwrap();
        assert_eq!(got, HELLO_SHA256);
    }

    #[test]
    fn verify_mismatch_reports_both_digests() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"tampered\n").unwrap();
        f.flush().unwrap();
        let err = verify_sha256("opus", f.path(), HELLO_SHA256).unwrap_err();
        let mismatch = err.downcast_ref::<ChecksumError>().expect("checksum error");
        let ChecksumError::Mismatch {
            name,
            expected,
            actual,
        } = mismatch;
        assert_eq!(name, "opus");
        assert_eq!(expected, HELLO_SHA256);
        assert_ne!(actual, HELLO_SHA256);
        let msg = err.to_string();
        assert!(msg.starts_with("sha256 hash of opus tarball do not match!"));
        assert!(msg.contains("Expected: "));
        assert!(msg.contains("Got: "));
    }

    #[test]
    fn verify_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(verify_sha256("x", &dir.path().join("nope"), HELLO_SHA256).is_err());
    }
}
