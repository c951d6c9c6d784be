//! Output Verification
//!
//! Two independent checks compare decompressed data against the reference
//! digest captured when the test file was provisioned:
//!
//! 1. the tool under test's own decompressed output is hashed;
//! 2. the compressed artifact is decompressed again by a trusted reference
//!    decompressor (`gunzip` by default) and that output is hashed.
//!
//! A mismatch is data, not an error: it is returned to the caller, which
//! records it and keeps benchmarking.

use crate::command::{CommandLine, Redirect, remove_if_exists};
use crate::error::Result;
use crate::hash::hash_file;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Which of the two checks produced a digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Tool-under-test round trip
    RoundTrip,
    /// Trusted reference decompressor
    Reference,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::RoundTrip => f.write_str("round-trip"),
            CheckKind::Reference => f.write_str("reference"),
        }
    }
}

/// Result of comparing one file against a reference digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Whether the digests matched
    pub ok: bool,
    /// Digest of the file that was checked
    pub computed: String,
}

/// A failed check, with both digests for the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMismatch {
    /// Check that failed
    pub check: CheckKind,
    /// Reference digest
    pub expected: String,
    /// Digest actually computed
    pub actual: String,
}

impl fmt::Display for DigestMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} != {}", self.check, self.expected, self.actual)
    }
}

/// Hash `decompressed` and compare against `reference_digest`
pub fn verify(decompressed: &Path, reference_digest: &str) -> Result<Verification> {
    let computed = hash_file(decompressed)?;
    Ok(Verification {
        ok: computed == reference_digest,
        computed,
    })
}

/// Runs both verification checks
#[derive(Debug, Clone)]
pub struct Verifier {
    reference_tool: PathBuf,
}

impl Verifier {
    /// Use `reference_tool` (invoked as `<tool> -c <file>`) for check 2
    pub fn new(reference_tool: impl Into<PathBuf>) -> Self {
        Self {
            reference_tool: reference_tool.into(),
        }
    }

    /// Check 1: hash the tool under test's decompressed output
    pub fn check_output(
        &self,
        decompressed: &Path,
        expected: &str,
    ) -> Result<Option<DigestMismatch>> {
        let verification = verify(decompressed, expected)?;
        Ok(mismatch(CheckKind::RoundTrip, expected, verification))
    }

    /// Check 2: decompress `compressed` into `scratch` with the reference
    /// tool and hash it. `scratch` is removed afterwards.
    pub fn check_reference(
        &self,
        compressed: &Path,
        scratch: &Path,
        expected: &str,
    ) -> Result<Option<DigestMismatch>> {
        CommandLine::new(self.reference_tool.as_os_str())
            .arg("-c")
            .arg(compressed)
            .run(Redirect::File(scratch))?;
        let verification = verify(scratch, expected);
        remove_if_exists(scratch)?;
        Ok(mismatch(CheckKind::Reference, expected, verification?))
    }
}

fn mismatch(
    check: CheckKind,
    expected: &str,
    verification: Verification,
) -> Option<DigestMismatch> {
    if verification.ok {
        return None;
    }
    warn!(%check, expected, actual = %verification.computed, "digest mismatch");
    Some(DigestMismatch {
        check,
        expected: expected.to_string(),
        actual: verification.computed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    #[test]
    fn test_verify_match_and_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw");
        std::fs::write(&path, b"abc").unwrap();

        let ok = verify(&path, ABC_SHA1).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.computed, ABC_SHA1);

        let bad = verify(&path, "0000").unwrap();
        assert!(!bad.ok);
        assert_eq!(bad.computed, ABC_SHA1);
    }

    #[test]
    fn test_check_output_reports_both_digests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw");
        std::fs::write(&path, b"abd").unwrap();

        let verifier = Verifier::new("gunzip");
        let failure = verifier.check_output(&path, ABC_SHA1).unwrap().unwrap();
        assert_eq!(failure.check, CheckKind::RoundTrip);
        assert_eq!(failure.expected, ABC_SHA1);
        assert_ne!(failure.actual, ABC_SHA1);
    }

    #[test]
    fn test_check_reference_missing_tool_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let compressed = dir.path().join("comp");
        std::fs::write(&compressed, b"abc").unwrap();

        let verifier = Verifier::new(dir.path().join("no-such-gunzip"));
        let err = verifier
            .check_reference(&compressed, &dir.path().join("scratch"), ABC_SHA1)
            .unwrap_err();
        assert!(matches!(err, crate::CoreError::Spawn { .. }));
    }
}
