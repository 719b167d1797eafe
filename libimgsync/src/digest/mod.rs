//! OCI Content Digest validation and computation.
//!
//! This module wraps `oci_spec::image::Digest` so digests returned by the
//! registry are validated before they land in a report, and computes sha256
//! digests for manifest and blob bodies.

use crate::error::{Result, SyncError};
use oci_spec::image::Digest as OciDigest;
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::str::FromStr;


/// Represents a content digest, wrapping the `oci_spec::image::Digest` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(OciDigest);

impl FromStr for Digest {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let oci_digest = OciDigest::from_str(s.trim()).map_err(|e| SyncError::Validation {
            message: format!("Invalid digest format: {}", e),
            source: Some(Box::new(e)),
        })?;
        Ok(Digest(oci_digest))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Digest {
    /// Computes the sha256 digest of `bytes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::Digest;
    ///
    /// let digest = Digest::sha256(b"").unwrap();
    /// assert_eq!(
    ///     digest.to_string(),
    ///     "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    /// );
    /// ```
    pub fn sha256(bytes: &[u8]) -> Result<Self> {
        let hex = format!("{:x}", Sha256::digest(bytes));
        Self::from_str(&format!("sha256:{}", hex))
    }

    /// Returns the algorithm name (e.g., "sha256").
    pub fn algorithm(&self) -> String {
        self.0.algorithm().to_string()
    }

    /// Returns the encoded hash portion of the digest.
    pub fn encoded(&self) -> &str {
        self.0.digest()
    }

    /// Checks that `bytes` hash to this digest.
    ///
    /// Only sha256 digests can be verified.
    pub fn verify(&self, bytes: &[u8]) -> Result<()> {
        if self.algorithm() != "sha256" {
            return Err(SyncError::validation(format!(
                "Unsupported digest algorithm: {}. Only sha256 is currently supported",
                self.algorithm()
            )));
        }

        let computed = Self::sha256(bytes)?;
        if computed != *self {
            return Err(SyncError::validation(format!(
                "Digest mismatch: expected {}, computed {}",
                self, computed
            )));
        }
        Ok(())
    }
}
