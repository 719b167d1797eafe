//! Repository name parsing.
//!
//! Tag listing is only meaningful for a bare repository, so this module wraps
//! `oci_spec::distribution::Reference` and rejects any input that carries a
//! tag or digest before a request is ever built.

use crate::error::{Result, SyncError};
use oci_spec::distribution::Reference as OciReference;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// A validated, bare repository name such as `registry.example.com/team/app`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName {
    raw: String,
    reference: OciReference,
}

impl FromStr for RepositoryName {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(SyncError::validation("Repository name cannot be empty"));
        }

        if has_tag_or_digest(raw) {
            return Err(SyncError::validation(format!(
                "No tag or digest allowed in repository reference: {}",
                raw
            )));
        }

        let reference = OciReference::from_str(raw).map_err(|e| {
            SyncError::validation_with_source(format!("Invalid repository reference: {}", raw), e)
        })?;

        Ok(Self {
            raw: raw.to_string(),
            reference,
        })
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl RepositoryName {
    /// Returns the registry host part of the name.
    pub fn registry(&self) -> &str {
        self.reference.registry()
    }

    /// Returns the repository path inside the registry.
    pub fn path(&self) -> &str {
        self.reference.repository()
    }

    /// Returns the name exactly as it was given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Returns true if `raw` names a tag (`:tag` on the last path component) or a
/// digest (`@algo:hex`).
fn has_tag_or_digest(raw: &str) -> bool {
    if raw.contains('@') {
        return true;
    }
    // A colon in the first component can be a registry port.
    match raw.rsplit_once('/') {
        Some((_, last)) => last.contains(':'),
        None => raw.contains(':'),
    }
}
