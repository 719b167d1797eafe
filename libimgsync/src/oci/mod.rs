//! OCI and Docker manifest handling.
//!
//! This module re-exports the `oci-spec` types used to read manifests, maps a
//! manifest media type onto the two shapes the registry client cares about
//! (a multi-architecture index or a single-architecture manifest), and
//! normalizes architecture names into the vocabulary the report uses.

pub use oci_spec::image::{Descriptor, ImageIndex, ImageManifest};

use crate::error::{Result, SyncError};
use serde::Deserialize;


/// Docker multi-architecture manifest list.
pub const DOCKER_MANIFEST_LIST_V2: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
/// Docker single-architecture image manifest.
pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
/// OCI image index.
pub const OCI_IMAGE_INDEX_V1: &str = "application/vnd.oci.image.index.v1+json";
/// OCI image manifest.
pub const OCI_IMAGE_MANIFEST_V1: &str = "application/vnd.oci.image.manifest.v1+json";

/// Accept header sent with every manifest request.
pub const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.oci.image.index.v1+json, \
     application/vnd.oci.image.manifest.v1+json";

/// Architecture reported when it cannot be determined from the manifest.
pub const UNKNOWN_ARCHITECTURE: &str = "unknown";

/// The manifest shapes the registry client knows how to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// A multi-architecture index; every child descriptor carries a platform.
    Index,
    /// A single-architecture manifest; the architecture lives in the config blob.
    Manifest,
}

impl ManifestKind {
    /// Classifies a manifest media type.
    ///
    /// Any parameters after `;` are ignored. Media types other than the
    /// Docker v2 and OCI v1 manifest/index types are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::oci::ManifestKind;
    ///
    /// let kind = ManifestKind::from_media_type(
    ///     "application/vnd.docker.distribution.manifest.list.v2+json",
    /// ).unwrap();
    /// assert_eq!(kind, ManifestKind::Index);
    /// ```
    pub fn from_media_type(media_type: &str) -> Result<Self> {
        let essence = media_type.split(';').next().unwrap_or("").trim();
        match essence {
            DOCKER_MANIFEST_LIST_V2 | OCI_IMAGE_INDEX_V1 => Ok(Self::Index),
            DOCKER_MANIFEST_V2 | OCI_IMAGE_MANIFEST_V1 => Ok(Self::Manifest),
            other => Err(SyncError::validation(format!(
                "unsupported manifest type: {}",
                other
            ))),
        }
    }

    /// Determines the manifest kind from the response `Content-Type`, falling
    /// back to the `mediaType` field of the body when the header is absent or
    /// generic.
    pub fn detect(content_type: Option<&str>, body: &[u8]) -> Result<Self> {
        if let Some(content_type) = content_type
            && !is_generic_content_type(content_type)
        {
            return Self::from_media_type(content_type);
        }

        #[derive(Deserialize)]
        struct MediaTypeField {
            #[serde(rename = "mediaType")]
            media_type: Option<String>,
        }

        let head: MediaTypeField = serde_json::from_slice(body)
            .map_err(|e| SyncError::validation_with_source("Failed to parse manifest JSON", e))?;

        match head.media_type {
            Some(media_type) => Self::from_media_type(&media_type),
            None => Err(SyncError::validation(
                "Unable to determine manifest media type",
            )),
        }
    }
}

fn is_generic_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence.is_empty() || essence == "application/json" || essence == "application/octet-stream"
}

/// Parses a multi-architecture index body.
pub fn parse_index(bytes: &[u8]) -> Result<ImageIndex> {
    serde_json::from_slice(bytes)
        .map_err(|e| SyncError::validation_with_source("error parsing manifest list", e))
}

/// Parses a single-architecture manifest body.
pub fn parse_manifest(bytes: &[u8]) -> Result<ImageManifest> {
    serde_json::from_slice(bytes)
        .map_err(|e| SyncError::validation_with_source("error parsing image manifest", e))
}

/// Returns the normalized architecture of every platform listed in `index`.
///
/// Descriptors without a platform are skipped.
pub fn index_architectures(index: &ImageIndex) -> Vec<String> {
    index
        .manifests()
        .iter()
        .filter_map(|desc| desc.platform().as_ref())
        .map(|platform| normalize_architecture(&platform.architecture().to_string()))
        .collect()
}

/// The subset of an image configuration blob needed to read its platform.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfigPlatform {
    pub architecture: String,
    #[serde(default)]
    pub os: Option<String>,
}

/// Parses the platform fields out of an image configuration blob.
pub fn parse_config_platform(bytes: &[u8]) -> Result<ImageConfigPlatform> {
    serde_json::from_slice(bytes)
        .map_err(|e| SyncError::validation_with_source("error inspecting image config", e))
}

/// Maps registry architecture names onto the report vocabulary.
///
/// `arm64` becomes `aarch64` and `amd64` becomes `x86_64`; every other name
/// passes through unchanged.
///
/// # Examples
///
/// ```
/// use libimgsync::oci::normalize_architecture;
///
/// assert_eq!(normalize_architecture("arm64"), "aarch64");
/// assert_eq!(normalize_architecture("amd64"), "x86_64");
/// assert_eq!(normalize_architecture("ppc64le"), "ppc64le");
/// ```
pub fn normalize_architecture(arch: &str) -> String {
    match arch {
        "arm64" => "aarch64".to_string(),
        "amd64" => "x86_64".to_string(),
        other => other.to_string(),
    }
}
