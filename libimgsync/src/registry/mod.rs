//! Registry operations module.
//!
//! This module provides the read-only registry operations the pipeline needs:
//! listing tags, resolving a tag's digest, and resolving the set of CPU
//! architectures a tag supports. The operations sit behind the
//! [`ImageRegistry`] trait so the pipeline can run against in-memory fakes,
//! and registries are opened through a [`RegistryConnector`] so every catalog
//! entry gets a client scoped to its own credential.

use crate::auth::RegistryCredential;
use crate::client::{Client, ClientConfig};
use crate::error::{Result, SyncError};
use crate::oci::{self, ManifestKind};
use crate::reference::RepositoryName;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;


/// Authenticated, read-only access to one registry.
///
/// Every `repository` argument is a bare repository name including the
/// registry host, e.g. `registry.crowdstrike.com/falcon-kac/us-1/release/falcon-kac`.
/// An implementation is bound to one credential and must not be reused for
/// another.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Lists every tag of `repository`.
    ///
    /// # Errors
    ///
    /// Fails before any network call if `repository` is malformed or carries
    /// a tag or digest; fails afterwards on any transport, authentication or
    /// protocol error.
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>>;

    /// Resolves the content digest of the manifest behind `repository:tag`.
    async fn get_digest(&self, repository: &str, tag: &str) -> Result<String>;

    /// Resolves the normalized architectures `repository:tag` is published for.
    ///
    /// Multi-architecture indexes report every child platform; a
    /// single-architecture manifest reports the architecture of its image
    /// configuration. Any other manifest media type is an error.
    async fn get_architectures(&self, repository: &str, tag: &str) -> Result<BTreeSet<String>>;

    /// Builds the base64 pull-secret blob for `registry_host` from this
    /// registry's credential. No network call is made.
    fn build_auth_blob(&self, registry_host: &str) -> String;
}

/// Opens an [`ImageRegistry`] scoped to one credential.
pub trait RegistryConnector: Send + Sync {
    /// Connects to `registry_host` with `credential`.
    fn connect(
        &self,
        registry_host: &str,
        credential: RegistryCredential,
    ) -> Result<Arc<dyn ImageRegistry>>;
}

/// Registry Client over HTTP.
pub struct HttpRegistry {
    client: Client,
    credential: RegistryCredential,
}

impl HttpRegistry {
    /// Creates a registry from an HTTP client and the credential it was built with.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::auth::RegistryCredential;
    /// use libimgsync::client::Client;
    /// use libimgsync::registry::HttpRegistry;
    ///
    /// let cred = RegistryCredential::new("fc-abcdef", "secret");
    /// let client = Client::new("https://registry.example.com", Some(cred.clone())).unwrap();
    /// let registry = HttpRegistry::new(client, cred);
    /// ```
    pub fn new(client: Client, credential: RegistryCredential) -> Self {
        Self { client, credential }
    }

    fn repository_path(repository: &str) -> Result<String> {
        let name = RepositoryName::from_str(repository)?;
        Ok(name.path().to_string())
    }
}

#[async_trait]
impl ImageRegistry for HttpRegistry {
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        let path = Self::repository_path(repository)?;
        let tags = self.client.fetch_tags(&path).await?;
        debug!(repository, count = tags.len(), "listed tags");
        Ok(tags)
    }

    async fn get_digest(&self, repository: &str, tag: &str) -> Result<String> {
        let path = Self::repository_path(repository)?;
        let digest = self.client.manifest_digest(&path, tag).await?;
        Ok(digest.to_string())
    }

    async fn get_architectures(&self, repository: &str, tag: &str) -> Result<BTreeSet<String>> {
        let path = Self::repository_path(repository)?;
        let manifest = self.client.fetch_manifest(&path, tag).await?;

        match ManifestKind::detect(manifest.content_type.as_deref(), &manifest.bytes)? {
            ManifestKind::Index => {
                let index = oci::parse_index(&manifest.bytes)?;
                let architectures: BTreeSet<String> =
                    oci::index_architectures(&index).into_iter().collect();
                if architectures.is_empty() {
                    return Err(SyncError::validation(format!(
                        "manifest list for {}:{} lists no platforms",
                        repository, tag
                    )));
                }
                Ok(architectures)
            }
            ManifestKind::Manifest => {
                let image = oci::parse_manifest(&manifest.bytes)?;
                let config_digest = image.config().digest().to_string();
                let config = self.client.fetch_blob(&path, &config_digest).await?;
                let platform = oci::parse_config_platform(&config)?;
                Ok(BTreeSet::from([oci::normalize_architecture(
                    &platform.architecture,
                )]))
            }
        }
    }

    fn build_auth_blob(&self, registry_host: &str) -> String {
        self.credential.docker_auth_config(registry_host)
    }
}

/// Connects [`HttpRegistry`] instances.
///
/// By default the registry host is contacted over `https://`. A base URL
/// override sends every request to a mirror or test registry instead while
/// repository paths stay unchanged.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    config: ClientConfig,
    base_url: Option<String>,
}

impl HttpConnector {
    /// Creates a connector with the given client configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            base_url: None,
        }
    }

    /// Sends every request to `base_url` instead of the registry host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl RegistryConnector for HttpConnector {
    fn connect(
        &self,
        registry_host: &str,
        credential: RegistryCredential,
    ) -> Result<Arc<dyn ImageRegistry>> {
        let url = self.base_url.as_deref().unwrap_or(registry_host);
        let client = Client::with_config(url, Some(credential.clone()), self.config.clone())?;
        Ok(Arc::new(HttpRegistry::new(client, credential)))
    }
}
