//! One sync invocation, end to end.
//!
//! [`ImageSync`] builds a vendor API client from the optional inbound bearer
//! credential, runs the [`Pipeline`] over the region's catalog, assembles the
//! report and, when the bearer was non-empty, uploads it.
//!
//! # Examples
//!
//! ```no_run
//! use libimgsync::{Config, ImageSync};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sync = ImageSync::builder().config(Config::from_env(None)?).build()?;
//!     let report = sync.run(None).await?;
//!     println!("{} images, {} tags", report.images.len(), report.tag_count());
//!     Ok(())
//! }
//! ```

use crate::catalog::catalog;
use crate::config::Config;
use crate::credentials::{CredentialBackend, CredentialResolver};
use crate::error::{Result, SyncError};
use crate::falcon::{CollectionStore, FalconApi};
use crate::pipeline::Pipeline;
use crate::registry::{HttpConnector, RegistryConnector};
use crate::report::{AggregateReport, ReportAssembler, ReportStore};
use std::sync::Arc;
use tracing::{debug, info};


/// The image sync service.
///
/// Cheap to clone; clones share configuration and connector.
#[derive(Clone)]
pub struct ImageSync {
    config: Arc<Config>,
    connector: Arc<dyn RegistryConnector>,
}

impl ImageSync {
    /// Creates a builder.
    pub fn builder() -> ImageSyncBuilder {
        ImageSyncBuilder::new()
    }

    /// Returns the configuration this service was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one invocation.
    ///
    /// A non-empty `bearer` is used as the vendor API access token and
    /// enables the report upload. Without one, the configured client
    /// credentials are exchanged for a token and nothing is uploaded.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when there is neither a bearer nor
    /// client credentials, any pipeline error, or a storage error when the
    /// upload fails.
    pub async fn run(&self, bearer: Option<&str>) -> Result<AggregateReport> {
        let bearer = bearer.map(str::trim).filter(|token| !token.is_empty());
        let api = self.vendor_api(bearer).await?;

        let store = bearer.map(|_| {
            CollectionStore::new(
                api.clone(),
                &self.config.storage.collection,
                &self.config.storage.object_key,
            )
        });
        let store = store.as_ref().map(|s| s as &dyn ReportStore);

        self.run_with(Arc::new(api), store).await
    }

    /// Runs one invocation against an explicit credential backend, storing
    /// the report in `store` when given.
    pub async fn run_with(
        &self,
        backend: Arc<dyn CredentialBackend>,
        store: Option<&dyn ReportStore>,
    ) -> Result<AggregateReport> {
        let assembler = ReportAssembler::start();

        let pipeline = Pipeline::new(
            CredentialResolver::new(backend),
            self.connector.clone(),
            self.config.policy_engine()?,
        )
        .with_tag_concurrency(self.config.sync.tag_concurrency);

        let images = pipeline.run(catalog(self.config.falcon.cloud)).await?;
        let report = assembler.finish(images);
        info!(
            cloud = %self.config.falcon.cloud,
            images = report.images.len(),
            tags = report.tag_count(),
            duration_ms = report.duration,
            "image sync finished"
        );

        if let Some(store) = store {
            store.store(&report).await?;
        }
        Ok(report)
    }

    async fn vendor_api(&self, bearer: Option<&str>) -> Result<FalconApi> {
        let base_url = self.config.api_base_url();
        let timeout = self.config.registry.timeout;

        if let Some(token) = bearer {
            debug!(api = %base_url, "using inbound bearer credential");
            return FalconApi::with_token(&base_url, token, timeout);
        }

        match (
            self.config.falcon.client_id.as_deref(),
            self.config.falcon.client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                debug!(api = %base_url, "exchanging client credentials");
                FalconApi::authenticate(&base_url, id, secret, timeout).await
            }
            _ => Err(SyncError::config(
                "no bearer credential supplied and FALCON_CLIENT_ID/FALCON_CLIENT_SECRET are not set",
                None,
            )),
        }
    }
}

/// Builder for [`ImageSync`].
#[derive(Default)]
pub struct ImageSyncBuilder {
    config: Option<Config>,
    connector: Option<Arc<dyn RegistryConnector>>,
}

impl ImageSyncBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration (default: [`Config::default`]).
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the HTTP registry connector.
    pub fn connector(mut self, connector: Arc<dyn RegistryConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Validates the configuration and builds the service.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if validation fails.
    pub fn build(self) -> Result<ImageSync> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let connector = match self.connector {
            Some(connector) => connector,
            None => {
                let mut http = HttpConnector::new(config.client_config());
                if let Some(url) = config.registry.url.as_deref().filter(|u| !u.trim().is_empty()) {
                    http = http.with_base_url(url.trim());
                }
                Arc::new(http)
            }
        };

        Ok(ImageSync {
            config: Arc::new(config),
            connector,
        })
    }
}
