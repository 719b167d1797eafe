//! The aggregation pipeline.
//!
//! Every catalog entry runs concurrently through the same steps: resolve its
//! credential, connect to its registry, list and filter tags, resolve each
//! tag's digest and architectures under a concurrency ceiling, then resolve
//! the digest of the latest tag. Both levels of fan-out use
//! [`scatter_gather`], so results come back in catalog order and in policy
//! order no matter which task finishes first.
//!
//! Any failure aborts the whole run. The one tolerated degradation is an
//! architecture lookup that fails: the tag is reported as `unknown`.

use crate::catalog::CatalogEntry;
use crate::credentials::CredentialResolver;
use crate::error::{PipelineStep, Result};
use crate::fanout::scatter_gather;
use crate::oci::UNKNOWN_ARCHITECTURE;
use crate::policy::TagPolicyEngine;
use crate::registry::{ImageRegistry, RegistryConnector};
use crate::report::{ImageReport, TagRecord};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Default ceiling of in-flight tag resolutions per entry.
pub const DEFAULT_TAG_CONCURRENCY: usize = 10;

/// Runs the per-entry state machine across a catalog.
#[derive(Clone)]
pub struct Pipeline {
    resolver: CredentialResolver,
    connector: Arc<dyn RegistryConnector>,
    policy: Arc<TagPolicyEngine>,
    tag_concurrency: usize,
}

impl Pipeline {
    pub fn new(
        resolver: CredentialResolver,
        connector: Arc<dyn RegistryConnector>,
        policy: TagPolicyEngine,
    ) -> Self {
        Self {
            resolver,
            connector,
            policy: Arc::new(policy),
            tag_concurrency: DEFAULT_TAG_CONCURRENCY,
        }
    }

    /// Sets the per-entry ceiling of in-flight tag resolutions.
    pub fn with_tag_concurrency(mut self, limit: usize) -> Self {
        self.tag_concurrency = limit.max(1);
        self
    }

    /// Produces one [`ImageReport`] per entry, in the order given.
    ///
    /// The tenant id is resolved once and shared by every entry.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if the tenant id cannot be obtained, or an
    /// [`Entry`](crate::SyncError::Entry) error naming the first entry and
    /// step that failed. No partial result is returned.
    pub async fn run(&self, entries: Vec<CatalogEntry>) -> Result<Vec<ImageReport>> {
        let tenant: Arc<str> = Arc::from(self.resolver.tenant_id().await?);
        info!(entries = entries.len(), "starting image sync");

        scatter_gather(entries, None, |_, entry| {
            let pipeline = self.clone();
            let tenant = tenant.clone();
            async move { pipeline.sync_entry(&tenant, entry).await }
        })
        .await
    }

    async fn sync_entry(&self, tenant: &str, entry: CatalogEntry) -> Result<ImageReport> {
        let product = entry.product().as_str();

        let credential = self
            .resolver
            .resolve(tenant, &entry)
            .await
            .map_err(|e| e.at_step(product, PipelineStep::ResolveCredentials))?;

        let registry = self
            .connector
            .connect(entry.registry(), credential.clone())
            .map_err(|e| e.at_step(product, PipelineStep::ConnectRegistry))?;

        let listed = registry
            .list_tags(entry.repository())
            .await
            .map_err(|e| e.at_step(product, PipelineStep::ListTags))?;
        let listed_count = listed.len();

        let tags = self.policy.apply(entry.tag_policy(), listed);
        info!(
            product,
            listed = listed_count,
            kept = tags.len(),
            "applied tag policy"
        );

        let repository: Arc<str> = Arc::from(entry.repository());
        let records = scatter_gather(tags, Some(self.tag_concurrency), |_, tag| {
            let registry = registry.clone();
            let repository = repository.clone();
            async move { resolve_tag(registry.as_ref(), &repository, tag).await }
        })
        .await
        .map_err(|e| e.at_step(product, PipelineStep::ResolveTag))?;

        let (latest, digest) = match records.last() {
            Some(last) => {
                let digest = registry
                    .get_digest(entry.repository(), &last.name)
                    .await
                    .map_err(|e| e.at_step(product, PipelineStep::ResolveLatestDigest))?;
                (last.name.clone(), digest)
            }
            None => (String::new(), String::new()),
        };

        Ok(ImageReport {
            name: entry.name().to_string(),
            description: entry.description().to_string(),
            registry: entry.registry().to_string(),
            repository: entry.repository().to_string(),
            latest,
            digest,
            login: credential.username().to_string(),
            password: credential.password().to_string(),
            docker_auth_config: registry.build_auth_blob(entry.registry()),
            tags: records,
        })
    }
}

/// Resolves one tag's digest and architectures concurrently.
///
/// A digest failure is fatal; an architecture failure degrades to `unknown`.
async fn resolve_tag(
    registry: &dyn ImageRegistry,
    repository: &str,
    tag: String,
) -> Result<TagRecord> {
    let (digest, architectures) = tokio::join!(
        registry.get_digest(repository, &tag),
        registry.get_architectures(repository, &tag)
    );
    let digest = digest?;

    let architectures = match architectures {
        Ok(set) if !set.is_empty() => set,
        Ok(_) => unknown_architecture(),
        Err(e) => {
            warn!(repository, tag = %tag, error = %e, "could not resolve architecture");
            unknown_architecture()
        }
    };
    debug!(repository, tag = %tag, digest = %digest, "resolved tag");

    Ok(TagRecord {
        name: tag,
        digest,
        arch: architectures.into_iter().collect(),
    })
}

fn unknown_architecture() -> BTreeSet<String> {
    BTreeSet::from([UNKNOWN_ARCHITECTURE.to_string()])
}
