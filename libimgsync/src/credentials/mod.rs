//! Credential resolution.
//!
//! Turns a catalog entry into the registry credential it pulls with. The
//! username is derived from the tenant id and the entry's prefix; the
//! password is a registry token obtained from the backend call the entry's
//! product type selects. There is no fallback between token calls.

use crate::auth::RegistryCredential;
use crate::catalog::CatalogEntry;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;


/// Which backend call issues an entry's registry token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The container-security registry credential call.
    Default,
    /// The snapshot scanner registry credential call.
    Snapshot,
    /// The cloud security CLI registry credential call.
    FcsCli,
}

/// The identity API the resolver consumes.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// Returns the caller's tenant identifier.
    async fn tenant_id(&self) -> Result<String>;

    /// Returns one non-empty registry token from the call `kind` selects.
    async fn registry_token(&self, kind: TokenKind) -> Result<String>;
}

/// Builds the registry login for a tenant.
///
/// The login is the prefix, a dash, and the lowercased part of the tenant id
/// before its first dash.
///
/// # Examples
///
/// ```
/// use libimgsync::credentials::registry_login;
///
/// assert_eq!(registry_login("fc", "ABCDEF0123-45"), "fc-abcdef0123");
/// ```
pub fn registry_login(prefix: &str, tenant_id: &str) -> String {
    let first = tenant_id.split('-').next().unwrap_or_default();
    format!("{}-{}", prefix, first.to_lowercase())
}

/// Resolves registry credentials for catalog entries.
#[derive(Clone)]
pub struct CredentialResolver {
    backend: Arc<dyn CredentialBackend>,
}

impl CredentialResolver {
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Self {
        Self { backend }
    }

    /// Looks up the tenant id. Called once per invocation.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if the backend fails or answers with an
    /// empty identifier.
    pub async fn tenant_id(&self) -> Result<String> {
        let tenant = self.backend.tenant_id().await.map_err(|e| match e {
            SyncError::Resolution { .. } => e,
            other => SyncError::resolution(format!("could not get tenant id: {}", other)),
        })?;

        if tenant.trim().is_empty() {
            return Err(SyncError::resolution("received empty tenant id"));
        }
        Ok(tenant)
    }

    /// Resolves the credential for `entry` using an already-resolved tenant id.
    ///
    /// # Errors
    ///
    /// Returns a resolution error naming the entry's product type when the
    /// token call fails or returns an empty token.
    pub async fn resolve(&self, tenant_id: &str, entry: &CatalogEntry) -> Result<RegistryCredential> {
        let product = entry.product().as_str();
        let kind = entry.token_kind();
        debug!(product, token = ?kind, "requesting registry token");

        let password = self.backend.registry_token(kind).await.map_err(|e| {
            SyncError::resolution_for(product, format!("error getting registry token: {}", e))
        })?;

        if password.is_empty() {
            return Err(SyncError::resolution_for(product, "received empty token"));
        }

        Ok(RegistryCredential::new(
            registry_login(entry.login_prefix(), tenant_id),
            password,
        ))
    }
}
