//! Vendor API adapter.
//!
//! [`FalconApi`] talks to the vendor's REST API with one access token: it
//! looks up the tenant id, issues registry tokens (the default call and the
//! two specialized ones), and uploads the finished report to a custom-object
//! collection. The token either accompanies the inbound request or comes
//! from an OAuth2 client-credentials exchange.

use crate::client::Client;
use crate::credentials::{CredentialBackend, TokenKind};
use crate::error::{Result, SyncError};
use crate::report::{AggregateReport, ReportStore};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};


const OAUTH2_TOKEN_PATH: &str = "/oauth2/token";
const TENANT_ID_PATH: &str = "/sensors/queries/installers/ccid/v1";
const DEFAULT_TOKEN_PATH: &str = "/container-security/entities/image-registry-credentials/v1";
const SNAPSHOT_TOKEN_PATH: &str = "/snapshots/entities/image-registry-credentials/v1";
const FCS_CLI_TOKEN_PATH: &str = "/iac/entities/image-registry-credentials/v1";

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Common response envelope of the vendor API.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    resources: Option<T>,
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
struct TokenResource {
    #[serde(default)]
    token: Option<String>,
}

/// Token calls answer with either a one-element list or a single object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenResources {
    Many(Vec<TokenResource>),
    One(TokenResource),
}

#[derive(Debug, Deserialize)]
struct OAuth2Token {
    access_token: String,
}

fn user_agent() -> String {
    format!("imgsync/{}", env!("CARGO_PKG_VERSION"))
}

fn assert_no_errors(errors: Option<Vec<ApiError>>) -> Result<()> {
    match errors {
        Some(errors) if !errors.is_empty() => {
            let joined = errors
                .iter()
                .map(|e| match e.code {
                    Some(code) => format!("{} ({})", e.message, code),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            Err(SyncError::resolution(format!("API reported errors: {}", joined)))
        }
        _ => Ok(()),
    }
}

/// A client for the vendor API bound to one access token.
#[derive(Debug, Clone)]
pub struct FalconApi {
    http_client: ReqwestClient,
    base_url: String,
    access_token: String,
}

impl FalconApi {
    /// Creates a client that uses `access_token` as is.
    pub fn with_token(base_url: &str, access_token: &str, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            http_client: Self::build_http_client(timeout_seconds)?,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// Exchanges API client credentials for an access token.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the API rejects the credentials,
    /// or a network error if it cannot be reached.
    pub async fn authenticate(
        base_url: &str,
        client_id: &str,
        client_secret: &str,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let http_client = Self::build_http_client(timeout_seconds)?;
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let url = format!("{}{}", base_url, OAUTH2_TOKEN_PATH);

        debug!(url = %url, "requesting API access token");
        let response = http_client
            .post(&url)
            .form(&[("client_id", client_id), ("client_secret", client_secret)])
            .send()
            .await
            .map_err(|e| SyncError::network_with_source(format!("request to {} failed", url), e))?;
        let response = Client::check_response_status(response).await?;

        let token: OAuth2Token = response.json().await.map_err(|e| {
            SyncError::validation_with_source("Failed to parse OAuth2 token response", e)
        })?;
        if token.access_token.is_empty() {
            return Err(SyncError::authentication(
                "OAuth2 token response carried an empty access token",
                None,
            ));
        }

        Ok(Self {
            http_client,
            base_url,
            access_token: token.access_token,
        })
    }

    fn build_http_client(timeout_seconds: u64) -> Result<ReqwestClient> {
        ReqwestClient::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent())
            .build()
            .map_err(|e| SyncError::network_with_source("Failed to create HTTP client", e))
    }

    /// Returns the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(header::AUTHORIZATION, format!("Bearer {}", self.access_token))
    }

    async fn get_envelope<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .authorized(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| SyncError::network_with_source(format!("request to {} failed", url), e))?;
        let response = Client::check_response_status(response).await?;

        response.json().await.map_err(|e| {
            SyncError::validation_with_source(format!("Failed to parse response from {}", path), e)
        })
    }

    /// Looks up the caller's tenant id (CID).
    pub async fn get_tenant_id(&self) -> Result<String> {
        let envelope: Envelope<Vec<String>> = self.get_envelope(TENANT_ID_PATH).await?;
        assert_no_errors(envelope.errors)?;

        match envelope.resources.unwrap_or_default().as_slice() {
            [cid] => Ok(cid.clone()),
            other => Err(SyncError::resolution(format!(
                "failed to get tenant id: unexpected API response: {:?}",
                other
            ))),
        }
    }

    /// Requests a registry token from the call `kind` selects.
    pub async fn get_registry_token(&self, kind: TokenKind) -> Result<String> {
        let path = match kind {
            TokenKind::Default => DEFAULT_TOKEN_PATH,
            TokenKind::Snapshot => SNAPSHOT_TOKEN_PATH,
            TokenKind::FcsCli => FCS_CLI_TOKEN_PATH,
        };

        let envelope: Envelope<TokenResources> = self.get_envelope(path).await?;
        assert_no_errors(envelope.errors)?;

        let resource = match envelope.resources {
            Some(TokenResources::One(resource)) => resource,
            Some(TokenResources::Many(mut list)) if list.len() == 1 => list.remove(0),
            Some(TokenResources::Many(list)) => {
                return Err(SyncError::resolution(format!(
                    "expected to receive exactly one token, but got {}",
                    list.len()
                )));
            }
            None => return Err(SyncError::resolution("expected to receive a token, but got none")),
        };

        match resource.token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(SyncError::resolution("received empty token")),
        }
    }

    /// Stores `report` as `<collection>/<object_key>` in the custom-object store.
    ///
    /// # Errors
    ///
    /// Every failure is reported as a storage error.
    pub async fn upload_report(
        &self,
        collection: &str,
        object_key: &str,
        report: &AggregateReport,
    ) -> Result<()> {
        let url = format!(
            "{}/customobjects/v1/collections/{}/objects/{}",
            self.base_url, collection, object_key
        );

        let response = self
            .authorized(self.http_client.put(&url))
            .json(report)
            .send()
            .await
            .map_err(|e| SyncError::storage_with_source("error storing image list in collection", e))?;

        Client::check_response_status(response).await.map_err(|e| {
            SyncError::storage(format!("error storing image list in collection: {}", e))
        })?;

        info!(collection, object_key, images = report.images.len(), "uploaded report");
        Ok(())
    }
}

#[async_trait]
impl CredentialBackend for FalconApi {
    async fn tenant_id(&self) -> Result<String> {
        self.get_tenant_id().await
    }

    async fn registry_token(&self, kind: TokenKind) -> Result<String> {
        self.get_registry_token(kind).await
    }
}

/// A [`ReportStore`] writing to one custom-object collection.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    api: FalconApi,
    collection: String,
    object_key: String,
}

impl CollectionStore {
    pub fn new(api: FalconApi, collection: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            api,
            collection: collection.into(),
            object_key: object_key.into(),
        }
    }
}

#[async_trait]
impl ReportStore for CollectionStore {
    async fn store(&self, report: &AggregateReport) -> Result<()> {
        self.api
            .upload_report(&self.collection, &self.object_key, report)
            .await
    }
}
