//! HTTP client for registry communication.
//!
//! This module provides a thin HTTP client built on reqwest that speaks the
//! read-only half of the OCI Distribution API: tag listing, manifest `HEAD`
//! and `GET`, and blob downloads. Every request is scoped to the single
//! [`RegistryCredential`] the client was built with, and registries that answer
//! with a `Bearer` challenge get a token exchange before the request is retried.

use crate::auth::{AuthChallenge, RegistryCredential};
use crate::digest::Digest;
use crate::error::{Result, SyncError};
use crate::oci::MANIFEST_ACCEPT;
use reqwest::header::{self, HeaderMap};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};


const DOCKER_CONTENT_DIGEST: &str = "Docker-Content-Digest";

/// Response from the tags list API endpoint.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    /// Repository name
    name: String,
    /// List of tag names; registries send `null` for an empty repository
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Response from a token endpoint named in a `Bearer` challenge.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// A fetched manifest together with the headers needed to interpret it.
#[derive(Debug, Clone)]
pub struct ManifestResponse {
    /// Raw manifest body.
    pub bytes: Vec<u8>,
    /// The `Content-Type` the registry answered with.
    pub content_type: Option<String>,
    /// The `Docker-Content-Digest` header, when present.
    pub digest: Option<String>,
}

/// Configuration for the HTTP client.
///
/// # Examples
///
/// ```
/// use libimgsync::client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_timeout(60)
///     .with_max_idle_per_host(20);
/// assert_eq!(config.timeout_seconds, 60);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request deadline in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 10,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::client::ClientConfig;
    ///
    /// let config = ClientConfig::new();
    /// assert_eq!(config.timeout_seconds, 30);
    /// assert_eq!(config.max_idle_per_host, 10);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-request deadline in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }
}

/// How requests for one repository scope get authorized once the registry
/// has told us what it wants.
#[derive(Debug, Clone)]
enum ScopeAuth {
    Basic,
    Bearer(String),
}

/// HTTP client for registry operations.
///
/// Cloning is cheap and clones share the bearer-token cache.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: ReqwestClient,
    registry_url: String,
    credential: Option<RegistryCredential>,
    timeout_seconds: u64,
    scopes: Arc<Mutex<HashMap<String, ScopeAuth>>>,
}

impl Client {
    /// Creates a client for `registry_url` with the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::auth::RegistryCredential;
    /// use libimgsync::client::Client;
    ///
    /// let cred = RegistryCredential::new("fc-abcdef", "secret");
    /// let client = Client::new("https://registry.example.com", Some(cred)).unwrap();
    /// assert_eq!(client.registry_url(), "https://registry.example.com");
    /// ```
    pub fn new(registry_url: &str, credential: Option<RegistryCredential>) -> Result<Self> {
        Self::with_config(registry_url, credential, ClientConfig::default())
    }

    /// Creates a client for `registry_url` with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the URL is empty, or a network error if
    /// the underlying HTTP client cannot be built.
    pub fn with_config(
        registry_url: &str,
        credential: Option<RegistryCredential>,
        config: ClientConfig,
    ) -> Result<Self> {
        let normalized_url = Self::normalize_url(registry_url)?;

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| SyncError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            registry_url: normalized_url,
            credential,
            timeout_seconds: config.timeout_seconds,
            scopes: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Normalizes a registry URL by ensuring it has a scheme and removing trailing slashes.
    ///
    /// Bare hosts default to `https://`.
    fn normalize_url(url: &str) -> Result<String> {
        let url = url.trim();

        if url.is_empty() {
            return Err(SyncError::validation("Registry URL cannot be empty"));
        }

        let url = if !url.starts_with("http://") && !url.starts_with("https://") {
            format!("https://{}", url)
        } else {
            url.to_string()
        };

        Ok(url.trim_end_matches('/').to_string())
    }

    /// Returns the base registry URL.
    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// Fetches every tag of `repository`, following `Link` pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry is unreachable, rejects the
    /// credential, does not know the repository, or answers with a body that
    /// is not a tag list for `repository`.
    pub async fn fetch_tags(&self, repository: &str) -> Result<Vec<String>> {
        self.fetch_tags_paginated(repository, None).await
    }

    /// Fetches tags with an optional page size.
    ///
    /// If `limit` is `Some(n)` the registry is asked for `n` tags per page;
    /// every page is still fetched.
    pub async fn fetch_tags_paginated(
        &self,
        repository: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let mut all_tags = Vec::new();
        let mut url = format!("{}/v2/{}/tags/list", self.registry_url, repository);

        if let Some(n) = limit {
            url.push_str(&format!("?n={}", n));
        }

        let mut visited = HashSet::new();
        loop {
            visited.insert(url.clone());
            let response = self.send(Method::GET, &url, repository, None).await?;

            // Extract Link header for pagination before consuming response
            let next_path = Self::extract_next_link(response.headers());

            let response = Self::check_response_status(response).await?;

            let tags_response: TagsResponse = response.json().await.map_err(|e| {
                SyncError::validation_with_source("Failed to parse tags response", e)
            })?;

            if tags_response.name != repository {
                return Err(SyncError::validation(format!(
                    "Registry returned tags for '{}' but expected '{}'",
                    tags_response.name, repository
                )));
            }

            all_tags.extend(tags_response.tags.unwrap_or_default());

            let next = match next_path {
                Some(next) if next.starts_with("http://") || next.starts_with("https://") => next,
                Some(path) => format!("{}{}", self.registry_url, path),
                None => break,
            };
            if visited.contains(&next) {
                warn!(repository, url = %next, "tag pagination repeats a page, stopping");
                break;
            }
            url = next;
        }

        Ok(all_tags)
    }

    /// Resolves the digest of `repository:reference` with a `HEAD` request.
    ///
    /// Returns `Ok(None)` when the registry answers without a
    /// `Docker-Content-Digest` header.
    pub async fn head_manifest_digest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<Option<Digest>> {
        let url = self.manifest_url(repository, reference);
        let response = self
            .send(Method::HEAD, &url, repository, Some(MANIFEST_ACCEPT))
            .await?;
        let response = Self::check_response_status(response).await?;

        Self::header_value(response.headers(), DOCKER_CONTENT_DIGEST)
            .map(|value| Digest::from_str(&value))
            .transpose()
    }

    /// Resolves the content digest of the manifest behind `repository:reference`.
    ///
    /// The `HEAD` digest header is preferred. Registries that omit it get a
    /// full `GET`, and the digest is computed from the manifest body.
    pub async fn manifest_digest(&self, repository: &str, reference: &str) -> Result<Digest> {
        if let Some(digest) = self.head_manifest_digest(repository, reference).await? {
            return Ok(digest);
        }

        debug!(repository, reference, "HEAD carried no digest, hashing manifest body");
        let manifest = self.fetch_manifest(repository, reference).await?;
        match manifest.digest {
            Some(value) => Digest::from_str(&value),
            None => Digest::sha256(&manifest.bytes),
        }
    }

    /// Fetches the manifest for `repository:reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry is unreachable, the reference does
    /// not exist, or authentication fails.
    pub async fn fetch_manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<ManifestResponse> {
        let url = self.manifest_url(repository, reference);
        let response = self
            .send(Method::GET, &url, repository, Some(MANIFEST_ACCEPT))
            .await?;
        let response = Self::check_response_status(response).await?;

        let content_type = Self::header_value(response.headers(), header::CONTENT_TYPE.as_str());
        let digest = Self::header_value(response.headers(), DOCKER_CONTENT_DIGEST);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::network_with_source("Failed to read manifest response", e))?;

        Ok(ManifestResponse {
            bytes: bytes.to_vec(),
            content_type,
            digest,
        })
    }

    /// Fetches a blob and verifies it against `digest`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `digest` is malformed or the downloaded
    /// content does not hash to it.
    pub async fn fetch_blob(&self, repository: &str, digest: &str) -> Result<Vec<u8>> {
        let expected_digest = Digest::from_str(digest)?;

        let url = format!("{}/v2/{}/blobs/{}", self.registry_url, repository, digest);
        let response = self.send(Method::GET, &url, repository, None).await?;
        let response = Self::check_response_status(response).await?;

        let blob_bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::network_with_source("Failed to read blob response", e))?;

        expected_digest.verify(&blob_bytes)?;

        Ok(blob_bytes.to_vec())
    }

    fn manifest_url(&self, repository: &str, reference: &str) -> String {
        format!(
            "{}/v2/{}/manifests/{}",
            self.registry_url, repository, reference
        )
    }

    /// Sends a request, answering one authentication challenge if needed.
    ///
    /// The returned response has not been status-checked.
    async fn send(
        &self,
        method: Method,
        url: &str,
        repository: &str,
        accept: Option<&str>,
    ) -> Result<Response> {
        let scope = pull_scope(repository);
        let known = self.scopes.lock().await.get(&scope).cloned();

        let response = self
            .request(method.clone(), url, accept, known.as_ref())
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(credential) = &self.credential else {
            return Ok(response);
        };

        let Some(challenge) = Self::header_value(response.headers(), header::WWW_AUTHENTICATE.as_str())
            .and_then(|value| AuthChallenge::parse(&value).ok())
        else {
            return Ok(response);
        };

        let auth = if challenge.is_bearer() {
            let token = self.exchange_token(credential, &challenge, &scope).await?;
            ScopeAuth::Bearer(token)
        } else if matches!(known, Some(ScopeAuth::Basic)) {
            // Basic credentials were already rejected.
            return Ok(response);
        } else {
            ScopeAuth::Basic
        };

        self.scopes.lock().await.insert(scope, auth.clone());

        self.request(method, url, accept, Some(&auth))
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e))
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        accept: Option<&str>,
        auth: Option<&ScopeAuth>,
    ) -> RequestBuilder {
        let mut request = self.http_client.request(method, url);

        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }

        match (auth, &self.credential) {
            (Some(ScopeAuth::Bearer(token)), _) => {
                request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            (Some(ScopeAuth::Basic), Some(credential)) => {
                request = request.header(header::AUTHORIZATION, credential.basic_header_value());
            }
            _ => {}
        }

        request
    }

    /// Exchanges the basic credential for a bearer token at the challenge realm.
    async fn exchange_token(
        &self,
        credential: &RegistryCredential,
        challenge: &AuthChallenge,
        scope: &str,
    ) -> Result<String> {
        let scope = challenge.scope.as_deref().unwrap_or(scope);
        debug!(realm = %challenge.realm, scope, "exchanging registry credential for bearer token");

        let mut query = vec![("scope", scope)];
        if let Some(service) = &challenge.service {
            query.push(("service", service.as_str()));
        }

        let response = self
            .http_client
            .get(&challenge.realm)
            .query(&query)
            .header(header::AUTHORIZATION, credential.basic_header_value())
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e))?;

        let response = Self::check_response_status(response).await?;

        let token: TokenResponse = response.json().await.map_err(|e| {
            SyncError::validation_with_source("Failed to parse token response", e)
        })?;

        token
            .token
            .or(token.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SyncError::authentication(
                    format!("Token endpoint {} returned no token", challenge.realm),
                    None,
                )
            })
    }

    fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    /// Extracts the next page URL from the Link header.
    ///
    /// Format: `</v2/<name>/tags/list?n=100&last=tag99>; rel="next"`
    fn extract_next_link(headers: &HeaderMap) -> Option<String> {
        let link_header = headers.get(header::LINK)?;
        let link_str = link_header.to_str().ok()?;

        for link_part in link_str.split(',') {
            let link_part = link_part.trim();

            if link_part.contains("rel=\"next\"") || link_part.contains("rel='next'") {
                if let Some(start) = link_part.find('<')
                    && let Some(end) = link_part.find('>')
                {
                    return Some(link_part[start + 1..end].to_string());
                }
            }
        }

        None
    }

    /// Translates a reqwest error into a SyncError.
    fn translate_reqwest_error(&self, error: reqwest::Error) -> SyncError {
        if error.is_timeout() {
            SyncError::network(format!(
                "Request to {} timed out after {} seconds",
                self.registry_url, self.timeout_seconds
            ))
        } else if error.is_connect() {
            SyncError::network_with_source(
                format!("Failed to connect to registry at {}", self.registry_url),
                error,
            )
        } else if error.is_request() {
            SyncError::network_with_source(
                format!("Failed to send request to {}", self.registry_url),
                error,
            )
        } else {
            SyncError::network_with_source(
                format!("Network error communicating with {}", self.registry_url),
                error,
            )
        }
    }

    /// Checks the HTTP response status and translates errors to SyncError.
    pub(crate) async fn check_response_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("(unable to read response body)"));

        match status {
            StatusCode::UNAUTHORIZED => Err(SyncError::authentication(
                format!("Authentication required for {}: {}", url, error_body),
                Some(401),
            )),
            StatusCode::FORBIDDEN => Err(SyncError::authentication(
                format!("Access forbidden for {}: {}", url, error_body),
                Some(403),
            )),
            StatusCode::NOT_FOUND => Err(SyncError::not_found("endpoint", url.as_str())),
            StatusCode::TOO_MANY_REQUESTS => Err(SyncError::rate_limit(
                format!("Rate limit exceeded for {}", url),
                retry_after,
            )),
            s if s.is_server_error() => Err(SyncError::server(
                format!("Server error from {}: {}", url, error_body),
                status.as_u16(),
            )),
            _ => Err(SyncError::network(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                url,
                error_body
            ))),
        }
    }
}

/// Returns the pull scope for `repository`.
fn pull_scope(repository: &str) -> String {
    format!("repository:{}:pull", repository)
}
