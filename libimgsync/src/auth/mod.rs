//! Authentication handling for the vendor registry.
//!
//! This module holds the per-entry registry credential, renders it into the
//! header values and pull-secret blobs consumers need, and parses the
//! `WWW-Authenticate` challenges registries answer with when a bearer token
//! has to be exchanged first.

use crate::error::{Result, SyncError};
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use std::fmt;

#[cfg(test)]
mod tests;

/// A `{username, password}` pair valid for one invocation.
///
/// Different product types may authenticate differently, so each catalog
/// entry resolves its own credential. It is never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredential {
    username: String,
    password: String,
}

impl RegistryCredential {
    /// Creates a credential from a username and password.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::auth::RegistryCredential;
    ///
    /// let cred = RegistryCredential::new("fc-abcdef", "token");
    /// assert_eq!(cred.username(), "fc-abcdef");
    /// ```
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the registry login.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the registry password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the HTTP Basic `Authorization` header value for this credential.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::auth::RegistryCredential;
    ///
    /// let cred = RegistryCredential::new("user", "pass");
    /// assert_eq!(cred.basic_header_value(), "Basic dXNlcjpwYXNz");
    /// ```
    pub fn basic_header_value(&self) -> String {
        format!("Basic {}", self.encoded_pair())
    }

    /// Builds the base64-encoded docker config document for `registry`.
    ///
    /// The decoded document has the shape
    /// `{"auths":{"<registry>":{"auth":"<base64(user:pass)>"}}}` and can be
    /// used as-is for a Kubernetes `.dockerconfigjson` pull secret. No network
    /// call is made.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::auth::RegistryCredential;
    ///
    /// let cred = RegistryCredential::new("user", "pass");
    /// let blob = cred.docker_auth_config("registry.example.com");
    /// assert!(!blob.is_empty());
    /// ```
    pub fn docker_auth_config(&self, registry: &str) -> String {
        let document = json!({
            "auths": {
                registry: {
                    "auth": self.encoded_pair(),
                }
            }
        });
        general_purpose::STANDARD.encode(document.to_string())
    }

    fn encoded_pair(&self) -> String {
        general_purpose::STANDARD.encode(format!("{}:{}", self.username, self.password))
    }
}

impl fmt::Debug for RegistryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Information parsed from a WWW-Authenticate header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// The authentication scheme (e.g., "Bearer")
    pub scheme: String,

    /// The authentication realm
    pub realm: String,

    /// The service identifier
    pub service: Option<String>,

    /// The scope being requested
    pub scope: Option<String>,
}

impl AuthChallenge {
    /// Parses a WWW-Authenticate header value.
    ///
    /// Example header: `Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:alpine:pull"`
    ///
    /// Quoted values may contain commas (`scope="repository:app:pull,push"`).
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::auth::AuthChallenge;
    ///
    /// let header = r#"Bearer realm="https://auth.example.com/token",service="registry""#;
    /// let challenge = AuthChallenge::parse(header).unwrap();
    /// assert_eq!(challenge.scheme, "Bearer");
    /// assert!(challenge.is_bearer());
    /// ```
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();

        let (scheme, params) = header
            .split_once(' ')
            .ok_or_else(|| SyncError::validation("Invalid WWW-Authenticate header format"))?;

        let mut realm = None;
        let mut service = None;
        let mut scope = None;

        for param in split_params(params) {
            if let Some((key, value)) = param.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "realm" => realm = Some(value.to_string()),
                    "service" => service = Some(value.to_string()),
                    "scope" => scope = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        let realm = realm.ok_or_else(|| {
            SyncError::validation("WWW-Authenticate header missing required 'realm' parameter")
        })?;

        Ok(Self {
            scheme: scheme.to_string(),
            realm,
            service,
            scope,
        })
    }

    /// Returns true if the registry asks for a bearer token exchange.
    pub fn is_bearer(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("bearer")
    }
}

/// Splits challenge parameters on commas that are outside quoted values.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in params.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(params[start..].trim());

    parts.into_iter().filter(|p| !p.is_empty()).collect()
}
