//! Error types for imgsync
//!
//! This module provides the error taxonomy for every sync operation. Registry
//! transport problems, credential resolution failures and configuration
//! mistakes each get their own variant so callers can tell them apart, and
//! the pipeline wraps any of them in [`SyncError::Entry`] to name the catalog
//! entry and step that failed.

use std::fmt;
use thiserror::Error;


/// Main error type for imgsync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors (401, 403, token exchange)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Resource not found errors (404)
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// Rate limiting errors (429)
    #[error("Rate limit: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Server errors (500, 503)
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Validation errors (malformed reference, unsupported manifest, digest mismatch)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (missing credentials, malformed environment toggles)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Tenant id or registry token could not be obtained
    #[error("Resolution error{}: {message}", product_suffix(.product))]
    Resolution {
        message: String,
        product: Option<String>,
    },

    /// Report persistence failed
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A concurrent task panicked or was cancelled
    #[error("Task error: {message}")]
    Task { message: String },

    /// A catalog entry failed at one pipeline step
    #[error("{product}: failed to {step}: {source}")]
    Entry {
        product: String,
        step: PipelineStep,
        #[source]
        source: Box<SyncError>,
    },
}

fn product_suffix(product: &Option<String>) -> String {
    product
        .as_deref()
        .map(|p| format!(" for {}", p))
        .unwrap_or_default()
}

/// Result type alias for imgsync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// The pipeline step that produced an [`SyncError::Entry`] failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    ResolveCredentials,
    ConnectRegistry,
    ListTags,
    ResolveTag,
    ResolveLatestDigest,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            Self::ResolveCredentials => "resolve registry credentials",
            Self::ConnectRegistry => "connect to registry",
            Self::ListTags => "list repository tags",
            Self::ResolveTag => "resolve tag digest",
            Self::ResolveLatestDigest => "resolve latest digest",
        };
        f.write_str(step)
    }
}

impl SyncError {
    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::error::SyncError;
    ///
    /// let err = SyncError::network("connection refused");
    /// assert!(matches!(err, SyncError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::error::SyncError;
    ///
    /// let err = SyncError::authentication("invalid credentials", Some(401));
    /// assert!(matches!(err, SyncError::Authentication { .. }));
    /// ```
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new not found error.
    pub fn not_found<S: Into<String>>(resource_type: S, name: S) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit<S: Into<String>>(message: S, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new server error.
    pub fn server<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::error::SyncError;
    ///
    /// let err = SyncError::validation("unsupported manifest type");
    /// assert!(matches!(err, SyncError::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::error::SyncError;
    ///
    /// let err = SyncError::config("DEBUG must be a boolean", None);
    /// assert!(matches!(err, SyncError::Config { .. }));
    /// ```
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new resolution error that is not tied to one product type.
    pub fn resolution<S: Into<String>>(message: S) -> Self {
        Self::Resolution {
            message: message.into(),
            product: None,
        }
    }

    /// Creates a new resolution error naming the product type it was resolving for.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::error::SyncError;
    ///
    /// let err = SyncError::resolution_for("falcon-kac", "received empty token");
    /// assert!(err.to_string().contains("falcon-kac"));
    /// ```
    pub fn resolution_for<P: Into<String>, S: Into<String>>(product: P, message: S) -> Self {
        Self::Resolution {
            message: message.into(),
            product: Some(product.into()),
        }
    }

    /// Creates a new storage error with a source error.
    pub fn storage_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new storage error.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new task error.
    pub fn task<S: Into<String>>(message: S) -> Self {
        Self::Task {
            message: message.into(),
        }
    }

    /// Wraps this error with the catalog entry and pipeline step that produced it.
    pub fn at_step<P: Into<String>>(self, product: P, step: PipelineStep) -> Self {
        Self::Entry {
            product: product.into(),
            step,
            source: Box::new(self),
        }
    }
}
