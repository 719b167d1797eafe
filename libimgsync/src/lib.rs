//! Container image metadata aggregation.
//!
//! libimgsync builds a report of the vendor's container images: for every
//! product in the catalog it obtains registry credentials, lists the
//! repository's tags, filters and orders them by the product's tag policy,
//! and resolves each tag's digest and supported architectures from the
//! registry's manifests.
//!
//! # Quick Start
//!
//! ```no_run
//! use libimgsync::{Config, ImageSync};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env(None)?;
//!     let sync = ImageSync::builder().config(config).build()?;
//!
//!     let report = sync.run(None).await?;
//!     for image in &report.images {
//!         println!("{} {} ({} tags)", image.name, image.latest, image.tags.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Main Types
//!
//! - [`ImageSync`] - one invocation end to end
//! - [`Pipeline`] - the concurrent per-entry state machine
//! - [`ImageRegistry`] / [`RegistryConnector`] - registry seam
//! - [`CredentialBackend`] - tenant id and registry token seam
//! - [`AggregateReport`] - the output document

#![warn(clippy::all)]

/// Returns the libimgsync crate version.
///
/// # Examples
///
/// ```
/// let version = libimgsync::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod credentials;
pub mod digest;
pub mod error;
pub mod falcon;
pub mod fanout;
pub mod oci;
pub mod pipeline;
pub mod policy;
pub mod reference;
pub mod registry;
pub mod report;
pub mod service;

pub use auth::RegistryCredential;
pub use catalog::{CatalogEntry, Cloud, ProductType, catalog};
pub use crate::config::Config;
pub use credentials::{CredentialBackend, CredentialResolver, TokenKind};
pub use digest::Digest;
pub use error::{PipelineStep, Result, SyncError};
pub use pipeline::Pipeline;
pub use policy::{TagPolicy, TagPolicyEngine};
pub use registry::{HttpConnector, ImageRegistry, RegistryConnector};
pub use report::{AggregateReport, ImageReport, ReportStore, TagRecord};
pub use service::{ImageSync, ImageSyncBuilder};
