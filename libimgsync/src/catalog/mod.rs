//! The compiled product catalog.
//!
//! Every product type the report covers is one row of a static table that
//! carries, as data, the registry path, the credential call used to obtain a
//! registry password, the username prefix, and the tag policy. The row order
//! is the report order.

use crate::credentials::TokenKind;
use crate::error::{Result, SyncError};
use crate::policy::TagPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;


/// A vendor cloud region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cloud {
    #[default]
    #[serde(rename = "us-1")]
    Us1,
    #[serde(rename = "us-2")]
    Us2,
    #[serde(rename = "eu-1")]
    Eu1,
    #[serde(rename = "us-gov-1")]
    UsGov1,
    #[serde(rename = "us-gov-2")]
    UsGov2,
}

impl Cloud {
    /// Every supported region.
    pub const ALL: [Cloud; 5] = [
        Cloud::Us1,
        Cloud::Us2,
        Cloud::Eu1,
        Cloud::UsGov1,
        Cloud::UsGov2,
    ];

    /// Returns the region identifier, e.g. `us-1`.
    pub fn as_str(self) -> &'static str {
        match self {
            Cloud::Us1 => "us-1",
            Cloud::Us2 => "us-2",
            Cloud::Eu1 => "eu-1",
            Cloud::UsGov1 => "us-gov-1",
            Cloud::UsGov2 => "us-gov-2",
        }
    }

    /// Returns the container registry host serving this region.
    pub fn registry_host(self) -> &'static str {
        match self {
            Cloud::Us1 | Cloud::Us2 | Cloud::Eu1 => "registry.crowdstrike.com",
            Cloud::UsGov1 => "registry.laggar.gcw.crowdstrike.com",
            Cloud::UsGov2 => "registry.us-gov-2.crowdstrike.mil",
        }
    }

    /// Returns the region segment used inside repository paths.
    pub fn path_segment(self) -> &'static str {
        match self {
            Cloud::Us1 => "us-1",
            Cloud::Us2 => "us-2",
            Cloud::Eu1 => "eu-1",
            Cloud::UsGov1 => "gov1",
            Cloud::UsGov2 => "gov2",
        }
    }

    /// Returns the vendor API base URL for this region.
    pub fn api_base_url(self) -> &'static str {
        match self {
            Cloud::Us1 => "https://api.crowdstrike.com",
            Cloud::Us2 => "https://api.us-2.crowdstrike.com",
            Cloud::Eu1 => "https://api.eu-1.crowdstrike.com",
            Cloud::UsGov1 => "https://api.laggar.gcw.crowdstrike.com",
            Cloud::UsGov2 => "https://api.us-gov-2.crowdstrike.mil",
        }
    }
}

impl FromStr for Cloud {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Cloud::ALL
            .into_iter()
            .find(|cloud| cloud.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                SyncError::config(
                    format!(
                        "unknown cloud region '{}', expected one of us-1, us-2, eu-1, us-gov-1, us-gov-2",
                        wanted
                    ),
                    None,
                )
            })
    }
}

impl fmt::Display for Cloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of product types the report covers.
///
/// Discriminants are the row index in the catalog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductType {
    FalconSensor = 0,
    FalconContainer = 1,
    FalconKac = 2,
    FalconImageAnalyzer = 3,
    FalconJobController = 4,
    FalconRegistryAssessmentExecutor = 5,
    FalconSnapshot = 6,
    Fcs = 7,
}

/// One row of the catalog table.
#[derive(Debug)]
pub struct ProductInfo {
    pub product: ProductType,
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// First path component under the registry host.
    pub image_dir: &'static str,
    /// Last path component of the repository.
    pub image_name: &'static str,
    pub token: TokenKind,
    pub login_prefix: &'static str,
    pub policy: TagPolicy,
}

static PRODUCTS: [ProductInfo; 8] = [
    ProductInfo {
        product: ProductType::FalconSensor,
        id: "falcon-sensor",
        name: "Falcon Linux Sensor",
        description: "The Node Sensor is a container image that can be deployed as a daemonset to monitor the container runtime and the containers running on the host.",
        image_dir: "falcon-sensor",
        image_name: "falcon-sensor",
        token: TokenKind::Default,
        login_prefix: "fc",
        policy: TagPolicy::EndOfLife,
    },
    ProductInfo {
        product: ProductType::FalconContainer,
        id: "falcon-container",
        name: "Falcon Container Sensor",
        description: "The Falcon Container Sensor is a container image that can be deployed as a sidecar to monitor pods and containers.",
        image_dir: "falcon-container",
        image_name: "falcon-sensor",
        token: TokenKind::Default,
        login_prefix: "fc",
        policy: TagPolicy::EndOfLife,
    },
    ProductInfo {
        product: ProductType::FalconKac,
        id: "falcon-kac",
        name: "Falcon Kubernetes Admission Controller",
        description: "The Kubernetes Agentless Container Sensor is a container image that can be deployed as a Kubernetes Admission Controller to monitor the container runtime and the containers running in a Kubernetes cluster.",
        image_dir: "falcon-kac",
        image_name: "falcon-kac",
        token: TokenKind::Default,
        login_prefix: "fc",
        policy: TagPolicy::PassThrough,
    },
    ProductInfo {
        product: ProductType::FalconImageAnalyzer,
        id: "falcon-imageanalyzer",
        name: "Falcon Image Analyzer",
        description: "The Image Sensor is a container image that can be deployed to scan container images for vulnerabilities and misconfigurations.",
        image_dir: "falcon-imageanalyzer",
        image_name: "falcon-imageanalyzer",
        token: TokenKind::Default,
        login_prefix: "fc",
        policy: TagPolicy::SemverSort,
    },
    ProductInfo {
        product: ProductType::FalconJobController,
        id: "falcon-jobcontroller",
        name: "Falcon Self-Hosted Registry Assessment Job Controller",
        description: "The Job Controller schedules and tracks registry assessment jobs for self-hosted container registries.",
        image_dir: "falcon-jobcontroller",
        image_name: "falcon-jobcontroller",
        token: TokenKind::Default,
        login_prefix: "fc",
        policy: TagPolicy::SemverSort,
    },
    ProductInfo {
        product: ProductType::FalconRegistryAssessmentExecutor,
        id: "falcon-registryassessmentexecutor",
        name: "Falcon Self-Hosted Registry Assessment Executor",
        description: "The Registry Assessment Executor scans images stored in self-hosted container registries on behalf of the Job Controller.",
        image_dir: "falcon-registryassessmentexecutor",
        image_name: "falcon-registryassessmentexecutor",
        token: TokenKind::Default,
        login_prefix: "fc",
        policy: TagPolicy::SemverSort,
    },
    ProductInfo {
        product: ProductType::FalconSnapshot,
        id: "falcon-snapshot",
        name: "Falcon Snapshot Scanner",
        description: "The Snapshot Scanner is a container image that scans cloud workload disk snapshots for vulnerabilities.",
        image_dir: "falcon-snapshot",
        image_name: "cs-snapshotscanner",
        token: TokenKind::Snapshot,
        login_prefix: "fs",
        policy: TagPolicy::SemverSort,
    },
    ProductInfo {
        product: ProductType::Fcs,
        id: "fcs",
        name: "Falcon Cloud Security CLI",
        description: "The Falcon Cloud Security CLI is a container image that scans images and infrastructure-as-code from CI/CD pipelines.",
        image_dir: "fcs",
        image_name: "cs-fcs",
        token: TokenKind::FcsCli,
        login_prefix: "fh",
        policy: TagPolicy::SemverSort,
    },
];

impl ProductType {
    /// Returns the catalog row for this product type.
    pub fn info(self) -> &'static ProductInfo {
        &PRODUCTS[self as usize]
    }

    /// Returns the product identifier, e.g. `falcon-kac`.
    pub fn as_str(self) -> &'static str {
        self.info().id
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog row resolved against one cloud region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    product: ProductType,
    registry: String,
    repository: String,
}

impl CatalogEntry {
    /// Resolves `product` against `cloud`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::catalog::{CatalogEntry, Cloud, ProductType};
    ///
    /// let entry = CatalogEntry::new(ProductType::FalconKac, Cloud::UsGov1);
    /// assert_eq!(entry.registry(), "registry.laggar.gcw.crowdstrike.com");
    /// assert_eq!(
    ///     entry.repository(),
    ///     "registry.laggar.gcw.crowdstrike.com/falcon-kac/gov1/release/falcon-kac"
    /// );
    /// ```
    pub fn new(product: ProductType, cloud: Cloud) -> Self {
        let info = product.info();
        let registry = cloud.registry_host().to_string();
        let repository = format!(
            "{}/{}/{}/release/{}",
            registry,
            info.image_dir,
            cloud.path_segment(),
            info.image_name
        );
        Self {
            product,
            registry,
            repository,
        }
    }

    pub fn product(&self) -> ProductType {
        self.product
    }

    /// Registry host, e.g. `registry.crowdstrike.com`.
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Full repository name including the registry host.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn name(&self) -> &'static str {
        self.product.info().name
    }

    pub fn description(&self) -> &'static str {
        self.product.info().description
    }

    pub fn token_kind(&self) -> TokenKind {
        self.product.info().token
    }

    pub fn login_prefix(&self) -> &'static str {
        self.product.info().login_prefix
    }

    pub fn tag_policy(&self) -> TagPolicy {
        self.product.info().policy
    }
}

/// Returns the full catalog for `cloud`, in report order.
pub fn catalog(cloud: Cloud) -> Vec<CatalogEntry> {
    PRODUCTS
        .iter()
        .map(|info| CatalogEntry::new(info.product, cloud))
        .collect()
}
