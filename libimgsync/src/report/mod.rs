//! Report data model and assembly.
//!
//! Field names follow the JSON document consumers already read: `updated`,
//! `duration` and `images` at the root, `dockerAuthConfig` on each image.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(test)]
mod tests;

/// One tag of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub digest: String,
    /// Supported architectures, sorted.
    pub arch: Vec<String>,
}

/// Everything the report knows about one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReport {
    pub name: String,
    pub description: String,
    pub registry: String,
    pub repository: String,
    /// The last tag of the policy output, or empty when there are no tags.
    pub latest: String,
    /// Digest of `latest`.
    pub digest: String,
    pub login: String,
    pub password: String,
    pub docker_auth_config: String,
    pub tags: Vec<TagRecord>,
}

/// The root output of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub updated: DateTime<Utc>,
    /// Elapsed wall-clock time in milliseconds.
    pub duration: i64,
    pub images: Vec<ImageReport>,
}

impl AggregateReport {
    /// Total number of tag records across every image.
    pub fn tag_count(&self) -> usize {
        self.images.iter().map(|image| image.tags.len()).sum()
    }
}

/// Measures one invocation and stamps its result.
#[derive(Debug, Clone, Copy)]
pub struct ReportAssembler {
    started: Instant,
}

impl ReportAssembler {
    /// Starts the clock.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Wraps `images` with the completion time and the elapsed duration.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::report::ReportAssembler;
    ///
    /// let report = ReportAssembler::start().finish(Vec::new());
    /// assert!(report.images.is_empty());
    /// assert!(report.duration >= 0);
    /// ```
    pub fn finish(self, images: Vec<ImageReport>) -> AggregateReport {
        let elapsed = self.started.elapsed().as_millis();
        AggregateReport {
            updated: Utc::now(),
            duration: i64::try_from(elapsed).unwrap_or(i64::MAX),
            images,
        }
    }
}

/// Persists a finished report.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn store(&self, report: &AggregateReport) -> Result<()>;
}
