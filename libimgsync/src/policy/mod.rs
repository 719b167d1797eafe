//! Tag policies.
//!
//! A policy turns the raw tag list a registry returns into the list the
//! report shows. Version-numbered products are sorted by semantic-version
//! precedence, the two daemon-style sensors drop tags older than the
//! end-of-life cutoff, and everything else passes through untouched.
//!
//! Vendor tags are not strict semantic versions (`7.04.0` has a leading zero,
//! `1.2` has no patch), so parsing is lenient: an optional `v`, one to three
//! numeric components, then optional pre-release and build suffixes.

use crate::error::{Result, SyncError};
use semver::{BuildMetadata, Prerelease, Version};
use std::cmp::Ordering;
use tracing::debug;


/// Default end-of-life cutoff.
pub const DEFAULT_EOL_MINIMUM: &str = "7.04.0";

/// How a product's tag list is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPolicy {
    /// Ascending semantic-version precedence; unparsable tags are skipped.
    SemverSort,
    /// Keep only tags whose version prefix is at or above the cutoff.
    EndOfLife,
    /// Registry order, unchanged.
    PassThrough,
}

/// Applies tag policies with a fixed end-of-life cutoff.
#[derive(Debug, Clone)]
pub struct TagPolicyEngine {
    eol_minimum: Version,
}

impl Default for TagPolicyEngine {
    fn default() -> Self {
        Self {
            eol_minimum: Version::new(7, 4, 0),
        }
    }
}

impl TagPolicyEngine {
    /// Creates an engine with the given end-of-life cutoff.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `eol_minimum` is not a version.
    ///
    /// # Examples
    ///
    /// ```
    /// use libimgsync::policy::{TagPolicy, TagPolicyEngine};
    ///
    /// let engine = TagPolicyEngine::new("7.04.0").unwrap();
    /// let tags = vec!["7.03.0-1".to_string(), "7.04.0-1".to_string()];
    /// assert_eq!(engine.apply(TagPolicy::EndOfLife, tags), vec!["7.04.0-1"]);
    /// ```
    pub fn new(eol_minimum: &str) -> Result<Self> {
        let eol_minimum = parse_version(eol_minimum).ok_or_else(|| {
            SyncError::config(
                format!("end-of-life cutoff '{}' is not a version", eol_minimum),
                None,
            )
        })?;
        Ok(Self { eol_minimum })
    }

    /// Returns the end-of-life cutoff.
    pub fn eol_minimum(&self) -> &Version {
        &self.eol_minimum
    }

    /// Applies `policy` to `tags`.
    pub fn apply(&self, policy: TagPolicy, tags: Vec<String>) -> Vec<String> {
        match policy {
            TagPolicy::SemverSort => semver_sort(tags),
            TagPolicy::EndOfLife => eol_filter(tags, &self.eol_minimum),
            TagPolicy::PassThrough => tags,
        }
    }
}

/// Sorts `tags` by ascending semantic-version precedence.
///
/// Tags that do not parse are dropped. When no tag parses the input is
/// returned unchanged. The sort is stable and yields the original strings.
///
/// # Examples
///
/// ```
/// use libimgsync::policy::semver_sort;
///
/// let tags = vec!["1.2.0".to_string(), "1.10.0".to_string(), "1.2.10".to_string()];
/// assert_eq!(semver_sort(tags), vec!["1.2.0", "1.2.10", "1.10.0"]);
/// ```
pub fn semver_sort(tags: Vec<String>) -> Vec<String> {
    let mut parsed: Vec<(Version, usize)> = Vec::with_capacity(tags.len());
    for (index, tag) in tags.iter().enumerate() {
        match parse_version(tag) {
            Some(version) => parsed.push((version, index)),
            None => debug!(tag = %tag, "skipping tag that is not a semantic version"),
        }
    }

    if parsed.is_empty() {
        return tags;
    }

    parsed.sort_by(|a, b| a.0.cmp_precedence(&b.0));

    let mut slots: Vec<Option<String>> = tags.into_iter().map(Some).collect();
    parsed
        .into_iter()
        .filter_map(|(_, index)| slots.get_mut(index).and_then(Option::take))
        .collect()
}

/// Keeps the tags whose version prefix (text before the first `-`) is at or
/// above `minimum`. Tags whose prefix is not a version are dropped.
pub fn eol_filter(tags: Vec<String>, minimum: &Version) -> Vec<String> {
    tags.into_iter()
        .filter(|tag| {
            let prefix = tag.split_once('-').map_or(tag.as_str(), |(head, _)| head);
            match parse_version(prefix) {
                Some(version) => version.cmp_precedence(minimum) != Ordering::Less,
                None => {
                    debug!(tag = %tag, "dropping tag without a version prefix");
                    false
                }
            }
        })
        .collect()
}

/// Parses a version leniently.
///
/// Accepts an optional leading `v`, one to three dot-separated numeric
/// components (leading zeros allowed, missing components are zero), then an
/// optional `-prerelease` and `+build` suffix.
///
/// # Examples
///
/// ```
/// use libimgsync::policy::parse_version;
/// use semver::Version;
///
/// assert_eq!(parse_version("7.04.0"), Some(Version::new(7, 4, 0)));
/// assert_eq!(parse_version("v1.2"), Some(Version::new(1, 2, 0)));
/// assert_eq!(parse_version("latest"), None);
/// ```
pub fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    let raw = raw.strip_prefix(['v', 'V']).unwrap_or(raw);

    let (rest, build) = match raw.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (raw, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let mut numbers = [0u64; 3];
    let mut count = 0;
    for component in core.split('.') {
        if count == numbers.len()
            || component.is_empty()
            || !component.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        numbers[count] = component.parse().ok()?;
        count += 1;
    }

    let mut version = Version::new(numbers[0], numbers[1], numbers[2]);
    if let Some(pre) = pre {
        version.pre = Prerelease::new(&trim_numeric_identifiers(pre)).ok()?;
    }
    if let Some(build) = build {
        version.build = BuildMetadata::new(build).ok()?;
    }
    Some(version)
}

/// Strips leading zeros from all-digit pre-release identifiers (`01` -> `1`).
fn trim_numeric_identifiers(pre: &str) -> String {
    pre.split('.')
        .map(|ident| {
            if ident.len() > 1 && ident.bytes().all(|b| b.is_ascii_digit()) {
                let trimmed = ident.trim_start_matches('0');
                if trimmed.is_empty() { "0" } else { trimmed }
            } else {
                ident
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
