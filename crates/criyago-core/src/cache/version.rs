//! Versioned partition naming.
//!
//! Partition names embed the app name, the partition kind and a version
//! tag: `criyago-static-v2.0`, `criyago-dynamic-v2.0`. Tags compare by their
//! numeric components, so `v2.10` is newer than `v2.9`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Static,
    Dynamic,
}

impl PartitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Dynamic => "dynamic",
        }
    }
}

/// How a partition name relates to the running version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionAge {
    Current(PartitionKind),
    Older,
    Newer,
    /// Same app and version but not a recognised kind, e.g. the legacy
    /// single-cache layout.
    Unrecognized,
    /// Not one of ours, or an unparseable tag
    Foreign,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheVersion {
    pub app: String,
    pub tag: String,
}

impl CacheVersion {
    pub fn new(app: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            tag: tag.into(),
        }
    }

    pub fn partition_name(&self, kind: PartitionKind) -> String {
        format!("{}-{}-{}", self.app, kind.as_str(), self.tag)
    }

    pub fn static_partition(&self) -> String {
        self.partition_name(PartitionKind::Static)
    }

    pub fn dynamic_partition(&self) -> String {
        self.partition_name(PartitionKind::Dynamic)
    }

    /// True only for this version's static or dynamic partition
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_partition() || name == self.dynamic_partition()
    }

    pub fn classify(&self, name: &str) -> PartitionAge {
        if name == self.static_partition() {
            return PartitionAge::Current(PartitionKind::Static);
        }
        if name == self.dynamic_partition() {
            return PartitionAge::Current(PartitionKind::Dynamic);
        }

        let rest = match name
            .strip_prefix(self.app.as_str())
            .and_then(|r| r.strip_prefix('-'))
        {
            Some(rest) => rest,
            None => return PartitionAge::Foreign,
        };

        // Either `<kind>-<tag>` or a bare `<tag>` from older layouts
        let tag = ["static-", "dynamic-"]
            .iter()
            .find_map(|prefix| rest.strip_prefix(*prefix))
            .unwrap_or(rest);

        match compare_tags(tag, &self.tag) {
            Some(Ordering::Less) => PartitionAge::Older,
            Some(Ordering::Greater) => PartitionAge::Newer,
            Some(Ordering::Equal) => PartitionAge::Unrecognized,
            None => PartitionAge::Foreign,
        }
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.app, self.tag)
    }
}

/// Numeric components of a tag like `v2.0` or `3.1.4`; trailing zeros are
/// dropped so `v2` and `v2.0` compare equal.
fn tag_components(tag: &str) -> Option<Vec<u64>> {
    let digits = tag.strip_prefix(|c: char| c == 'v' || c == 'V').unwrap_or(tag);
    let mut parts = digits
        .split('.')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    while parts.len() > 1 && parts.last() == Some(&0) {
        parts.pop();
    }
    Some(parts)
}

/// Compare two version tags; `None` when either does not parse
pub fn compare_tags(a: &str, b: &str) -> Option<Ordering> {
    Some(tag_components(a)?.cmp(&tag_components(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v2() -> CacheVersion {
        CacheVersion::new("criyago", "v2.0")
    }

    #[test]
    fn test_partition_names() {
        assert_eq!(v2().static_partition(), "criyago-static-v2.0");
        assert_eq!(v2().dynamic_partition(), "criyago-dynamic-v2.0");
        assert!(v2().is_current("criyago-dynamic-v2.0"));
        assert!(!v2().is_current("criyago-v2.0"));
    }

    #[test]
    fn test_compare_tags_numerically() {
        assert_eq!(compare_tags("v2.10", "v2.9"), Some(Ordering::Greater));
        assert_eq!(compare_tags("v2", "v2.0"), Some(Ordering::Equal));
        assert_eq!(compare_tags("v1.9.9", "v2.0"), Some(Ordering::Less));
        assert_eq!(compare_tags("beta", "v2.0"), None);
    }

    #[test]
    fn test_classify() {
        let version = v2();
        assert_eq!(
            version.classify("criyago-static-v2.0"),
            PartitionAge::Current(PartitionKind::Static)
        );
        assert_eq!(version.classify("criyago-static-v1.0"), PartitionAge::Older);
        assert_eq!(version.classify("criyago-dynamic-v3.1"), PartitionAge::Newer);
        assert_eq!(version.classify("criyago-v2.0"), PartitionAge::Unrecognized);
        assert_eq!(version.classify("criyago-v1.5"), PartitionAge::Older);
        assert_eq!(version.classify("workbox-precache"), PartitionAge::Foreign);
    }
}
