use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cache entry stamped with the moment it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    /// Time since capture; negative ages (clock skew) read as zero
    pub fn age(&self) -> Duration {
        (Utc::now() - self.cached_at).max(Duration::zero())
    }

    /// Coarse relative age for partition listings, e.g. "12 min ago"
    pub fn age_display(&self) -> String {
        let age = self.age();
        match (age.num_days(), age.num_hours(), age.num_minutes()) {
            (0, 0, 0) => "just now".to_string(),
            (0, 0, m) => format!("{} min ago", m),
            (0, 1, _) => "1 hour ago".to_string(),
            (0, h, _) => format!("{} hours ago", h),
            (1, _, _) => "yesterday".to_string(),
            (d, _, _) => format!("{} days ago", d),
        }
    }
}
