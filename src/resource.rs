use crate::task::{BucketId, ResourceId};
use serde::{Deserialize, Serialize};

/// A person, crew or machine that tasks are assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    #[serde(default)]
    pub name: String,
    /// Share of every bucket window the resource is available for, in percent.
    #[serde(default = "full_capacity")]
    pub capacity_percent: u8,
    /// Buckets this resource works in. Empty means every bucket.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buckets: Vec<BucketId>,
}

fn full_capacity() -> u8 {
    100
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity_percent: full_capacity(),
            buckets: Vec::new(),
        }
    }

    pub fn with_capacity(mut self, capacity_percent: u8) -> Self {
        self.capacity_percent = capacity_percent;
        self
    }

    pub fn with_buckets<I, S>(mut self, buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<BucketId>,
    {
        self.buckets = buckets.into_iter().map(Into::into).collect();
        self
    }

    pub fn works_in(&self, bucket_id: &str) -> bool {
        self.buckets.is_empty() || self.buckets.iter().any(|b| b == bucket_id)
    }
}
