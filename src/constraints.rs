use crate::bucket::Bucket;
use crate::calendar::WorkCalendar;
use crate::resource::Resource;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("duplicate bucket id {0}")]
    DuplicateBucket(String),
    #[error("duplicate resource id {0}")]
    DuplicateResource(String),
    #[error("bucket {id} ends at {end} which is not after its start {start}")]
    InvertedBucket {
        id: String,
        start: chrono::NaiveTime,
        end: chrono::NaiveTime,
    },
    #[error("{owner} has capacity {value}% (must be between 0 and 100)")]
    CapacityOutOfRange { owner: String, value: u8 },
    #[error("resource {resource} lists unknown bucket {bucket}")]
    UnknownBucket { resource: String, bucket: String },
}

/// Bucket calendar and resource capacities for one solve.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    buckets: Vec<Bucket>,
    resources: Vec<Resource>,
    calendar: WorkCalendar,
    horizon_start: NaiveDateTime,
}

impl ConstraintSet {
    pub fn new(
        buckets: Vec<Bucket>,
        resources: Vec<Resource>,
        calendar: WorkCalendar,
        horizon_start: NaiveDateTime,
    ) -> Self {
        Self {
            buckets,
            resources,
            calendar,
            horizon_start,
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn horizon_start(&self) -> NaiveDateTime {
        self.horizon_start
    }

    pub fn bucket(&self, bucket_id: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.id == bucket_id)
    }

    pub fn resource(&self, resource_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == resource_id)
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        let mut bucket_ids = HashSet::with_capacity(self.buckets.len());
        for bucket in &self.buckets {
            if !bucket_ids.insert(bucket.id.as_str()) {
                return Err(ConstraintError::DuplicateBucket(bucket.id.clone()));
            }
            if bucket.end <= bucket.start {
                return Err(ConstraintError::InvertedBucket {
                    id: bucket.id.clone(),
                    start: bucket.start,
                    end: bucket.end,
                });
            }
            if bucket.capacity_percent > 100 {
                return Err(ConstraintError::CapacityOutOfRange {
                    owner: format!("bucket {}", bucket.id),
                    value: bucket.capacity_percent,
                });
            }
        }

        let mut resource_ids = HashSet::with_capacity(self.resources.len());
        for resource in &self.resources {
            if !resource_ids.insert(resource.id.as_str()) {
                return Err(ConstraintError::DuplicateResource(resource.id.clone()));
            }
            if resource.capacity_percent > 100 {
                return Err(ConstraintError::CapacityOutOfRange {
                    owner: format!("resource {}", resource.id),
                    value: resource.capacity_percent,
                });
            }
            if let Some(unknown) = resource
                .buckets
                .iter()
                .find(|b| !bucket_ids.contains(b.as_str()))
            {
                return Err(ConstraintError::UnknownBucket {
                    resource: resource.id.clone(),
                    bucket: unknown.clone(),
                });
            }
        }
        Ok(())
    }

    /// Minutes `resource` can book in one daily instance of `bucket`.
    /// Disabled buckets, unknown ids and buckets outside the resource's
    /// calendar yield zero.
    pub fn capacity_at(&self, resource_id: &str, bucket_id: &str) -> i64 {
        match (self.resource(resource_id), self.bucket(bucket_id)) {
            (Some(resource), Some(bucket)) => Self::effective_capacity(resource, bucket),
            _ => 0,
        }
    }

    fn effective_capacity(resource: &Resource, bucket: &Bucket) -> i64 {
        if !bucket.enabled || !resource.works_in(&bucket.id) {
            return 0;
        }
        let percent = i64::from(bucket.capacity_percent) * i64::from(resource.capacity_percent);
        bucket.window_minutes() * percent / 10_000
    }

    /// Buckets the resource can book, with their capacity, ordered by start time.
    pub fn usable_buckets(&self, resource: &Resource) -> Vec<(&Bucket, i64)> {
        let mut usable: Vec<(&Bucket, i64)> = self
            .buckets
            .iter()
            .map(|bucket| (bucket, Self::effective_capacity(resource, bucket)))
            .filter(|(_, capacity)| *capacity > 0)
            .collect();
        usable.sort_by(|a, b| a.0.start.cmp(&b.0.start).then_with(|| a.0.id.cmp(&b.0.id)));
        usable
    }

    /// Longest enabled window in the resource's calendar, ignoring capacity.
    pub fn longest_window(&self, resource: &Resource) -> i64 {
        self.buckets
            .iter()
            .filter(|bucket| bucket.enabled && resource.works_in(&bucket.id))
            .map(Bucket::window_minutes)
            .max()
            .unwrap_or(0)
    }
}
