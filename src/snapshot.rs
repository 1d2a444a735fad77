use crate::report::ScheduleReport;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// A completed solve as seen by readers.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedSchedule {
    pub generation: u64,
    /// Revision of the input the report was solved from.
    pub input_revision: u64,
    pub solved_at: DateTime<Utc>,
    pub report: ScheduleReport,
}

/// Holds the latest published schedule. Publishing swaps in a whole new
/// snapshot, so readers only ever observe completed solves.
#[derive(Debug, Default)]
pub struct SnapshotBoard {
    latest: RwLock<Option<Arc<PublishedSchedule>>>,
}

impl SnapshotBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes unconditionally, keeping the current input revision.
    pub fn publish(&self, report: ScheduleReport) -> Arc<PublishedSchedule> {
        let mut latest = self.latest.write();
        let input_revision = latest.as_ref().map_or(0, |s| s.input_revision);
        Self::replace(&mut latest, report, input_revision)
    }

    /// Publishes a report solved from `input_revision` unless a report of a
    /// newer revision is already on the board.
    pub fn publish_revision(
        &self,
        report: ScheduleReport,
        input_revision: u64,
    ) -> Option<Arc<PublishedSchedule>> {
        let mut latest = self.latest.write();
        if latest
            .as_ref()
            .is_some_and(|s| s.input_revision > input_revision)
        {
            return None;
        }
        Some(Self::replace(&mut latest, report, input_revision))
    }

    fn replace(
        latest: &mut Option<Arc<PublishedSchedule>>,
        report: ScheduleReport,
        input_revision: u64,
    ) -> Arc<PublishedSchedule> {
        let generation = latest.as_ref().map_or(1, |s| s.generation + 1);
        let snapshot = Arc::new(PublishedSchedule {
            generation,
            input_revision,
            solved_at: Utc::now(),
            report,
        });
        *latest = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub fn latest(&self) -> Option<Arc<PublishedSchedule>> {
        self.latest.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.latest.read().as_ref().map_or(0, |s| s.generation)
    }

    pub fn clear(&self) {
        *self.latest.write() = None;
    }
}
