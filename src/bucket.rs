use crate::task::BucketId;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A named daily time window. It recurs on every available calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: BucketId,
    pub name: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Share of the window that can be booked, in percent.
    #[serde(default = "full_capacity")]
    pub capacity_percent: u8,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn full_capacity() -> u8 {
    100
}

fn enabled_by_default() -> bool {
    true
}

impl Bucket {
    pub fn new(
        id: impl Into<BucketId>,
        name: impl Into<String>,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start,
            end,
            capacity_percent: full_capacity(),
            enabled: true,
        }
    }

    pub fn with_capacity(mut self, capacity_percent: u8) -> Self {
        self.capacity_percent = capacity_percent;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Window length in minutes; zero for inverted windows.
    pub fn window_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }

    pub fn window_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (date.and_time(self.start), date.and_time(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn window_minutes_spans_start_to_end() {
        let bucket = Bucket::new("am", "Morning", t(9, 0), t(12, 0));
        assert_eq!(bucket.window_minutes(), 180);
        let inverted = Bucket::new("x", "Broken", t(12, 0), t(9, 0));
        assert_eq!(inverted.window_minutes(), 0);
    }

    #[test]
    fn window_on_anchors_to_date() {
        let bucket = Bucket::new("pm", "Afternoon", t(13, 0), t(17, 0));
        let date = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let (start, end) = bucket.window_on(date);
        assert_eq!(start, date.and_time(t(13, 0)));
        assert_eq!(end, date.and_time(t(17, 0)));
    }
}
