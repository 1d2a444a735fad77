use super::InfeasibleReason;
use super::budget::SolveBudget;
use crate::bucket::Bucket;
use crate::constraints::ConstraintSet;
use crate::resource::Resource;
use crate::task::BucketId;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// One contiguous piece of a placement inside a single bucket window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub bucket_id: BucketId,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Segment {
    fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[derive(Debug)]
pub(crate) enum SlotSearch {
    Found(Vec<Segment>),
    Never(InfeasibleReason),
    HorizonExhausted,
    OutOfBudget,
}

/// Work committed on one resource: busy intervals sorted by start and
/// minutes booked per bucket instance.
#[derive(Debug, Default)]
pub(crate) struct ResourceTimeline {
    busy: Vec<(NaiveDateTime, NaiveDateTime)>,
    booked: HashMap<(BucketId, NaiveDate), i64>,
}

impl ResourceTimeline {
    pub(crate) fn booked(&self, bucket_id: &str, date: NaiveDate) -> i64 {
        self.booked
            .get(&(bucket_id.to_string(), date))
            .copied()
            .unwrap_or(0)
    }

    /// Free intervals inside `[from, to)`.
    fn free_gaps(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let mut gaps = Vec::new();
        let mut cursor = from;
        for &(start, end) in &self.busy {
            if cursor >= to {
                break;
            }
            if end <= cursor {
                continue;
            }
            if start >= to {
                break;
            }
            if start > cursor {
                gaps.push((cursor, start));
            }
            cursor = cursor.max(end);
        }
        if cursor < to {
            gaps.push((cursor, to));
        }
        gaps
    }

    pub(crate) fn commit(&mut self, segment: &Segment) {
        let position = self
            .busy
            .partition_point(|(start, _)| *start < segment.start);
        self.busy.insert(position, (segment.start, segment.end));
        *self
            .booked
            .entry((segment.bucket_id.clone(), segment.date))
            .or_insert(0) += segment.minutes();
    }
}

/// Searches one resource's bucket calendar for the earliest slot.
pub(crate) struct SlotFinder<'a> {
    constraints: &'a ConstraintSet,
    horizon_end: NaiveDate,
    allow_split: bool,
}

impl<'a> SlotFinder<'a> {
    pub(crate) fn new(constraints: &'a ConstraintSet, horizon_end: NaiveDate, allow_split: bool) -> Self {
        Self {
            constraints,
            horizon_end,
            allow_split,
        }
    }

    /// Reason the task can never fit on `resource`, regardless of bookings.
    fn structural_reason(&self, resource: &Resource, duration: i64) -> Option<InfeasibleReason> {
        let usable = self.constraints.usable_buckets(resource);
        let longest_window = self.constraints.longest_window(resource);
        let largest_capacity = usable.iter().map(|(_, c)| *c).max().unwrap_or(0);

        if self.allow_split {
            if largest_capacity > 0 {
                None
            } else if longest_window == 0 {
                Some(InfeasibleReason::NoEnabledBucket)
            } else {
                Some(InfeasibleReason::InsufficientCapacity)
            }
        } else if longest_window < duration {
            Some(InfeasibleReason::NoEnabledBucket)
        } else if largest_capacity < duration {
            Some(InfeasibleReason::InsufficientCapacity)
        } else {
            None
        }
    }

    pub(crate) fn earliest_slot(
        &self,
        resource: &Resource,
        timeline: &ResourceTimeline,
        duration: i64,
        ready: NaiveDateTime,
        budget: &mut SolveBudget,
    ) -> SlotSearch {
        if let Some(reason) = self.structural_reason(resource, duration) {
            return SlotSearch::Never(reason);
        }
        if self.allow_split {
            self.split_slot(resource, timeline, duration, ready, budget)
        } else {
            self.whole_slot(resource, timeline, duration, ready, budget)
        }
    }

    fn whole_slot(
        &self,
        resource: &Resource,
        timeline: &ResourceTimeline,
        duration: i64,
        ready: NaiveDateTime,
        budget: &mut SolveBudget,
    ) -> SlotSearch {
        let usable = self.constraints.usable_buckets(resource);
        let dates = self
            .constraints
            .calendar()
            .available_days_in_range(ready.date(), self.horizon_end);

        for date in dates {
            let mut best: Option<Segment> = None;
            for (bucket, capacity) in &usable {
                if !budget.tick() {
                    return SlotSearch::OutOfBudget;
                }
                let (window_start, window_end) = bucket.window_on(date);
                if window_end <= ready {
                    continue;
                }
                if capacity - timeline.booked(&bucket.id, date) < duration {
                    continue;
                }
                let from = window_start.max(ready);
                let fit = timeline
                    .free_gaps(from, window_end)
                    .into_iter()
                    .find(|(start, end)| (*end - *start).num_minutes() >= duration);
                if let Some((start, _)) = fit {
                    let candidate = Segment {
                        bucket_id: bucket.id.clone(),
                        date,
                        start,
                        end: start + Duration::minutes(duration),
                    };
                    if best.as_ref().is_none_or(|b| candidate.start < b.start) {
                        best = Some(candidate);
                    }
                }
            }
            if let Some(segment) = best {
                return SlotSearch::Found(vec![segment]);
            }
        }
        SlotSearch::HorizonExhausted
    }

    /// Dated bucket windows still open at `ready`, in time order.
    fn instances<'b>(
        &self,
        usable: &[(&'b Bucket, i64)],
        ready: NaiveDateTime,
    ) -> Vec<BucketInstance<'b>> {
        let mut instances: Vec<BucketInstance<'b>> = self
            .constraints
            .calendar()
            .available_days_in_range(ready.date(), self.horizon_end)
            .into_iter()
            .flat_map(move |date| {
                usable.iter().map(move |&(bucket, capacity)| {
                    let (start, end) = bucket.window_on(date);
                    BucketInstance {
                        bucket,
                        capacity,
                        date,
                        start,
                        end,
                    }
                })
            })
            .filter(|instance| instance.end > ready)
            .collect();
        instances.sort_by(|a, b| {
            (a.start, a.end, &a.bucket.id).cmp(&(b.start, b.end, &b.bucket.id))
        });
        instances
    }

    /// A task that fits one window is placed whole. Otherwise it takes the
    /// free tail of a window and continues at the start of each following
    /// window, so a split task is never interrupted by other work.
    fn split_slot(
        &self,
        resource: &Resource,
        timeline: &ResourceTimeline,
        duration: i64,
        ready: NaiveDateTime,
        budget: &mut SolveBudget,
    ) -> SlotSearch {
        let usable = self.constraints.usable_buckets(resource);
        let instances = self.instances(&usable, ready);

        for (index, head) in instances.iter().enumerate() {
            if !budget.tick() {
                return SlotSearch::OutOfBudget;
            }
            let capacity_left = head.capacity_left(timeline);
            if capacity_left <= 0 {
                continue;
            }
            let gaps = timeline.free_gaps(head.start.max(ready), head.end);
            if capacity_left >= duration {
                let whole = gaps
                    .iter()
                    .find(|(start, end)| (*end - *start).num_minutes() >= duration);
                if let Some(&(start, _)) = whole {
                    return SlotSearch::Found(vec![head.segment(start, duration)]);
                }
            }

            let Some(&(tail_start, tail_end)) = gaps.last() else {
                continue;
            };
            let take = (tail_end - tail_start).num_minutes().min(capacity_left);
            if tail_end != head.end || take >= duration {
                continue;
            }
            let first = head.segment(head.end - Duration::minutes(take), take);
            let rest = Self::extend_chain(
                &instances[index + 1..],
                timeline,
                duration - take,
                head.end,
                budget,
            );
            match rest {
                Chain::Complete(rest) => {
                    let mut segments = vec![first];
                    segments.extend(rest);
                    return SlotSearch::Found(segments);
                }
                Chain::Broken => continue,
                Chain::OutOfBudget => return SlotSearch::OutOfBudget,
            }
        }
        SlotSearch::HorizonExhausted
    }

    /// Continues a split at the start of the windows after `cursor`. Every
    /// piece but the last must fill its window up to the window end.
    fn extend_chain(
        following: &[BucketInstance<'_>],
        timeline: &ResourceTimeline,
        mut remaining: i64,
        mut cursor: NaiveDateTime,
        budget: &mut SolveBudget,
    ) -> Chain {
        let mut segments = Vec::new();
        for instance in following {
            if instance.start < cursor {
                continue;
            }
            if !budget.tick() {
                return Chain::OutOfBudget;
            }
            let free_from_start = timeline
                .free_gaps(instance.start, instance.end)
                .first()
                .copied()
                .filter(|(start, _)| *start == instance.start);
            let Some((_, free_end)) = free_from_start else {
                return Chain::Broken;
            };
            let take = (free_end - instance.start)
                .num_minutes()
                .min(instance.capacity_left(timeline))
                .min(remaining);
            if take <= 0 {
                return Chain::Broken;
            }
            segments.push(instance.segment(instance.start, take));
            remaining -= take;
            if remaining == 0 {
                return Chain::Complete(segments);
            }
            if instance.start + Duration::minutes(take) != instance.end {
                return Chain::Broken;
            }
            cursor = instance.end;
        }
        Chain::Broken
    }
}

/// One bucket window on one date.
struct BucketInstance<'b> {
    bucket: &'b Bucket,
    capacity: i64,
    date: NaiveDate,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl BucketInstance<'_> {
    fn capacity_left(&self, timeline: &ResourceTimeline) -> i64 {
        self.capacity - timeline.booked(&self.bucket.id, self.date)
    }

    fn segment(&self, start: NaiveDateTime, minutes: i64) -> Segment {
        Segment {
            bucket_id: self.bucket.id.clone(),
            date: self.date,
            start,
            end: start + Duration::minutes(minutes),
        }
    }
}

enum Chain {
    Complete(Vec<Segment>),
    Broken,
    OutOfBudget,
}
