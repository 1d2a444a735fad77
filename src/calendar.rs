use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn week() -> impl Iterator<Item = Weekday> {
    std::iter::successors(Some(Weekday::Mon), |day| Some(day.succ())).take(7)
}

fn slot(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

/// Which dates carry bucket windows: working weekdays minus holidays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkCalendar {
    /// Indexed by days from Monday.
    working: [bool; 7],
    holidays: BTreeSet<NaiveDate>,
}

/// Serialized calendar: working weekdays Monday first, holidays ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    #[serde(default)]
    holidays: Vec<NaiveDate>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::weekdays()
    }
}

impl WorkCalendar {
    /// Monday to Friday, no holidays.
    pub fn weekdays() -> Self {
        Self {
            working: [true, true, true, true, true, false, false],
            holidays: BTreeSet::new(),
        }
    }

    pub fn every_day() -> Self {
        Self {
            working: [true; 7],
            holidays: BTreeSet::new(),
        }
    }

    /// An empty working-day list yields a calendar with no available dates;
    /// solves against it run out of horizon instead of failing here.
    pub fn custom<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut working = [false; 7];
        for day in working_days {
            working[slot(day)] = true;
        }
        Self {
            working,
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn from_config(config: &WorkCalendarConfig) -> Self {
        Self::custom(
            config.working_days.iter().copied(),
            config.holidays.iter().copied(),
        )
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig {
            working_days: self.working_weekdays().collect(),
            holidays: self.holidays.iter().copied().collect(),
        }
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        self.holidays.extend(dates.iter().copied());
    }

    /// Replaces the working week, e.g. Monday to Saturday.
    pub fn set_working_days(&mut self, days: &[Weekday]) {
        self.working = [false; 7];
        for &day in days {
            self.working[slot(day)] = true;
        }
    }

    pub fn has_working_days(&self) -> bool {
        self.working.contains(&true)
    }

    fn working_weekdays(&self) -> impl Iterator<Item = Weekday> + '_ {
        week().filter(|&day| self.working[slot(day)])
    }

    pub fn is_available(&self, date: NaiveDate) -> bool {
        self.working[slot(date.weekday())] && !self.holidays.contains(&date)
    }

    /// Available dates in `[start, end]`, ascending.
    pub fn available_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if !self.has_working_days() {
            return Vec::new();
        }
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| self.is_available(*date))
            .collect()
    }

    pub fn count_available_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        self.available_days_in_range(start, end).len() as i64
    }
}

impl WorkCalendarConfig {
    /// Duplicates are dropped and both lists are sorted.
    pub fn new<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        WorkCalendar::custom(working_days, holidays).to_config()
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendar::weekdays().to_config()
    }
}
