use std::fmt::{self, Display};

use chrono::{Datelike as _, NaiveDate, Weekday};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// ISO 8601 calendar week, addressed by week-year and week number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekId {
    year: i32,
    week: u32,
}

impl WeekId {
    pub fn new(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        WeekId {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn from_parts(year: i32, week: u32) -> Option<Self> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).map(WeekId::new)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn day(&self, weekday: Weekday) -> NaiveDate {
        // `year` and `week` always come from a real date.
        NaiveDate::from_isoywd_opt(self.year, self.week, weekday)
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.day(Weekday::Mon)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.day(Weekday::Sun)
    }

    pub fn next(&self) -> Self {
        WeekId::new(self.first_day() + chrono::Duration::days(7))
    }

    pub fn prev(&self) -> Self {
        WeekId::new(self.first_day() - chrono::Duration::days(7))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        WeekId::new(date) == *self
    }
}

impl From<NaiveDate> for WeekId {
    fn from(date: NaiveDate) -> Self {
        WeekId::new(date)
    }
}

impl Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.week)
    }
}

/// Number of ISO weeks (52 or 53) in the given ISO week-year.
pub fn weeks_in_year(year: i32) -> u32 {
    if NaiveDate::from_isoywd_opt(year, 53, Weekday::Mon).is_some() {
        53
    } else {
        52
    }
}

/// Moves `date` to `weekday` inside the same ISO week.
pub fn with_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    WeekId::new(date).day(weekday)
}

/// Drops repeated ids, keeping the first occurrence of each.
pub fn unique_ids(ids: impl IntoIterator<Item = ObjectId>) -> Vec<ObjectId> {
    let mut unique = Vec::new();
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}
