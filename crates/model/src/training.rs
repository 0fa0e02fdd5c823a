use std::{
    fmt::{self, Display},
    str::FromStr,
};

use chrono::{Datelike as _, NaiveDate, NaiveTime, Weekday};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use strum::{Display as StrumDisplay, EnumString};

use crate::{
    errors::ValidationError,
    ids::{unique_ids, WeekId},
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingType {
    Yoga,
    Boost,
    Hiit,
    Personal,
}

impl TrainingType {
    /// Attendance of these trainings is paid with counted passes.
    pub fn is_counted(&self) -> bool {
        matches!(self, TrainingType::Yoga | TrainingType::Personal)
    }

    pub fn is_block(&self) -> bool {
        matches!(self, TrainingType::Hiit | TrainingType::Boost)
    }
}

/// Wall clock time in "hh:mm" form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<ClockTime> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(ClockTime)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(ClockTime)
            .map_err(|_| ValidationError::InvalidTime(s.to_owned()))
    }
}

#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde_as(as = "DisplayFromStr")]
    pub start: ClockTime,
    #[serde_as(as = "DisplayFromStr")]
    pub end: ClockTime,
}

impl TimeRange {
    pub fn new(start: ClockTime, end: ClockTime) -> Result<TimeRange, ValidationError> {
        if start >= end {
            return Err(ValidationError::EmptyTimeRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(TimeRange { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<TimeRange, ValidationError> {
        TimeRange::new(start.parse()?, end.parse()?)
    }
}

/// Recurring weekly template. Sessions are materialized from it per ISO week.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Training {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub tp: TrainingType,
    /// First occurrence. Its weekday is the recurrence weekday.
    pub runs_from: NaiveDate,
    pub time: TimeRange,
    #[serde(default)]
    pub client_ids: Vec<ObjectId>,
}

impl Training {
    pub fn new(
        tp: TrainingType,
        runs_from: NaiveDate,
        time: TimeRange,
        client_ids: Vec<ObjectId>,
    ) -> Training {
        Training {
            id: ObjectId::new(),
            tp,
            runs_from,
            time,
            client_ids: unique_ids(client_ids),
        }
    }

    pub fn weekday(&self) -> Weekday {
        self.runs_from.weekday()
    }

    pub fn start_week(&self) -> WeekId {
        WeekId::new(self.runs_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_time_format() {
        let time: ClockTime = "07:05".parse().unwrap();
        assert_eq!(time, ClockTime::new(7, 5).unwrap());
        assert_eq!(time.to_string(), "07:05");
        assert!("7.05".parse::<ClockTime>().is_err());
        assert!("25:00".parse::<ClockTime>().is_err());
    }

    #[test]
    fn test_time_range_rejects_empty() {
        assert!(TimeRange::parse("18:00", "19:00").is_ok());
        assert_eq!(
            TimeRange::parse("19:00", "18:00"),
            Err(ValidationError::EmptyTimeRange {
                start: "19:00".to_owned(),
                end: "18:00".to_owned()
            })
        );
    }

    #[test]
    fn test_training_json_shape() {
        let training = Training::new(
            TrainingType::Hiit,
            "2024-03-13".parse().unwrap(),
            TimeRange::parse("18:00", "19:00").unwrap(),
            vec![],
        );
        let json = serde_json::to_value(&training).unwrap();
        assert_eq!(json["type"], "HIIT");
        assert_eq!(json["runs_from"], "2024-03-13");
        assert_eq!(json["time"]["start"], "18:00");
        assert_eq!(json["time"]["end"], "19:00");
        assert_eq!(training.weekday(), Weekday::Wed);
    }

    #[test]
    fn test_training_type_strings() {
        assert_eq!(TrainingType::Personal.to_string(), "PERSONAL");
        assert_eq!("BOOST".parse::<TrainingType>().unwrap(), TrainingType::Boost);
        assert!(TrainingType::Yoga.is_counted());
        assert!(TrainingType::Boost.is_block());
    }
}
