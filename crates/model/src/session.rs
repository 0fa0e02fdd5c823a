use chrono::{Datelike as _, NaiveDate};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{
    ids::{unique_ids, with_weekday, WeekId},
    training::{TimeRange, Training, TrainingType},
};

/// One dated occurrence of a training, or a one-off session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub training_id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub tp: TrainingType,
    pub runs_from: NaiveDate,
    pub time: TimeRange,
    #[serde(default)]
    pub client_ids: Vec<ObjectId>,
    pub date: NaiveDate,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Session {
    /// Occurrence of `training` in the week of `date`.
    pub fn recurring(training: &Training, date: NaiveDate) -> Session {
        let date = with_weekday(date, training.weekday());
        Session {
            id: recurring_id(training.id, date),
            training_id: Some(training.id),
            tp: training.tp,
            runs_from: training.runs_from,
            time: training.time,
            client_ids: unique_ids(training.client_ids.iter().copied()),
            date,
            confirmed: false,
            notes: None,
        }
    }

    pub fn single(
        tp: TrainingType,
        date: NaiveDate,
        time: TimeRange,
        client_ids: Vec<ObjectId>,
        notes: Option<String>,
    ) -> Session {
        Session {
            id: ObjectId::new().to_hex(),
            training_id: None,
            tp,
            runs_from: date,
            time,
            client_ids: unique_ids(client_ids),
            date,
            confirmed: false,
            notes,
        }
    }

    pub fn is_single(&self) -> bool {
        self.training_id.is_none()
    }

    pub fn week_id(&self) -> WeekId {
        WeekId::new(self.date)
    }

    pub fn has_client(&self, client_id: ObjectId) -> bool {
        self.client_ids.contains(&client_id)
    }

    /// Whether deleting `training` removes this session.
    pub fn is_removed_with(&self, training: &Training) -> bool {
        self.training_id == Some(training.id) && !self.confirmed && self.date >= training.runs_from
    }
}

/// `{trainingId}-{isoWeekYear}-{isoWeekNumber}`
pub fn recurring_id(training_id: ObjectId, date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-{}-{}", training_id.to_hex(), week.year(), week.week())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training(runs_from: &str) -> Training {
        Training::new(
            TrainingType::Yoga,
            runs_from.parse().unwrap(),
            TimeRange::parse("09:00", "10:00").unwrap(),
            vec![ObjectId::new()],
        )
    }

    #[test]
    fn test_recurring_id() {
        let training = training("2024-03-13");
        let session = Session::recurring(&training, "2024-12-30".parse().unwrap());
        assert_eq!(session.date, "2025-01-01".parse::<NaiveDate>().unwrap());
        assert_eq!(session.id, format!("{}-2025-1", training.id.to_hex()));
        assert_eq!(session.client_ids, training.client_ids);
        assert!(!session.confirmed);
    }

    #[test]
    fn test_is_removed_with() {
        let training = training("2024-03-13");
        let mut session = Session::recurring(&training, "2024-03-20".parse().unwrap());
        assert!(session.is_removed_with(&training));

        session.confirmed = true;
        assert!(!session.is_removed_with(&training));

        let before = Session::recurring(&training, "2024-03-06".parse().unwrap());
        assert!(!before.is_removed_with(&training));

        let other = self::training("2024-03-13");
        let other = Session::recurring(&other, "2024-03-20".parse().unwrap());
        assert!(!other.is_removed_with(&training));
    }

    #[test]
    fn test_single_session_has_no_training() {
        let session = Session::single(
            TrainingType::Personal,
            "2024-03-13".parse().unwrap(),
            TimeRange::parse("09:00", "10:00").unwrap(),
            vec![],
            Some("first visit".to_owned()),
        );
        assert!(session.is_single());
        assert_eq!(session.runs_from, session.date);
    }
}
