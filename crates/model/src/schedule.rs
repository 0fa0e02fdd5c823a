use chrono::{Datelike as _, NaiveDate};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    errors::LedgerError,
    ids::{unique_ids, weeks_in_year, with_weekday, WeekId},
    session::Session,
    training::{TimeRange, Training, TrainingType},
};

/// Sessions of every training for the ISO week-year `year`.
///
/// Ids are deterministic, so storing the result with create-if-absent is
/// idempotent.
pub fn sessions_for_year(trainings: &[Training], year: i32) -> Vec<Session> {
    trainings
        .iter()
        .flat_map(|training| sessions_for_training(training, year))
        .collect()
}

pub fn sessions_for_training(training: &Training, year: i32) -> Vec<Session> {
    let start = training.start_week();
    if start.year() > year {
        return vec![];
    }

    (1..=weeks_in_year(year))
        .filter(|week| year > start.year() || *week >= start.week())
        .filter_map(|week| WeekId::from_parts(year, week))
        .map(|week| Session::recurring(training, week.day(training.weekday())))
        .collect()
}

/// How far an edit of one session reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateMode {
    /// Only the edited session.
    Single,
    /// The training and its unconfirmed sessions from the edited date on.
    AllFollowing,
    /// The training and all of its unconfirmed sessions.
    AllNonConfirmed,
}

impl UpdateMode {
    pub fn is_bulk(&self) -> bool {
        !matches!(self, UpdateMode::Single)
    }

    /// Lower date bound of the sessions a bulk edit touches.
    pub fn lower_bound(&self, edited: &Session) -> Option<NaiveDate> {
        match self {
            UpdateMode::AllFollowing => Some(edited.date),
            UpdateMode::Single | UpdateMode::AllNonConfirmed => None,
        }
    }

    /// Sessions a bulk edit of `edited` loads; `None` for a single edit.
    pub fn scope(&self, edited: &Session) -> Result<Option<EditScope>, LedgerError> {
        if !self.is_bulk() {
            return Ok(None);
        }
        let training_id = edited.training_id.ok_or_else(|| {
            LedgerError::InvalidArgument(format!(
                "{} edit of session {} without training",
                self, edited.id
            ))
        })?;
        Ok(Some(EditScope {
            training_id,
            from: self.lower_bound(edited),
        }))
    }
}

/// Open sessions of a training, from `from` on when bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditScope {
    pub training_id: ObjectId,
    pub from: Option<NaiveDate>,
}

/// New values for a session and, on bulk edits, for its training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInput {
    #[serde(rename = "type")]
    pub tp: TrainingType,
    pub runs_from: NaiveDate,
    pub time: TimeRange,
    pub client_ids: Vec<ObjectId>,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SessionInput {
    pub fn apply_to_session(&self, session: &mut Session) {
        session.tp = self.tp;
        session.runs_from = self.runs_from;
        session.time = self.time;
        session.client_ids = unique_ids(self.client_ids.iter().copied());
        session.date = self.date;
        session.notes = self.notes.clone();
    }

    pub fn apply_to_training(&self, training: &mut Training) {
        training.tp = self.tp;
        training.runs_from = self.runs_from;
        training.time = self.time;
        training.client_ids = unique_ids(self.client_ids.iter().copied());
    }

    /// Copies the template fields and moves the session to the new weekday,
    /// keeping it in its week.
    pub fn apply_to_sibling(&self, session: &mut Session) {
        session.tp = self.tp;
        session.runs_from = self.runs_from;
        session.time = self.time;
        session.client_ids = unique_ids(self.client_ids.iter().copied());
        session.date = with_weekday(session.date, self.runs_from.weekday());
    }
}

/// Documents an edit writes, in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct EditPlan {
    pub training: Option<Training>,
    pub sessions: Vec<Session>,
}

/// Edit of the session alone.
pub fn plan_single_edit(mut edited: Session, input: &SessionInput) -> EditPlan {
    input.apply_to_session(&mut edited);
    EditPlan {
        training: None,
        sessions: vec![edited],
    }
}

/// Edit of the training and the unconfirmed sessions in reach of `mode`.
///
/// `siblings` are candidate sessions loaded from storage; ones outside the
/// reach of the edit are skipped.
pub fn plan_bulk_edit(
    mode: UpdateMode,
    edited: &Session,
    mut training: Training,
    siblings: Vec<Session>,
    input: &SessionInput,
) -> EditPlan {
    let lower_bound = mode.lower_bound(edited);
    let sessions = siblings
        .into_iter()
        .filter(|session| session.training_id == Some(training.id) && !session.confirmed)
        .filter(|session| lower_bound.map(|from| session.date >= from).unwrap_or(true))
        .map(|mut session| {
            input.apply_to_sibling(&mut session);
            session
        })
        .collect();
    input.apply_to_training(&mut training);
    EditPlan {
        training: Some(training),
        sessions,
    }
}

/// Ids of the stored sessions deleting `training` removes.
pub fn removed_with(training: &Training, sessions: &[Session]) -> Vec<String> {
    sessions
        .iter()
        .filter(|session| session.is_removed_with(training))
        .map(|session| session.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Weekday;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn training(runs_from: &str) -> Training {
        Training::new(
            TrainingType::Yoga,
            date(runs_from),
            TimeRange::parse("09:00", "10:00").unwrap(),
            vec![ObjectId::new()],
        )
    }

    #[test]
    fn test_first_year_starts_at_training_week() {
        let training = training("2024-03-13");
        let sessions = sessions_for_training(&training, 2024);
        assert_eq!(sessions.len(), 52 - 11 + 1);
        assert_eq!(sessions[0].date, date("2024-03-13"));
        assert_eq!(sessions.last().unwrap().date, date("2024-12-25"));
        assert!(sessions.iter().all(|s| s.date.weekday() == Weekday::Wed));
        assert!(sessions.iter().all(|s| s.training_id == Some(training.id)));
    }

    #[test]
    fn test_later_year_covers_every_week() {
        let training = training("2024-03-13");
        let sessions = sessions_for_training(&training, 2026);
        assert_eq!(sessions.len(), 53);
        assert_eq!(sessions[0].id, format!("{}-2026-1", training.id.to_hex()));
        assert_eq!(sessions[52].id, format!("{}-2026-53", training.id.to_hex()));
    }

    #[test]
    fn test_no_sessions_before_training_year() {
        assert!(sessions_for_training(&training("2024-03-13"), 2023).is_empty());
    }

    #[test]
    fn test_generation_is_idempotent() {
        let trainings = vec![training("2024-03-13"), training("2024-11-01")];
        let mut store = BTreeMap::new();
        for _ in 0..2 {
            for session in sessions_for_year(&trainings, 2024) {
                store.entry(session.id.clone()).or_insert(session);
            }
        }
        let once: BTreeMap<_, _> = sessions_for_year(&trainings, 2024)
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        assert_eq!(store, once);
    }

    fn input(runs_from: &str) -> SessionInput {
        SessionInput {
            tp: TrainingType::Personal,
            runs_from: date(runs_from),
            time: TimeRange::parse("18:00", "19:00").unwrap(),
            client_ids: vec![ObjectId::new()],
            date: date(runs_from),
            notes: Some("moved".to_owned()),
        }
    }

    #[test]
    fn test_single_edit_touches_only_the_session() {
        let training = training("2024-03-13");
        let edited = Session::recurring(&training, date("2024-04-03"));
        let plan = plan_single_edit(edited.clone(), &input("2024-04-05"));
        assert!(plan.training.is_none());
        assert_eq!(plan.sessions.len(), 1);
        let session = &plan.sessions[0];
        assert_eq!(session.id, edited.id);
        assert_eq!(session.date, date("2024-04-05"));
        assert_eq!(session.notes.as_deref(), Some("moved"));
        assert_eq!(session.training_id, Some(training.id));
    }

    #[test]
    fn test_all_following_moves_weekday_within_week() {
        let training = training("2024-03-13");
        let all = sessions_for_training(&training, 2024);
        let edited = all[3].clone();
        let mut confirmed = all[5].clone();
        confirmed.confirmed = true;
        let mut siblings = all.clone();
        siblings[5] = confirmed.clone();

        // Friday instead of Wednesday.
        let plan = plan_bulk_edit(
            UpdateMode::AllFollowing,
            &edited,
            training.clone(),
            siblings,
            &input("2024-03-15"),
        );

        let updated = plan.training.unwrap();
        assert_eq!(updated.id, training.id);
        assert_eq!(updated.tp, TrainingType::Personal);
        assert_eq!(updated.runs_from, date("2024-03-15"));

        assert_eq!(plan.sessions.len(), all.len() - 3 - 1);
        assert!(plan.sessions.iter().all(|s| s.date >= edited.date));
        assert!(plan.sessions.iter().all(|s| s.date.weekday() == Weekday::Fri));
        assert!(plan.sessions.iter().all(|s| s.id != confirmed.id));
        let first = &plan.sessions[0];
        assert_eq!(first.id, edited.id);
        assert_eq!(first.week_id(), edited.week_id());
        assert_eq!(first.notes, None);
    }

    #[test]
    fn test_all_non_confirmed_has_no_lower_bound() {
        let training = training("2024-03-13");
        let all = sessions_for_training(&training, 2024);
        let edited = all[10].clone();
        let plan = plan_bulk_edit(
            UpdateMode::AllNonConfirmed,
            &edited,
            training,
            all.clone(),
            &input("2024-03-11"),
        );
        assert_eq!(plan.sessions.len(), all.len());
        assert_eq!(plan.sessions[0].date, date("2024-03-11"));
    }

    #[test]
    fn test_update_mode_strings() {
        assert_eq!(UpdateMode::AllFollowing.to_string(), "ALL_FOLLOWING");
        assert_eq!(
            "ALL_NON_CONFIRMED".parse::<UpdateMode>().unwrap(),
            UpdateMode::AllNonConfirmed
        );
        assert!(!UpdateMode::Single.is_bulk());
    }

    #[test]
    fn test_edit_scope() {
        let training = training("2024-03-13");
        let edited = Session::recurring(&training, date("2024-04-03"));
        assert_eq!(UpdateMode::Single.scope(&edited).unwrap(), None);
        assert_eq!(
            UpdateMode::AllFollowing.scope(&edited).unwrap(),
            Some(EditScope {
                training_id: training.id,
                from: Some(date("2024-04-03")),
            })
        );
        assert_eq!(
            UpdateMode::AllNonConfirmed.scope(&edited).unwrap(),
            Some(EditScope {
                training_id: training.id,
                from: None,
            })
        );

        let single = Session::single(
            TrainingType::Yoga,
            date("2024-04-03"),
            TimeRange::parse("09:00", "10:00").unwrap(),
            vec![],
            None,
        );
        assert_eq!(UpdateMode::Single.scope(&single).unwrap(), None);
        assert!(matches!(
            UpdateMode::AllFollowing.scope(&single),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_removed_with_keeps_confirmed_and_earlier_sessions() {
        let training = training("2024-03-13");
        let other = self::training("2024-03-13");
        let mut sessions = sessions_for_training(&training, 2024);
        sessions[2].confirmed = true;
        let mut earlier = Session::recurring(&training, date("2024-03-06"));
        earlier.id = "earlier".to_owned();
        sessions.push(earlier);
        sessions.extend(sessions_for_training(&other, 2024).into_iter().take(3));

        let removed = removed_with(&training, &sessions);
        let own = sessions_for_training(&training, 2024).len();
        assert_eq!(removed.len(), own - 1);
        assert!(!removed.contains(&sessions[2].id));
        assert!(!removed.contains(&"earlier".to_owned()));
        assert!(removed
            .iter()
            .all(|id| id.starts_with(&training.id.to_hex())));
    }
}
