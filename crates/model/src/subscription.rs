use chrono::{Duration, Months, NaiveDate};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{errors::ValidationError, training::TrainingType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum SubscriptionType {
    #[serde(rename = "SINGLE")]
    #[strum(serialize = "SINGLE")]
    Single,
    #[serde(rename = "LIMITED_10")]
    #[strum(serialize = "LIMITED_10")]
    Limited10,
    #[serde(rename = "LIMITED_20")]
    #[strum(serialize = "LIMITED_20")]
    Limited20,
    #[serde(rename = "UNLIMITED_10")]
    #[strum(serialize = "UNLIMITED_10")]
    Unlimited10,
    #[serde(rename = "BLOCK")]
    #[strum(serialize = "BLOCK")]
    Block,
}

/// Training types paid with counted passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountedType {
    Yoga,
    Personal,
}

/// Training types paid with time-boxed blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Hiit,
    Boost,
}

impl From<CountedType> for TrainingType {
    fn from(tp: CountedType) -> Self {
        match tp {
            CountedType::Yoga => TrainingType::Yoga,
            CountedType::Personal => TrainingType::Personal,
        }
    }
}

impl From<BlockType> for TrainingType {
    fn from(tp: BlockType) -> Self {
        match tp {
            BlockType::Hiit => TrainingType::Hiit,
            BlockType::Boost => TrainingType::Boost,
        }
    }
}

/// Consumption model of a subscription. Every variant only admits the
/// training types it can be sold for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Single {
        training_type: CountedType,
        end: NaiveDate,
        trainings_left: i32,
    },
    Limited10 {
        training_type: CountedType,
        end: NaiveDate,
        trainings_left: i32,
    },
    Limited20 {
        end: NaiveDate,
        trainings_left: i32,
    },
    Unlimited10 {
        /// Informational only, never limits attendance.
        trainings_left: i32,
    },
    Block {
        training_type: BlockType,
        end: NaiveDate,
    },
}

impl Pass {
    pub fn new(
        tp: SubscriptionType,
        training_type: TrainingType,
        end: Option<NaiveDate>,
        trainings_left: Option<i32>,
    ) -> Result<Pass, ValidationError> {
        let invalid = || ValidationError::InvalidPass { tp, training_type };
        let counted = || match training_type {
            TrainingType::Yoga => Ok(CountedType::Yoga),
            TrainingType::Personal => Ok(CountedType::Personal),
            _ => Err(invalid()),
        };
        let end_date = || end.ok_or(ValidationError::MissingEnd(tp));
        let left = || trainings_left.ok_or(ValidationError::MissingTrainingsLeft(tp));

        let pass = match tp {
            SubscriptionType::Single => Pass::Single {
                training_type: counted()?,
                end: end_date()?,
                trainings_left: left()?,
            },
            SubscriptionType::Limited10 => Pass::Limited10 {
                training_type: counted()?,
                end: end_date()?,
                trainings_left: left()?,
            },
            SubscriptionType::Limited20 => {
                if training_type != TrainingType::Yoga {
                    return Err(invalid());
                }
                Pass::Limited20 {
                    end: end_date()?,
                    trainings_left: left()?,
                }
            }
            SubscriptionType::Unlimited10 => {
                if training_type != TrainingType::Yoga {
                    return Err(invalid());
                }
                if end.is_some() {
                    return Err(ValidationError::UnexpectedField { tp, field: "end" });
                }
                Pass::Unlimited10 {
                    trainings_left: left()?,
                }
            }
            SubscriptionType::Block => {
                let training_type = match training_type {
                    TrainingType::Hiit => BlockType::Hiit,
                    TrainingType::Boost => BlockType::Boost,
                    _ => return Err(invalid()),
                };
                if trainings_left.is_some() {
                    return Err(ValidationError::UnexpectedField {
                        tp,
                        field: "trainings_left",
                    });
                }
                Pass::Block {
                    training_type,
                    end: end_date()?,
                }
            }
        };
        Ok(pass)
    }

    pub fn tp(&self) -> SubscriptionType {
        match self {
            Pass::Single { .. } => SubscriptionType::Single,
            Pass::Limited10 { .. } => SubscriptionType::Limited10,
            Pass::Limited20 { .. } => SubscriptionType::Limited20,
            Pass::Unlimited10 { .. } => SubscriptionType::Unlimited10,
            Pass::Block { .. } => SubscriptionType::Block,
        }
    }

    pub fn training_type(&self) -> TrainingType {
        match self {
            Pass::Single { training_type, .. } | Pass::Limited10 { training_type, .. } => {
                (*training_type).into()
            }
            Pass::Limited20 { .. } | Pass::Unlimited10 { .. } => TrainingType::Yoga,
            Pass::Block { training_type, .. } => (*training_type).into(),
        }
    }

    /// Only unlimited passes have no end.
    pub fn end(&self) -> Option<NaiveDate> {
        match self {
            Pass::Single { end, .. }
            | Pass::Limited10 { end, .. }
            | Pass::Limited20 { end, .. }
            | Pass::Block { end, .. } => Some(*end),
            Pass::Unlimited10 { .. } => None,
        }
    }

    /// Blocks are not use-counted.
    pub fn trainings_left(&self) -> Option<i32> {
        match self {
            Pass::Single { trainings_left, .. }
            | Pass::Limited10 { trainings_left, .. }
            | Pass::Limited20 { trainings_left, .. }
            | Pass::Unlimited10 { trainings_left } => Some(*trainings_left),
            Pass::Block { .. } => None,
        }
    }

    fn trainings_left_mut(&mut self) -> Option<&mut i32> {
        match self {
            Pass::Single { trainings_left, .. }
            | Pass::Limited10 { trainings_left, .. }
            | Pass::Limited20 { trainings_left, .. }
            | Pass::Unlimited10 { trainings_left } => Some(trainings_left),
            Pass::Block { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscriptionTags {
    pub unpaid: bool,
    pub expired: bool,
    pub expiring: bool,
    pub runs_short: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SubscriptionDoc", into = "SubscriptionDoc")]
pub struct Subscription {
    pub id: ObjectId,
    pub client_id: ObjectId,
    pub start: NaiveDate,
    pub paid_at: Option<NaiveDate>,
    pass: Pass,
}

impl Subscription {
    pub fn new(
        client_id: ObjectId,
        start: NaiveDate,
        paid_at: Option<NaiveDate>,
        pass: Pass,
    ) -> Subscription {
        Subscription {
            id: ObjectId::new(),
            client_id,
            start,
            paid_at,
            pass,
        }
    }

    /// Sells a fresh pass with the default allotment and validity.
    pub fn issue(
        client_id: ObjectId,
        tp: SubscriptionType,
        training_type: TrainingType,
        start: NaiveDate,
        paid_at: Option<NaiveDate>,
    ) -> Result<Subscription, ValidationError> {
        let months = |m| {
            start
                .checked_add_months(Months::new(m))
                .ok_or(ValidationError::DateOutOfRange(start))
        };
        let (end, trainings_left) = match tp {
            SubscriptionType::Single => (Some(months(1)?), Some(1)),
            SubscriptionType::Limited10 => (Some(months(3)?), Some(10)),
            SubscriptionType::Limited20 => (Some(months(6)?), Some(20)),
            SubscriptionType::Unlimited10 => (None, Some(10)),
            SubscriptionType::Block => (
                Some(
                    start
                        .checked_add_signed(Duration::weeks(6))
                        .ok_or(ValidationError::DateOutOfRange(start))?,
                ),
                None,
            ),
        };
        let pass = Pass::new(tp, training_type, end, trainings_left)?;
        Ok(Subscription::new(client_id, start, paid_at, pass))
    }

    pub fn pass(&self) -> &Pass {
        &self.pass
    }

    pub fn set_pass(&mut self, pass: Pass) {
        self.pass = pass;
    }

    pub fn tp(&self) -> SubscriptionType {
        self.pass.tp()
    }

    pub fn training_type(&self) -> TrainingType {
        self.pass.training_type()
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.pass.end()
    }

    pub fn trainings_left(&self) -> Option<i32> {
        self.pass.trainings_left()
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self.pass, Pass::Unlimited10 { .. })
    }

    pub fn is_block(&self) -> bool {
        matches!(self.pass, Pass::Block { .. })
    }

    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    pub fn has_trainings_left(&self) -> bool {
        self.trainings_left().map(|left| left > 0).unwrap_or(false)
    }

    /// Blocks are valid until their end day, everything else while uses remain.
    pub fn is_valid(&self, today: NaiveDate) -> bool {
        match self.pass {
            Pass::Block { end, .. } => end >= today,
            _ => self.has_trainings_left(),
        }
    }

    /// Unpaid passes stay usable so the studio is never blocked on accounting.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        !self.is_paid() || self.is_valid(today)
    }

    /// Usable for a session of type `tp` as seen from the active cache.
    pub fn covers(&self, tp: TrainingType) -> bool {
        self.training_type() == tp && (self.is_block() || self.has_trainings_left())
    }

    pub fn add_trainings(&mut self, delta: i32) {
        if let Some(left) = self.pass.trainings_left_mut() {
            *left += delta;
        }
    }

    pub fn tags(&self, today: NaiveDate) -> SubscriptionTags {
        let unpaid = !self.is_paid();
        let end = match self.pass.end() {
            Some(end) => end,
            None => {
                return SubscriptionTags {
                    unpaid,
                    ..Default::default()
                }
            }
        };

        let days_left = (end - today).num_days();
        let expired = end < today;
        let expiring = !expired && days_left <= 7;
        let weeks_left = (days_left as f64 / 7.0).round() as i32;
        let runs_short = !expired
            && self
                .trainings_left()
                .map(|left| left > weeks_left)
                .unwrap_or(false);

        SubscriptionTags {
            unpaid,
            expired,
            expiring,
            runs_short,
        }
    }
}

/// Stored form: a flat document validated on the way in.
#[derive(Serialize, Deserialize)]
struct SubscriptionDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    client_id: ObjectId,
    #[serde(rename = "type")]
    tp: SubscriptionType,
    training_type: TrainingType,
    start: NaiveDate,
    #[serde(default)]
    end: Option<NaiveDate>,
    #[serde(default)]
    trainings_left: Option<i32>,
    #[serde(default)]
    paid_at: Option<NaiveDate>,
}

impl TryFrom<SubscriptionDoc> for Subscription {
    type Error = ValidationError;

    fn try_from(doc: SubscriptionDoc) -> Result<Self, Self::Error> {
        let pass = Pass::new(doc.tp, doc.training_type, doc.end, doc.trainings_left)?;
        Ok(Subscription {
            id: doc.id,
            client_id: doc.client_id,
            start: doc.start,
            paid_at: doc.paid_at,
            pass,
        })
    }
}

impl From<Subscription> for SubscriptionDoc {
    fn from(sub: Subscription) -> Self {
        SubscriptionDoc {
            id: sub.id,
            client_id: sub.client_id,
            tp: sub.pass.tp(),
            training_type: sub.pass.training_type(),
            start: sub.start,
            end: sub.pass.end(),
            trainings_left: sub.pass.trainings_left(),
            paid_at: sub.paid_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn limited(left: i32, end: &str, paid: bool) -> Subscription {
        let pass = Pass::new(
            SubscriptionType::Limited10,
            TrainingType::Yoga,
            Some(date(end)),
            Some(left),
        )
        .unwrap();
        let paid_at = if paid { Some(date("2024-01-01")) } else { None };
        Subscription::new(ObjectId::new(), date("2024-01-01"), paid_at, pass)
    }

    fn block(end: &str, paid: bool) -> Subscription {
        let pass = Pass::new(SubscriptionType::Block, TrainingType::Hiit, Some(date(end)), None)
            .unwrap();
        let paid_at = if paid { Some(date("2024-01-01")) } else { None };
        Subscription::new(ObjectId::new(), date("2024-01-01"), paid_at, pass)
    }

    #[test]
    fn test_pass_rejects_invalid_combinations() {
        let end = Some(date("2024-06-01"));
        assert_eq!(
            Pass::new(SubscriptionType::Block, TrainingType::Yoga, end, None),
            Err(ValidationError::InvalidPass {
                tp: SubscriptionType::Block,
                training_type: TrainingType::Yoga
            })
        );
        assert!(Pass::new(
            SubscriptionType::Limited20,
            TrainingType::Personal,
            end,
            Some(20)
        )
        .is_err());
        assert!(Pass::new(
            SubscriptionType::Unlimited10,
            TrainingType::Personal,
            None,
            Some(10)
        )
        .is_err());
        assert!(Pass::new(SubscriptionType::Single, TrainingType::Boost, end, Some(1)).is_err());
        assert_eq!(
            Pass::new(SubscriptionType::Block, TrainingType::Hiit, end, Some(3)),
            Err(ValidationError::UnexpectedField {
                tp: SubscriptionType::Block,
                field: "trainings_left"
            })
        );
        assert_eq!(
            Pass::new(SubscriptionType::Limited10, TrainingType::Yoga, None, Some(10)),
            Err(ValidationError::MissingEnd(SubscriptionType::Limited10))
        );
        assert!(Pass::new(
            SubscriptionType::Limited10,
            TrainingType::Personal,
            end,
            Some(10)
        )
        .is_ok());
        assert!(Pass::new(SubscriptionType::Block, TrainingType::Boost, end, None).is_ok());
    }

    #[test]
    fn test_issue_defaults() {
        let client = ObjectId::new();
        let start = date("2024-01-15");
        let issue = |tp, training| {
            Subscription::issue(client, tp, training, start, None).unwrap()
        };
        let sub = issue(SubscriptionType::Limited10, TrainingType::Yoga);
        assert_eq!(sub.end(), Some(date("2024-04-15")));
        assert_eq!(sub.trainings_left(), Some(10));

        let sub = issue(SubscriptionType::Limited20, TrainingType::Yoga);
        assert_eq!(sub.end(), Some(date("2024-07-15")));
        assert_eq!(sub.trainings_left(), Some(20));

        let sub = issue(SubscriptionType::Block, TrainingType::Boost);
        assert_eq!(sub.end(), Some(date("2024-02-26")));
        assert_eq!(sub.trainings_left(), None);

        let sub = issue(SubscriptionType::Unlimited10, TrainingType::Yoga);
        assert_eq!(sub.end(), None);
        assert!(sub.is_unlimited());

        assert!(Subscription::issue(
            client,
            SubscriptionType::Unlimited10,
            TrainingType::Hiit,
            start,
            None
        )
        .is_err());
    }

    #[test]
    fn test_validity() {
        let today = date("2024-03-01");
        assert!(limited(1, "2020-01-01", true).is_valid(today));
        assert!(!limited(0, "2030-01-01", true).is_valid(today));
        assert!(block("2024-03-01", true).is_valid(today));
        assert!(!block("2024-02-29", true).is_valid(today));
    }

    #[test]
    fn test_unpaid_is_always_active() {
        let today = date("2024-03-01");
        assert!(limited(0, "2020-01-01", false).is_active(today));
        assert!(block("2020-01-01", false).is_active(today));
        assert!(!limited(0, "2030-01-01", true).is_active(today));
        assert!(!block("2020-01-01", true).is_active(today));
    }

    #[test]
    fn test_runs_short_boundary() {
        let today = date("2024-03-01");
        let in_four_weeks = (today + Duration::weeks(4)).to_string();
        let in_five_weeks = (today + Duration::weeks(5)).to_string();

        assert!(!limited(4, &in_four_weeks, true).tags(today).runs_short);
        assert!(limited(7, &in_five_weeks, true).tags(today).runs_short);
    }

    #[test]
    fn test_tags() {
        let today = date("2024-03-01");
        assert_eq!(
            limited(3, "2024-03-08", false).tags(today),
            SubscriptionTags {
                unpaid: true,
                expired: false,
                expiring: true,
                runs_short: true,
            }
        );
        assert_eq!(
            limited(3, "2024-02-29", true).tags(today),
            SubscriptionTags {
                unpaid: false,
                expired: true,
                expiring: false,
                runs_short: false,
            }
        );
        let block_tags = block("2024-03-05", true).tags(today);
        assert!(block_tags.expiring);
        assert!(!block_tags.runs_short);

        let unlimited = Subscription::issue(
            ObjectId::new(),
            SubscriptionType::Unlimited10,
            TrainingType::Yoga,
            date("2020-01-01"),
            None,
        )
        .unwrap();
        assert_eq!(
            unlimited.tags(today),
            SubscriptionTags {
                unpaid: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_document_shape_and_rejection() {
        let sub = limited(7, "2024-04-01", true);
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["type"], "LIMITED_10");
        assert_eq!(json["training_type"], "YOGA");
        assert_eq!(json["trainings_left"], 7);
        assert_eq!(serde_json::from_value::<Subscription>(json).unwrap(), sub);

        let mut bad = serde_json::to_value(&block("2024-04-01", true)).unwrap();
        bad["training_type"] = "YOGA".into();
        assert!(serde_json::from_value::<Subscription>(bad).is_err());
    }

    #[test]
    fn test_add_trainings_skips_blocks() {
        let mut sub = limited(2, "2024-04-01", true);
        sub.add_trainings(-1);
        assert_eq!(sub.trainings_left(), Some(1));

        let mut sub = block("2024-04-01", true);
        sub.add_trainings(-1);
        assert_eq!(sub.trainings_left(), None);
    }
}
