use std::cmp::Ordering;

use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{errors::SelectionError, session::Session, subscription::Subscription};

/// Direction of a confirmation toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Session becomes confirmed, one use is debited.
    Confirmed,
    /// Session is reopened, one use is credited back.
    Opened,
}

impl Action {
    pub fn for_session(session: &Session) -> Action {
        if session.confirmed {
            Action::Opened
        } else {
            Action::Confirmed
        }
    }

    pub fn delta(&self) -> i32 {
        match self {
            Action::Confirmed => -1,
            Action::Opened => 1,
        }
    }
}

/// Chooses the one subscription a toggle should debit or credit.
///
/// `subscriptions` are the client's passes matching the session type. The
/// function never guesses: when the choice is not unambiguous it fails.
pub fn pick_subscription_id(
    action: Action,
    subscriptions: &[Subscription],
    today: NaiveDate,
) -> Result<ObjectId, SelectionError> {
    if subscriptions.is_empty() {
        return Err(SelectionError::NoMatchingSubscription);
    }

    let with_left: Vec<&Subscription> = subscriptions
        .iter()
        .filter(|sub| sub.has_trainings_left())
        .collect();

    match action {
        Action::Confirmed => match with_left.as_slice() {
            [sub] => Ok(sub.id),
            other => Err(SelectionError::AmbiguousOrExhaustedSubscription {
                candidates: other.len(),
            }),
        },
        Action::Opened => {
            if let [sub] = subscriptions {
                return Ok(sub.id);
            }
            match with_left.as_slice() {
                [sub] => Ok(sub.id),
                [] => subscriptions
                    .iter()
                    .min_by(|a, b| credit_order(a, b, today))
                    .map(|sub| sub.id)
                    .ok_or(SelectionError::NoMatchingSubscription),
                many => Err(SelectionError::AmbiguousSubscription {
                    candidates: many.len(),
                }),
            }
        }
    }
}

/// Order in which exhausted passes receive a credited use, first wins.
///
/// Passes with an end date go latest end first. An unlimited pass goes
/// before a dated one that has already expired and after one that has not.
/// Unlimited passes go latest start first. Remaining ties go to the
/// smaller id.
pub fn credit_order(a: &Subscription, b: &Subscription, today: NaiveDate) -> Ordering {
    match (a.end(), b.end()) {
        (Some(a_end), Some(b_end)) => b_end.cmp(&a_end).then_with(|| a.id.cmp(&b.id)),
        (None, None) => b.start.cmp(&a.start).then_with(|| a.id.cmp(&b.id)),
        (None, Some(b_end)) => {
            if b_end < today {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (Some(a_end), None) => {
            if a_end < today {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        subscription::{Pass, SubscriptionType},
        training::TrainingType,
    };

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn today() -> NaiveDate {
        date("2024-03-01")
    }

    fn limited(left: i32, end: &str) -> Subscription {
        let pass = Pass::new(
            SubscriptionType::Limited10,
            TrainingType::Yoga,
            Some(date(end)),
            Some(left),
        )
        .unwrap();
        let start = date("2019-12-01");
        Subscription::new(ObjectId::new(), start, Some(start), pass)
    }

    fn unlimited(left: i32, start: &str) -> Subscription {
        let pass = Pass::new(
            SubscriptionType::Unlimited10,
            TrainingType::Yoga,
            None,
            Some(left),
        )
        .unwrap();
        Subscription::new(ObjectId::new(), date(start), Some(date(start)), pass)
    }

    #[test]
    fn test_empty_input_fails() {
        assert_eq!(
            pick_subscription_id(Action::Confirmed, &[], today()),
            Err(SelectionError::NoMatchingSubscription)
        );
        assert_eq!(
            pick_subscription_id(Action::Opened, &[], today()),
            Err(SelectionError::NoMatchingSubscription)
        );
    }

    #[test]
    fn test_confirm_picks_the_one_with_trainings_left() {
        let subs = [limited(0, "2020-03-01"), limited(7, "2020-01-01")];
        assert_eq!(
            pick_subscription_id(Action::Confirmed, &subs, today()),
            Ok(subs[1].id)
        );
    }

    #[test]
    fn test_confirm_never_guesses() {
        let subs = [limited(2, "2020-03-01"), limited(7, "2020-01-01")];
        assert_eq!(
            pick_subscription_id(Action::Confirmed, &subs, today()),
            Err(SelectionError::AmbiguousOrExhaustedSubscription { candidates: 2 })
        );

        let subs = [limited(0, "2020-03-01")];
        assert_eq!(
            pick_subscription_id(Action::Confirmed, &subs, today()),
            Err(SelectionError::AmbiguousOrExhaustedSubscription { candidates: 0 })
        );
    }

    #[test]
    fn test_open_single_candidate_even_when_exhausted() {
        let subs = [limited(0, "2020-03-01")];
        assert_eq!(
            pick_subscription_id(Action::Opened, &subs, today()),
            Ok(subs[0].id)
        );
    }

    #[test]
    fn test_open_prefers_trainings_left() {
        let subs = [limited(0, "2024-06-01"), limited(3, "2020-03-01")];
        assert_eq!(
            pick_subscription_id(Action::Opened, &subs, today()),
            Ok(subs[1].id)
        );

        let subs = [limited(1, "2024-06-01"), limited(3, "2020-03-01")];
        assert_eq!(
            pick_subscription_id(Action::Opened, &subs, today()),
            Err(SelectionError::AmbiguousSubscription { candidates: 2 })
        );
    }

    #[test]
    fn test_open_tie_break_picks_latest_unlimited() {
        let a = limited(0, "2020-03-01");
        let b = unlimited(0, "2020-03-01");
        let c = limited(0, "2020-05-01");
        let d = unlimited(0, "2020-01-01");
        let expected = b.id;

        let orders = [
            vec![a.clone(), b.clone(), c.clone(), d.clone()],
            vec![d.clone(), c.clone(), b.clone(), a.clone()],
            vec![c.clone(), a.clone(), d.clone(), b.clone()],
        ];
        for subs in orders {
            assert_eq!(
                pick_subscription_id(Action::Opened, &subs, today()),
                Ok(expected)
            );
        }
    }

    #[test]
    fn test_open_tie_break_prefers_running_limited_pass() {
        let running = limited(0, "2024-05-01");
        let expired = limited(0, "2024-01-01");
        let unlimited = unlimited(0, "2023-01-01");
        let subs = [expired.clone(), unlimited.clone(), running.clone()];
        assert_eq!(
            pick_subscription_id(Action::Opened, &subs, today()),
            Ok(running.id)
        );

        let subs = [expired, unlimited.clone()];
        assert_eq!(
            pick_subscription_id(Action::Opened, &subs, today()),
            Ok(unlimited.id)
        );
    }

    #[test]
    fn test_equal_keys_pick_the_same_pass_in_any_order() {
        let (x, y) = (limited(0, "2024-06-01"), limited(0, "2024-06-01"));
        let first = pick_subscription_id(Action::Opened, &[x.clone(), y.clone()], today());
        let second = pick_subscription_id(Action::Opened, &[y.clone(), x.clone()], today());
        assert_eq!(first, second);
        assert_eq!(first, Ok(x.id.min(y.id)));

        let (x, y) = (unlimited(0, "2023-01-01"), unlimited(0, "2023-01-01"));
        let first = pick_subscription_id(Action::Opened, &[x.clone(), y.clone()], today());
        let second = pick_subscription_id(Action::Opened, &[y.clone(), x.clone()], today());
        assert_eq!(first, second);
        assert_eq!(first, Ok(x.id.min(y.id)));
        assert_ne!(credit_order(&x, &y, today()), Ordering::Equal);
    }

    #[test]
    fn test_credit_order_is_antisymmetric() {
        let subs = [
            limited(0, "2024-05-01"),
            limited(0, "2024-01-01"),
            unlimited(0, "2023-01-01"),
            unlimited(0, "2023-06-01"),
        ];
        for a in &subs {
            for b in &subs {
                assert_eq!(
                    credit_order(a, b, today()),
                    credit_order(b, a, today()).reverse()
                );
            }
        }
    }

    #[test]
    fn test_action_delta() {
        assert_eq!(Action::Confirmed.delta(), -1);
        assert_eq!(Action::Opened.delta(), 1);
    }
}
