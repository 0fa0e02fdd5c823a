use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;

use crate::{
    errors::LedgerError,
    ids::unique_ids,
    selection::{pick_subscription_id, Action},
    session::Session,
    subscription::Subscription,
};

/// A `trainings_left` change on one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charge {
    pub client_id: ObjectId,
    pub subscription_id: ObjectId,
    pub delta: i32,
}

/// Everything a confirmation toggle writes. Either all of it is applied or
/// none of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TogglePlan {
    pub action: Action,
    pub charges: Vec<Charge>,
}

impl TogglePlan {
    pub fn apply_to_session(&self, session: &mut Session) {
        session.confirmed = self.action == Action::Confirmed;
    }

    /// Store writes of the toggle, in the order they are applied: the
    /// session flag, then every charge, then one cache rebuild per client.
    pub fn writes(&self, session_id: &str) -> Vec<ToggleWrite> {
        let mut writes = Vec::with_capacity(self.charges.len() * 2 + 1);
        writes.push(ToggleWrite::SetConfirmed {
            session_id: session_id.to_owned(),
            confirmed: self.action == Action::Confirmed,
        });
        writes.extend(self.charges.iter().map(|charge| ToggleWrite::AddTrainings {
            subscription_id: charge.subscription_id,
            delta: charge.delta,
        }));
        writes.extend(
            unique_ids(self.charges.iter().map(|charge| charge.client_id))
                .into_iter()
                .map(|client_id| ToggleWrite::RefreshActive { client_id }),
        );
        writes
    }

    pub fn apply_to_subscriptions(&self, subscriptions: &mut [Subscription]) {
        for charge in &self.charges {
            if let Some(sub) = subscriptions
                .iter_mut()
                .find(|sub| sub.id == charge.subscription_id)
            {
                sub.add_trainings(charge.delta);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleWrite {
    SetConfirmed { session_id: String, confirmed: bool },
    AddTrainings { subscription_id: ObjectId, delta: i32 },
    RefreshActive { client_id: ObjectId },
}

/// Clients whose passes a toggle of `session` charges, each once.
pub fn charged_clients(session: &Session) -> Vec<ObjectId> {
    if session.tp.is_counted() {
        unique_ids(session.client_ids.iter().copied())
    } else {
        vec![]
    }
}

/// Resolves the subscription of every client before anything is written.
///
/// `passes` holds, per client of the session, that client's subscriptions
/// of the session's training type. Only counted training types are charged.
pub fn plan_toggle(
    session: &Session,
    passes: &[(ObjectId, Vec<Subscription>)],
    today: NaiveDate,
) -> Result<TogglePlan, LedgerError> {
    let action = Action::for_session(session);
    let client_ids = charged_clients(session);
    let mut charges = Vec::with_capacity(client_ids.len());
    for client_id in &client_ids {
        let subscriptions = passes
            .iter()
            .find(|(id, _)| id == client_id)
            .map(|(_, subs)| subs.as_slice())
            .unwrap_or(&[]);
        let subscription_id =
            pick_subscription_id(action, subscriptions, today).map_err(|source| {
                LedgerError::NoValidSubscription {
                    client_id: *client_id,
                    session_id: session.id.clone(),
                    source,
                }
            })?;
        charges.push(Charge {
            client_id: *client_id,
            subscription_id,
            delta: action.delta(),
        });
    }
    Ok(TogglePlan { action, charges })
}
