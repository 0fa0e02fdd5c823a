use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{session::Session, subscription::Subscription};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Cache of the client's active subscriptions, never a source of truth.
    /// Rebuilt from the subscriptions collection on every subscription write.
    #[serde(default)]
    pub active_subscriptions: Vec<Subscription>,
}

impl Client {
    pub fn new(name: String) -> Client {
        Client {
            id: ObjectId::new(),
            name,
            email: None,
            birthday: None,
            phone: None,
            address: None,
            active_subscriptions: vec![],
        }
    }

    pub fn set_profile(&mut self, profile: ClientProfile) {
        self.name = profile.name;
        self.email = profile.email;
        self.birthday = profile.birthday;
        self.phone = profile.phone;
        self.address = profile.address;
    }

    pub fn refresh_active(&mut self, subscriptions: &[Subscription], today: NaiveDate) {
        self.active_subscriptions = active_subscriptions(subscriptions, today);
    }

    /// Whether the cached passes cover a session of the given type.
    pub fn can_attend(&self, session: &Session) -> bool {
        self.active_subscriptions
            .iter()
            .any(|sub| sub.covers(session.tp))
    }
}

/// Editable client fields.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ClientProfile {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

pub fn active_subscriptions(subscriptions: &[Subscription], today: NaiveDate) -> Vec<Subscription> {
    subscriptions
        .iter()
        .filter(|sub| sub.is_active(today))
        .cloned()
        .collect()
}

/// Clients of an unconfirmed session that hold no pass for it.
///
/// A confirmed session has already been reconciled and never reports issues.
pub fn clients_with_issues<'a>(clients: &'a [Client], session: &Session) -> Vec<&'a Client> {
    if session.confirmed {
        return vec![];
    }
    clients
        .iter()
        .filter(|client| session.has_client(client.id))
        .filter(|client| !client.can_attend(session))
        .collect()
}
