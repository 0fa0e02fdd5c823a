use axum::{
    extract::{FromRequest, Request},
    Json,
};
use chrono::NaiveDate;
use model::{
    client::ClientProfile,
    errors::ValidationError,
    ids::{unique_ids, WeekId},
    schedule::{SessionInput, UpdateMode},
    session::Session,
    subscription::{Pass, Subscription, SubscriptionType},
    training::{TimeRange, Training, TrainingType},
};
use mongodb::bson::oid::ObjectId;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::RpcError;

/// JSON body that rejects malformed payloads with `invalid-argument`.
pub struct Args<T>(pub T);

impl<T, S> FromRequest<S> for Args<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RpcError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|rejection| RpcError::invalid_argument(rejection.body_text()))?;
        Ok(Args(value))
    }
}

/// Successful call, rendered as `{"result": ...}`.
#[derive(Debug, Serialize)]
pub struct Reply<T> {
    pub result: T,
}

pub fn reply<T: Serialize>(result: T) -> Json<Reply<T>> {
    Json(Reply { result })
}

pub fn parse_id(id: &str) -> Result<ObjectId, ValidationError> {
    ObjectId::parse_str(id).map_err(|_| ValidationError::InvalidId(id.to_owned()))
}

/// Client ids of a session or training, each kept once.
fn parse_client_ids(ids: &[String]) -> Result<Vec<ObjectId>, ValidationError> {
    let ids = ids
        .iter()
        .map(|id| parse_id(id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(unique_ids(ids))
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionsRequest {
    pub year: i32,
}

impl CreateSessionsRequest {
    pub fn year(&self) -> Result<i32, RpcError> {
        if (1..=9999).contains(&self.year) {
            Ok(self.year)
        } else {
            Err(RpcError::invalid_argument(format!(
                "Year out of range: {}",
                self.year
            )))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedSessions {
    pub created: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    #[serde(rename = "type")]
    pub mode: UpdateMode,
    pub session_id: String,
    pub session: SessionPayload,
}

#[derive(Debug, Deserialize)]
pub struct TimePayload {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[serde(rename = "type")]
    pub tp: TrainingType,
    pub runs_from: NaiveDate,
    pub time: TimePayload,
    #[serde(default)]
    pub client_ids: Vec<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TryFrom<SessionPayload> for SessionInput {
    type Error = ValidationError;

    fn try_from(payload: SessionPayload) -> Result<Self, Self::Error> {
        Ok(SessionInput {
            tp: payload.tp,
            runs_from: payload.runs_from,
            time: TimeRange::parse(&payload.time.start, &payload.time.end)?,
            client_ids: parse_client_ids(&payload.client_ids)?,
            date: payload.date,
            notes: payload.notes,
        })
    }
}

/// Request naming one session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: String,
}

/// Request naming one training or subscription.
#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

impl IdRequest {
    pub fn id(&self) -> Result<ObjectId, ValidationError> {
        parse_id(&self.id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPayload {
    #[serde(rename = "type")]
    pub tp: TrainingType,
    pub runs_from: NaiveDate,
    pub time: TimePayload,
    #[serde(default)]
    pub client_ids: Vec<String>,
}

impl TryFrom<TrainingPayload> for Training {
    type Error = ValidationError;

    fn try_from(payload: TrainingPayload) -> Result<Self, Self::Error> {
        Ok(Training::new(
            payload.tp,
            payload.runs_from,
            TimeRange::parse(&payload.time.start, &payload.time.end)?,
            parse_client_ids(&payload.client_ids)?,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedSessions {
    pub deleted: u64,
}

/// A one-off session, not linked to any training.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSessionPayload {
    #[serde(rename = "type")]
    pub tp: TrainingType,
    pub date: NaiveDate,
    pub time: TimePayload,
    #[serde(default)]
    pub client_ids: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TryFrom<SingleSessionPayload> for Session {
    type Error = ValidationError;

    fn try_from(payload: SingleSessionPayload) -> Result<Self, Self::Error> {
        Ok(Session::single(
            payload.tp,
            payload.date,
            TimeRange::parse(&payload.time.start, &payload.time.end)?,
            parse_client_ids(&payload.client_ids)?,
            payload.notes,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct WeekRequest {
    pub year: i32,
    pub week: u32,
}

impl WeekRequest {
    pub fn week(&self) -> Result<WeekId, RpcError> {
        WeekId::from_parts(self.year, self.week).ok_or_else(|| {
            RpcError::invalid_argument(format!("No week {} in {}", self.week, self.year))
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    pub client_id: String,
    pub profile: ClientProfile,
}

/// Sale of a pass with the default allotment and validity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub client_id: String,
    #[serde(rename = "type")]
    pub tp: SubscriptionType,
    pub training_type: TrainingType,
    pub start: NaiveDate,
    #[serde(default)]
    pub paid_at: Option<NaiveDate>,
}

impl TryFrom<CreateSubscriptionRequest> for Subscription {
    type Error = ValidationError;

    fn try_from(request: CreateSubscriptionRequest) -> Result<Self, Self::Error> {
        Subscription::issue(
            parse_id(&request.client_id)?,
            request.tp,
            request.training_type,
            request.start,
            request.paid_at,
        )
    }
}

/// Full replacement of a stored subscription.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub id: String,
    pub client_id: String,
    #[serde(rename = "type")]
    pub tp: SubscriptionType,
    pub training_type: TrainingType,
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub trainings_left: Option<i32>,
    #[serde(default)]
    pub paid_at: Option<NaiveDate>,
}

impl TryFrom<UpdateSubscriptionRequest> for Subscription {
    type Error = ValidationError;

    fn try_from(request: UpdateSubscriptionRequest) -> Result<Self, Self::Error> {
        let pass = Pass::new(
            request.tp,
            request.training_type,
            request.end,
            request.trainings_left,
        )?;
        let mut subscription = Subscription::new(
            parse_id(&request.client_id)?,
            request.start,
            request.paid_at,
            pass,
        );
        subscription.id = parse_id(&request.id)?;
        Ok(subscription)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    pub id: String,
    pub paid_at: NaiveDate,
}
