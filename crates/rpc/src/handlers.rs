use axum::{extract::State, Json};
use ledger::Ledger;
use log::info;
use model::{
    client::{Client, ClientProfile},
    schedule::SessionInput,
    session::Session,
    subscription::Subscription,
    training::Training,
};

use crate::{
    error::RpcError,
    request::{
        parse_id, reply, Args, CreateSessionsRequest, CreateSubscriptionRequest, CreatedSessions,
        DeletedSessions, IdRequest, MarkPaidRequest, Reply, SessionRequest, SingleSessionPayload,
        TrainingPayload, UpdateClientRequest, UpdateSessionRequest, UpdateSubscriptionRequest,
        WeekRequest,
    },
};

// Arguments are checked before a session is started.

pub async fn create_sessions(
    State(ledger): State<Ledger>,
    Args(request): Args<CreateSessionsRequest>,
) -> Result<Json<Reply<CreatedSessions>>, RpcError> {
    let year = request.year()?;
    let mut tx = ledger.db.start_session().await?;
    let created = ledger
        .calendar
        .generate_sessions_for_year(&mut tx, year)
        .await?;
    Ok(reply(CreatedSessions { created }))
}

pub async fn update_session(
    State(ledger): State<Ledger>,
    Args(request): Args<UpdateSessionRequest>,
) -> Result<Json<Reply<Session>>, RpcError> {
    let input = SessionInput::try_from(request.session)?;
    let mut tx = ledger.db.start_session().await?;
    let session = ledger
        .calendar
        .update_session(&mut tx, request.mode, &request.session_id, &input)
        .await?;
    Ok(reply(session))
}

pub async fn toggle_session_confirmed(
    State(ledger): State<Ledger>,
    Args(request): Args<SessionRequest>,
) -> Result<Json<Reply<Session>>, RpcError> {
    let mut tx = ledger.db.start_session().await?;
    let session = ledger
        .toggle_session_confirmed(&mut tx, &request.session_id)
        .await?;
    info!(
        "Session {} is {}",
        session.id,
        if session.confirmed { "confirmed" } else { "open" }
    );
    Ok(reply(session))
}

pub async fn clients_with_issues(
    State(ledger): State<Ledger>,
    Args(request): Args<SessionRequest>,
) -> Result<Json<Reply<Vec<Client>>>, RpcError> {
    let mut tx = ledger.db.start_session().await?;
    let clients = ledger
        .clients_with_issues(&mut tx, &request.session_id)
        .await?;
    Ok(reply(clients))
}

pub async fn create_training(
    State(ledger): State<Ledger>,
    Args(payload): Args<TrainingPayload>,
) -> Result<Json<Reply<Training>>, RpcError> {
    let training = Training::try_from(payload)?;
    let mut tx = ledger.db.start_session().await?;
    ledger.calendar.create_training(&mut tx, &training).await?;
    Ok(reply(training))
}

pub async fn delete_training(
    State(ledger): State<Ledger>,
    Args(request): Args<IdRequest>,
) -> Result<Json<Reply<DeletedSessions>>, RpcError> {
    let id = request.id()?;
    let mut tx = ledger.db.start_session().await?;
    let deleted = ledger.calendar.delete_training(&mut tx, id).await?;
    Ok(reply(DeletedSessions { deleted }))
}

pub async fn create_single_session(
    State(ledger): State<Ledger>,
    Args(payload): Args<SingleSessionPayload>,
) -> Result<Json<Reply<Session>>, RpcError> {
    let session = Session::try_from(payload)?;
    let mut tx = ledger.db.start_session().await?;
    ledger
        .calendar
        .create_single_session(&mut tx, &session)
        .await?;
    Ok(reply(session))
}

pub async fn sessions_for_week(
    State(ledger): State<Ledger>,
    Args(request): Args<WeekRequest>,
) -> Result<Json<Reply<Vec<Session>>>, RpcError> {
    let week = request.week()?;
    let mut tx = ledger.db.start_session().await?;
    let sessions = ledger.calendar.sessions_for_week(&mut tx, week).await?;
    Ok(reply(sessions))
}

pub async fn list_clients(
    State(ledger): State<Ledger>,
) -> Result<Json<Reply<Vec<Client>>>, RpcError> {
    let mut tx = ledger.db.start_session().await?;
    Ok(reply(ledger.clients.get_all(&mut tx).await?))
}

pub async fn create_client(
    State(ledger): State<Ledger>,
    Args(profile): Args<ClientProfile>,
) -> Result<Json<Reply<Client>>, RpcError> {
    let mut tx = ledger.db.start_session().await?;
    let client = ledger.clients.create(&mut tx, profile).await?;
    Ok(reply(client))
}

pub async fn update_client(
    State(ledger): State<Ledger>,
    Args(request): Args<UpdateClientRequest>,
) -> Result<Json<Reply<Client>>, RpcError> {
    let id = parse_id(&request.client_id)?;
    let mut tx = ledger.db.start_session().await?;
    ledger
        .clients
        .update_profile(&mut tx, id, &request.profile)
        .await?;
    Ok(reply(ledger.clients.get(&mut tx, id).await?))
}

pub async fn create_subscription(
    State(ledger): State<Ledger>,
    Args(request): Args<CreateSubscriptionRequest>,
) -> Result<Json<Reply<Subscription>>, RpcError> {
    let subscription = Subscription::try_from(request)?;
    let mut tx = ledger.db.start_session().await?;
    ledger
        .subscriptions
        .create(&mut tx, &subscription)
        .await?;
    Ok(reply(subscription))
}

pub async fn update_subscription(
    State(ledger): State<Ledger>,
    Args(request): Args<UpdateSubscriptionRequest>,
) -> Result<Json<Reply<Subscription>>, RpcError> {
    let subscription = Subscription::try_from(request)?;
    let mut tx = ledger.db.start_session().await?;
    ledger
        .subscriptions
        .update(&mut tx, &subscription)
        .await?;
    Ok(reply(subscription))
}

pub async fn mark_subscription_paid(
    State(ledger): State<Ledger>,
    Args(request): Args<MarkPaidRequest>,
) -> Result<Json<Reply<Subscription>>, RpcError> {
    let id = parse_id(&request.id)?;
    let mut tx = ledger.db.start_session().await?;
    let subscription = ledger
        .subscriptions
        .mark_paid(&mut tx, id, request.paid_at)
        .await?;
    info!("Subscription {} paid on {}", subscription.id, request.paid_at);
    Ok(reply(subscription))
}

pub async fn delete_subscription(
    State(ledger): State<Ledger>,
    Args(request): Args<IdRequest>,
) -> Result<Json<Reply<()>>, RpcError> {
    let id = request.id()?;
    let mut tx = ledger.db.start_session().await?;
    ledger.subscriptions.delete(&mut tx, id).await?;
    Ok(reply(()))
}
