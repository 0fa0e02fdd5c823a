use std::sync::Arc;

use axum::{middleware, routing::post, Router};
use env::Env;
use eyre::{Context as _, Error};
use ledger::Ledger;
use log::info;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod request;

use auth::{require_admin, Jwt};

/// Admin callables. Every route requires an admin bearer token.
pub fn router(ledger: Ledger, jwt: Arc<Jwt>) -> Router {
    Router::new()
        .route("/createSessions", post(handlers::create_sessions))
        .route("/sessionsForWeek", post(handlers::sessions_for_week))
        .route("/updateSession", post(handlers::update_session))
        .route(
            "/toggleSessionConfirmed",
            post(handlers::toggle_session_confirmed),
        )
        .route("/createSingleSession", post(handlers::create_single_session))
        .route("/clientsWithIssues", post(handlers::clients_with_issues))
        .route("/createTraining", post(handlers::create_training))
        .route("/deleteTraining", post(handlers::delete_training))
        .route("/listClients", post(handlers::list_clients))
        .route("/createClient", post(handlers::create_client))
        .route("/updateClient", post(handlers::update_client))
        .route("/createSubscription", post(handlers::create_subscription))
        .route("/updateSubscription", post(handlers::update_subscription))
        .route(
            "/markSubscriptionPaid",
            post(handlers::mark_subscription_paid),
        )
        .route("/deleteSubscription", post(handlers::delete_subscription))
        .layer(middleware::from_fn_with_state(jwt, require_admin))
        .with_state(ledger)
}

pub async fn serve(ledger: Ledger, env: &Env) -> Result<(), Error> {
    let app = router(ledger, Arc::new(Jwt::new(env.jwt_secret())));
    let listener = tokio::net::TcpListener::bind(env.rpc_addr())
        .await
        .with_context(|| format!("Failed to bind {}", env.rpc_addr()))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
