use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::Response,
};
use eyre::{eyre, Error};
use jsonwebtoken::{DecodingKey, Validation};
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::RpcError;

/// HS256 tokens signed with the shared secret.
pub struct Jwt {
    jwt_decode: DecodingKey,
    validation: Validation,
}

impl Jwt {
    pub fn new(secret: &str) -> Self {
        Jwt {
            jwt_decode: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    pub fn claims<C: DeserializeOwned>(&self, header: &HeaderValue) -> Result<C, Error> {
        let auth_key = header.to_str()?;
        let jwt = auth_key
            .strip_prefix("Bearer ")
            .ok_or_else(|| eyre!("No Bearer"))?;
        let token = jsonwebtoken::decode::<C>(jwt, &self.jwt_decode, &self.validation)?;
        Ok(token.claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: u64,
}

pub async fn require_admin(
    State(jwt): State<Arc<Jwt>>,
    request: Request,
    next: Next,
) -> Result<Response, RpcError> {
    let header = request.headers().get(AUTHORIZATION).ok_or_else(|| {
        warn!("Rejected call to {}: no token", request.uri());
        RpcError::failed_precondition("Authentication required")
    })?;
    let claims: AdminClaims = jwt.claims(header).map_err(|err| {
        warn!("Rejected call to {}: {:#}", request.uri(), err);
        RpcError::failed_precondition("Invalid token")
    })?;
    if !claims.admin {
        warn!(
            "Rejected call to {}: {} is not an admin",
            request.uri(),
            claims.sub
        );
        return Err(RpcError::failed_precondition("Admin rights required"));
    }
    Ok(next.run(request).await)
}
