use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use model::errors::{LedgerError, ValidationError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RpcStatus {
    InvalidArgument,
    FailedPrecondition,
    NotFound,
    Aborted,
    Internal,
}

impl RpcStatus {
    pub fn http_status(&self) -> StatusCode {
        match self {
            RpcStatus::InvalidArgument => StatusCode::BAD_REQUEST,
            RpcStatus::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            RpcStatus::NotFound => StatusCode::NOT_FOUND,
            RpcStatus::Aborted => StatusCode::CONFLICT,
            RpcStatus::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failed call, rendered as `{"error": {"status", "message"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcError {
    pub status: RpcStatus,
    pub message: String,
}

impl RpcError {
    pub fn new(status: RpcStatus, message: impl Into<String>) -> Self {
        RpcError {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        RpcError::new(RpcStatus::InvalidArgument, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        RpcError::new(RpcStatus::FailedPrecondition, message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: RpcError,
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        (self.status.http_status(), Json(ErrorBody { error: self })).into_response()
    }
}

impl From<LedgerError> for RpcError {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::SessionNotFound(_)
            | LedgerError::TrainingNotFound(_)
            | LedgerError::ClientNotFound(_)
            | LedgerError::SubscriptionNotFound(_)
            | LedgerError::NoValidSubscription { .. } => RpcStatus::NotFound,
            LedgerError::InvalidArgument(_) | LedgerError::Validation(_) => {
                RpcStatus::InvalidArgument
            }
            err if err.is_conflict() => RpcStatus::Aborted,
            _ => {
                error!("Call failed: {:#}", err);
                RpcStatus::Internal
            }
        };
        RpcError::new(status, err.to_string())
    }
}

impl From<ValidationError> for RpcError {
    fn from(err: ValidationError) -> Self {
        RpcError::invalid_argument(err.to_string())
    }
}

impl From<eyre::Error> for RpcError {
    fn from(err: eyre::Error) -> Self {
        LedgerError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use model::errors::SelectionError;
    use mongodb::bson::oid::ObjectId;

    use super::*;

    #[test]
    fn test_ledger_errors_map_to_statuses() {
        let not_found = RpcError::from(LedgerError::SessionNotFound("s1".to_owned()));
        assert_eq!(not_found.status, RpcStatus::NotFound);

        let client_id = ObjectId::new();
        let no_pass = RpcError::from(LedgerError::NoValidSubscription {
            client_id,
            session_id: "s2".to_owned(),
            source: SelectionError::NoMatchingSubscription,
        });
        assert_eq!(no_pass.status, RpcStatus::NotFound);
        assert!(no_pass.message.contains(&client_id.to_hex()));
        assert!(no_pass.message.contains("s2"));

        let invalid = RpcError::from(LedgerError::InvalidArgument("no training".to_owned()));
        assert_eq!(invalid.status, RpcStatus::InvalidArgument);

        let internal = RpcError::from(eyre::eyre!("boom"));
        assert_eq!(internal.status, RpcStatus::Internal);
    }

    #[test]
    fn test_error_body() {
        let body = serde_json::to_value(ErrorBody {
            error: RpcError::failed_precondition("Authentication required"),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "error": {
                    "status": "failed-precondition",
                    "message": "Authentication required"
                }
            })
        );
        assert_eq!(
            RpcStatus::Aborted.http_status(),
            StatusCode::CONFLICT
        );
    }
}
