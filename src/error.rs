use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{
        AbortError, ApplyError, PlanError, action::ActionError, command::CommandError,
        history::HistoryError, strategy::StrategyError,
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The acting user is known but not allowed to do this.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated but not permitted.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(StorageError::Rejected(message)) => {
                AppError::Internal(format!("storage rejected the write: {message}"))
            }
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => {
                AppError::ServiceUnavailable("phase transition timed out".into())
            }
        }
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

/// JSON body of every error response.
#[derive(Serialize)]
struct ErrorBody {
    /// Stable code clients can branch on.
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            warn!(%status, error = %self, "request failed");
        }

        let payload = Json(ErrorBody {
            error: code,
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ServiceError::InvalidState("phase transition already pending".into())
            }
            PlanError::InvalidTransition(invalid) => {
                ServiceError::InvalidState(invalid.to_string())
            }
        }
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => ServiceError::InvalidState("no transition is pending".into()),
            ApplyError::IdMismatch { .. } => {
                ServiceError::InvalidState("pending transition does not match".into())
            }
            ApplyError::CursorMismatch { expected, actual } => ServiceError::InvalidState(format!(
                "phase changed during transition (expected {expected:?}, got {actual:?})"
            )),
            ApplyError::VersionMismatch { expected, actual } => {
                ServiceError::InvalidState(format!(
                    "state version mismatch during transition (expected {expected}, got {actual})"
                ))
            }
        }
    }
}

impl From<AbortError> for ServiceError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => ServiceError::InvalidState("no pending transition".into()),
            AbortError::IdMismatch { .. } => {
                ServiceError::InvalidState("transition plan does not match".into())
            }
        }
    }
}

impl From<HistoryError> for ServiceError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::NothingToUndo | HistoryError::NothingToRedo => {
                ServiceError::InvalidState(err.to_string())
            }
            HistoryError::NotAuthor { .. } => ServiceError::Forbidden(err.to_string()),
        }
    }
}

impl From<CommandError> for ServiceError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::UnknownPlayer(_) | CommandError::UnknownObjective(_) => {
                ServiceError::NotFound(err.to_string())
            }
            _ => ServiceError::InvalidState(err.to_string()),
        }
    }
}

impl From<StrategyError> for ServiceError {
    fn from(err: StrategyError) -> Self {
        match err {
            StrategyError::UnknownCard(_) => ServiceError::InvalidInput(err.to_string()),
            StrategyError::UnknownPlayer(_) => ServiceError::NotFound(err.to_string()),
            StrategyError::NotYourTurn { .. } => ServiceError::Forbidden(err.to_string()),
            StrategyError::WrongPhase(_)
            | StrategyError::CardTaken { .. }
            | StrategyError::AlreadyPicked(_) => ServiceError::InvalidState(err.to_string()),
        }
    }
}

impl From<ActionError> for ServiceError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::UnknownPlayer(_) => ServiceError::NotFound(err.to_string()),
            ActionError::NotYourTurn { .. } => ServiceError::Forbidden(err.to_string()),
            ActionError::WrongPhase(_)
            | ActionError::EveryonePassed
            | ActionError::MissingActionState(_)
            | ActionError::StrategyCardUsed
            | ActionError::StrategyCardUnused => ServiceError::InvalidState(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn out_of_turn_maps_to_forbidden() {
        let err: ServiceError = ActionError::NotYourTurn {
            current: Uuid::new_v4(),
        }
        .into();
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn rejected_writes_are_internal_errors() {
        let err = ServiceError::from(StorageError::Rejected("orphan row".into()));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let degraded = AppError::from(ServiceError::Degraded).into_response();
        assert_eq!(degraded.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn empty_history_maps_to_conflict() {
        let err: ServiceError = HistoryError::NothingToUndo.into();
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
