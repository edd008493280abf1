use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crates::domain::value_objects::subscriptions::{RefusalKind, StatusOutcome};
use serde::Serialize;
use thiserror::Error;

use crate::usecases::{
    creation_gate::GateDecision, plans::PlanRegistryError, usage_limits::UsageLimitError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<PlanRegistryError> for AppError {
    fn from(err: PlanRegistryError) -> Self {
        match err {
            PlanRegistryError::Validation(msg) => AppError::BadRequest(msg),
            PlanRegistryError::PlanNotFound => AppError::NotFound(err.to_string()),
            PlanRegistryError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

impl From<UsageLimitError> for AppError {
    fn from(err: UsageLimitError) -> Self {
        match err {
            UsageLimitError::Forbidden(msg) => AppError::Forbidden(msg),
            UsageLimitError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

pub fn refusal_status(kind: RefusalKind) -> StatusCode {
    match kind {
        RefusalKind::LimitReached => StatusCode::FORBIDDEN,
        RefusalKind::Misconfigured | RefusalKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn outcome_status(outcome: StatusOutcome) -> StatusCode {
    match outcome {
        StatusOutcome::Active | StatusOutcome::Exempt => StatusCode::OK,
        StatusOutcome::Invalid => StatusCode::BAD_REQUEST,
        StatusOutcome::NotFound | StatusOutcome::PlanInactive | StatusOutcome::Expired => {
            StatusCode::FORBIDDEN
        }
        StatusOutcome::Misconfigured | StatusOutcome::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Gate decisions are answered with the decision body itself, under the status its
/// refusal maps to.
impl IntoResponse for GateDecision {
    fn into_response(self) -> Response {
        let status = match &self {
            GateDecision::Allowed { .. } => StatusCode::OK,
            GateDecision::SubscriptionInactive { outcome, .. } => outcome_status(*outcome),
            GateDecision::QuotaRefused { kind, .. } => refusal_status(*kind),
        };

        (status, Json(self)).into_response()
    }
}
