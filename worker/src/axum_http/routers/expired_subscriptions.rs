use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{error, info};

use crate::{
    config::config_model::DotEnvyConfig,
    usecases::deactivate_expired_subscriptions::DeactivateExpiredSubscriptionsUseCase,
};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_WORKER/internal/v1/subscriptions/deactivate-expired" \
//     -H "Authorization: Bearer $INTERNAL_SWEEP_TOKEN"

#[derive(Clone)]
pub struct ExpiredSubscriptionsRouteState {
    config: Arc<DotEnvyConfig>,
    usecase: Arc<DeactivateExpiredSubscriptionsUseCase>,
}

pub fn routes(
    config: Arc<DotEnvyConfig>,
    usecase: Arc<DeactivateExpiredSubscriptionsUseCase>,
) -> Router {
    Router::new()
        .route("/deactivate-expired", post(deactivate_expired))
        .with_state(ExpiredSubscriptionsRouteState { config, usecase })
}

pub async fn deactivate_expired(
    State(state): State<ExpiredSubscriptionsRouteState>,
    headers: HeaderMap,
) -> Response {
    let expected_token = match state.config.sweep.internal_token.as_deref() {
        Some(token) => token,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "sweep token is not configured",
            )
                .into_response();
        }
    };

    if let Err(status) = authorize_bearer(&headers, expected_token) {
        return (status, "unauthorized").into_response();
    }

    info!("expired_subscriptions route: on-demand sweep requested");
    let result = state.usecase.run().await;

    if result.success {
        Json(result).into_response()
    } else {
        error!(message = %result.message, "expired_subscriptions route: sweep aborted");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(result)).into_response()
    }
}

fn authorize_bearer(headers: &HeaderMap, expected_token: &str) -> Result<(), StatusCode> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if token == expected_token {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
