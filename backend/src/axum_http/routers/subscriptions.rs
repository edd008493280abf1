use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use crates::{
    domain::value_objects::subscriptions::SubscriptionStatusDto,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            app_users::AppUserPostgres, group_members::GroupMemberPostgres, plans::PlanPostgres,
        },
    },
};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::{AppError, outcome_status},
    usecases::{
        subscription_status::SubscriptionStatusUseCase, usage_limits::UsageLimitUseCase,
    },
};

type StatusUseCase = SubscriptionStatusUseCase<AppUserPostgres, PlanPostgres>;
type UsageUseCase = UsageLimitUseCase<AppUserPostgres, GroupMemberPostgres>;

#[derive(Clone)]
pub struct SubscriptionRouteState {
    subscription_status: Arc<StatusUseCase>,
    usage_limits: Arc<UsageUseCase>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let app_users_repository = Arc::new(AppUserPostgres::new(Arc::clone(&db_pool)));
    let plans_repository = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let group_members_repository = Arc::new(GroupMemberPostgres::new(Arc::clone(&db_pool)));

    let subscription_status =
        SubscriptionStatusUseCase::new(Arc::clone(&app_users_repository), plans_repository);
    let usage_limits = UsageLimitUseCase::new(app_users_repository, group_members_repository);

    Router::new()
        .route("/status", get(check_current_user_subscription))
        .route("/usage", get(current_user_usage))
        .with_state(SubscriptionRouteState {
            subscription_status: Arc::new(subscription_status),
            usage_limits: Arc::new(usage_limits),
        })
}

/// Ordinary outcomes (active, expired, ...) answer 200 with the report; faults answer
/// with their mapped status.
pub async fn check_current_user_subscription(
    State(state): State<SubscriptionRouteState>,
    auth: AuthUser,
) -> Response {
    let report = state
        .subscription_status
        .check_subscription_status(&auth.user_id.to_string())
        .await;

    let status = if report.outcome.is_fault() {
        outcome_status(report.outcome)
    } else {
        axum::http::StatusCode::OK
    };

    (status, Json(SubscriptionStatusDto::from(report))).into_response()
}

pub async fn current_user_usage(
    State(state): State<SubscriptionRouteState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let report = state
        .subscription_status
        .check_subscription_status(&auth.user_id.to_string())
        .await;

    if report.outcome.is_fault() && report.user.is_none() {
        return Err(AppError::Internal(anyhow::anyhow!(report.message)));
    }

    let Some(user) = report.user.as_ref() else {
        return Err(AppError::NotFound(report.message));
    };

    let summary = state
        .usage_limits
        .usage_summary(user, report.plan.as_ref());

    Ok(Json(summary))
}
