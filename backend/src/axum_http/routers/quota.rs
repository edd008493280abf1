use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};
use crates::{
    domain::value_objects::enums::resource_kinds::ResourceKind,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            app_users::AppUserPostgres, group_members::GroupMemberPostgres, plans::PlanPostgres,
        },
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::{
        error_responses::AppError, middleware::require_active_subscription,
        routers::plans::require_admin,
    },
    usecases::{
        creation_gate::{CreationGateUseCase, GateDecision},
        subscription_status::SubscriptionStatusUseCase,
        usage_limits::{Subscriber, UsageLimitUseCase},
    },
};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_BACKEND/api/v1/quota/learning_path/reserve" \
//     -H "Authorization: Bearer $TOKEN"

type UsageUseCase = UsageLimitUseCase<AppUserPostgres, GroupMemberPostgres>;
type GateUseCase = CreationGateUseCase<AppUserPostgres, PlanPostgres, GroupMemberPostgres>;

#[derive(Clone)]
pub struct QuotaRouteState {
    usage_limits: Arc<UsageUseCase>,
    creation_gate: Arc<GateUseCase>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let app_users_repository = Arc::new(AppUserPostgres::new(Arc::clone(&db_pool)));
    let plans_repository = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let group_members_repository = Arc::new(GroupMemberPostgres::new(Arc::clone(&db_pool)));

    let subscription_status = Arc::new(SubscriptionStatusUseCase::new(
        Arc::clone(&app_users_repository),
        Arc::clone(&plans_repository),
    ));
    let usage_limits = UsageLimitUseCase::new(
        Arc::clone(&app_users_repository),
        Arc::clone(&group_members_repository),
    );
    let creation_gate = CreationGateUseCase::new(
        app_users_repository,
        plans_repository,
        group_members_repository,
    );

    let gated = Router::new()
        .route("/:kind/reserve", post(reserve_quota))
        .route_layer(middleware::from_fn_with_state(
            subscription_status,
            require_active_subscription::<AppUserPostgres, PlanPostgres>,
        ));

    Router::new()
        .merge(gated)
        .route(
            "/groups/:group_id/students/check",
            post(check_group_student_capacity),
        )
        .route("/:kind/release", post(release_quota))
        .with_state(QuotaRouteState {
            usage_limits: Arc::new(usage_limits),
            creation_gate: Arc::new(creation_gate),
        })
}

#[derive(Debug, Deserialize)]
pub struct ReleaseQuotaRequest {
    pub owner_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ReleaseQuotaResponse {
    pub owner_id: Uuid,
    pub kind: ResourceKind,
    pub released: bool,
}

fn parse_kind(raw_kind: &str) -> Result<ResourceKind, AppError> {
    ResourceKind::from_str(raw_kind).ok_or_else(|| {
        AppError::BadRequest(format!(
            "unknown resource kind {raw_kind:?}, expected group, learning_path, resource or activity"
        ))
    })
}

/// The subscription stage already ran in the middleware; this only reserves quota.
pub async fn reserve_quota(
    State(state): State<QuotaRouteState>,
    Extension(subscriber): Extension<Subscriber>,
    Path(raw_kind): Path<String>,
) -> Response {
    let kind = match parse_kind(&raw_kind) {
        Ok(kind) => kind,
        Err(err) => return err.into_response(),
    };

    let decision = state
        .usage_limits
        .check_and_reserve_quota(&subscriber, kind)
        .await;

    GateDecision::from(decision).into_response()
}

pub async fn check_group_student_capacity(
    State(state): State<QuotaRouteState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
) -> Response {
    state
        .creation_gate
        .guard_student_approval(&auth.user_id.to_string(), group_id)
        .await
        .into_response()
}

pub async fn release_quota(
    State(state): State<QuotaRouteState>,
    auth: AuthUser,
    Path(raw_kind): Path<String>,
    Json(release_quota_request): Json<ReleaseQuotaRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&auth)?;
    let kind = parse_kind(&raw_kind)?;

    let released = state
        .usage_limits
        .release_quota(auth.role, release_quota_request.owner_id, kind)
        .await?;

    Ok(Json(ReleaseQuotaResponse {
        owner_id: release_quota_request.owner_id,
        kind,
        released,
    }))
}
