use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use crates::{
    domain::{repositories::plans::PlanRepository, value_objects::plans::UpsertPlanModel},
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::plans::PlanPostgres},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::AuthUser, axum_http::error_responses::AppError, usecases::plans::PlanRegistryUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let plans_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let plans_usecase = PlanRegistryUseCase::new(Arc::new(plans_repository));

    Router::new()
        .route(
            "/",
            get(list_plans::<PlanPostgres>).post(create_plan::<PlanPostgres>),
        )
        .route(
            "/:plan_id",
            get(find_plan::<PlanPostgres>).put(update_plan::<PlanPostgres>),
        )
        .with_state(Arc::new(plans_usecase))
}

pub async fn list_plans<T>(
    State(plans_usecase): State<Arc<PlanRegistryUseCase<T>>>,
    _auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    T: PlanRepository + Send + Sync + 'static,
{
    let plans = plans_usecase.list_plans().await?;

    Ok(Json(plans))
}

pub async fn find_plan<T>(
    State(plans_usecase): State<Arc<PlanRegistryUseCase<T>>>,
    _auth: AuthUser,
    Path(plan_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    T: PlanRepository + Send + Sync + 'static,
{
    let plan = plans_usecase.find_plan(plan_id).await?;

    Ok(Json(plan))
}

pub async fn create_plan<T>(
    State(plans_usecase): State<Arc<PlanRegistryUseCase<T>>>,
    auth: AuthUser,
    Json(upsert_plan_model): Json<UpsertPlanModel>,
) -> Result<impl IntoResponse, AppError>
where
    T: PlanRepository + Send + Sync + 'static,
{
    require_admin(&auth)?;

    let plan = plans_usecase.create_plan(upsert_plan_model).await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update_plan<T>(
    State(plans_usecase): State<Arc<PlanRegistryUseCase<T>>>,
    auth: AuthUser,
    Path(plan_id): Path<Uuid>,
    Json(upsert_plan_model): Json<UpsertPlanModel>,
) -> Result<impl IntoResponse, AppError>
where
    T: PlanRepository + Send + Sync + 'static,
{
    require_admin(&auth)?;

    let plan = plans_usecase.update_plan(plan_id, upsert_plan_model).await?;

    Ok(Json(plan))
}

pub(crate) fn require_admin(auth: &AuthUser) -> Result<(), AppError> {
    if auth.is_admin() {
        return Ok(());
    }

    warn!(user_id = %auth.user_id, role = %auth.role, "plans router: admin route refused");
    Err(AppError::Forbidden(
        "administrator role required".to_string(),
    ))
}
