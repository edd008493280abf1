use std::sync::Arc;

use crates::domain::{
    entities::plans::NewPlanEntity,
    repositories::plans::PlanRepository,
    value_objects::{
        enums::{plan_durations::PlanDuration, plan_names::PlanName},
        plans::{PlanDto, UpsertPlanModel},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PlanRegistryError {
    #[error("{0}")]
    Validation(String),
    #[error("plan not found")]
    PlanNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PlanRegistryError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PlanRegistryError::Validation(_) => StatusCode::BAD_REQUEST,
            PlanRegistryError::PlanNotFound => StatusCode::NOT_FOUND,
            PlanRegistryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PlanRegistryError>;

/// Checks a create/update payload in isolation. Cross-plan rules (unique name, single
/// default free plan) need the store and live in [`PlanRegistryUseCase`].
pub fn validate_plan_model(model: &UpsertPlanModel) -> UseCaseResult<NewPlanEntity> {
    let raw_name = model
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PlanRegistryError::Validation("plan name is required".to_string()))?;

    let name = PlanName::from_str(raw_name).ok_or_else(|| {
        let allowed = PlanName::ALL
            .iter()
            .map(|name| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        PlanRegistryError::Validation(format!(
            "plan name {raw_name:?} is not one of: {allowed}"
        ))
    })?;

    let raw_duration = model
        .duration
        .as_deref()
        .map(str::trim)
        .filter(|duration| !duration.is_empty())
        .ok_or_else(|| PlanRegistryError::Validation("plan duration is required".to_string()))?;

    let duration = PlanDuration::from_str(raw_duration).ok_or_else(|| {
        PlanRegistryError::Validation(format!(
            "plan duration {raw_duration:?} must be monthly, quarterly, annual or indefinite"
        ))
    })?;

    match model.price_minor {
        None if !name.is_free_tier() => {
            return Err(PlanRegistryError::Validation(format!(
                "price is required for the {name} plan"
            )));
        }
        Some(price) if price < 0 => {
            return Err(PlanRegistryError::Validation(
                "price must not be negative".to_string(),
            ));
        }
        _ => {}
    }

    if let Some((field, value)) = model.limits.first_negative() {
        return Err(PlanRegistryError::Validation(format!(
            "limits.{field} must not be negative (got {value})"
        )));
    }

    Ok(NewPlanEntity {
        name,
        duration,
        price_minor: model.price_minor,
        limits: model.limits,
        is_default_free: model.is_default_free,
        is_active: model.is_active.unwrap_or(true),
    })
}

pub struct PlanRegistryUseCase<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
}

impl<P> PlanRegistryUseCase<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    pub fn new(plan_repo: Arc<P>) -> Self {
        Self { plan_repo }
    }

    pub async fn list_plans(&self) -> UseCaseResult<Vec<PlanDto>> {
        let plans = self.plan_repo.list_plans().await.map_err(|err| {
            error!(db_error = ?err, "plans: failed to list plans");
            PlanRegistryError::Internal(err)
        })?;
        info!(plan_count = plans.len(), "plans: plans loaded");

        Ok(plans.into_iter().map(PlanDto::from).collect())
    }

    pub async fn find_plan(&self, plan_id: Uuid) -> UseCaseResult<PlanDto> {
        let plan = self.plan_repo.find_by_id(plan_id).await.map_err(|err| {
            error!(%plan_id, db_error = ?err, "plans: failed to load plan");
            PlanRegistryError::Internal(err)
        })?;

        plan.map(PlanDto::from)
            .ok_or(PlanRegistryError::PlanNotFound)
    }

    pub async fn create_plan(&self, model: UpsertPlanModel) -> UseCaseResult<PlanDto> {
        let new_plan = validate_plan_model(&model).map_err(|err| {
            warn!(error = %err, "plans: create rejected by validation");
            err
        })?;

        self.ensure_unique_name(&new_plan, None).await?;
        self.ensure_single_default_free(&new_plan, None).await?;

        let plan = self.plan_repo.insert(new_plan).await.map_err(|err| {
            error!(db_error = ?err, "plans: failed to insert plan");
            PlanRegistryError::Internal(err)
        })?;
        info!(
            plan_id = %plan.id,
            name = %plan.name,
            is_default_free = plan.is_default_free,
            "plans: plan created"
        );

        Ok(plan.into())
    }

    pub async fn update_plan(
        &self,
        plan_id: Uuid,
        model: UpsertPlanModel,
    ) -> UseCaseResult<PlanDto> {
        let changes = validate_plan_model(&model).map_err(|err| {
            warn!(%plan_id, error = %err, "plans: update rejected by validation");
            err
        })?;

        self.ensure_unique_name(&changes, Some(plan_id)).await?;
        self.ensure_single_default_free(&changes, Some(plan_id))
            .await?;

        let plan = self
            .plan_repo
            .update(plan_id, changes)
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "plans: failed to update plan");
                PlanRegistryError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%plan_id, "plans: update target not found");
                PlanRegistryError::PlanNotFound
            })?;
        info!(%plan_id, name = %plan.name, "plans: plan updated");

        Ok(plan.into())
    }

    async fn ensure_unique_name(
        &self,
        plan: &NewPlanEntity,
        saving_id: Option<Uuid>,
    ) -> UseCaseResult<()> {
        let existing = self.plan_repo.find_by_name(plan.name).await.map_err(|err| {
            error!(name = %plan.name, db_error = ?err, "plans: failed to look up plan by name");
            PlanRegistryError::Internal(err)
        })?;

        match existing {
            Some(other) if Some(other.id) != saving_id => {
                warn!(name = %plan.name, existing_id = %other.id, "plans: duplicate plan name");
                Err(PlanRegistryError::Validation(format!(
                    "a plan named {} already exists",
                    plan.name
                )))
            }
            _ => Ok(()),
        }
    }

    /// At most one plan may carry the default-free flag.
    async fn ensure_single_default_free(
        &self,
        plan: &NewPlanEntity,
        saving_id: Option<Uuid>,
    ) -> UseCaseResult<()> {
        if !plan.is_default_free {
            return Ok(());
        }

        let flagged = self
            .plan_repo
            .list_default_free_flagged()
            .await
            .map_err(|err| {
                error!(db_error = ?err, "plans: failed to load default free plans");
                PlanRegistryError::Internal(err)
            })?;

        if let Some(other) = flagged
            .into_iter()
            .find(|other| Some(other.id) != saving_id)
        {
            warn!(
                existing_id = %other.id,
                existing_name = %other.name,
                "plans: second default free plan rejected"
            );
            return Err(PlanRegistryError::Validation(format!(
                "the {} plan is already the default free plan",
                other.name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crates::domain::{
        entities::plans::PlanEntity, repositories::plans::MockPlanRepository,
        value_objects::plans::PlanLimits,
    };
    use mockall::predicate::eq;

    fn sample_plan(name: PlanName, is_default_free: bool) -> PlanEntity {
        PlanEntity {
            id: Uuid::new_v4(),
            name,
            duration: PlanDuration::Indefinite,
            price_minor: None,
            limits: PlanLimits::default(),
            is_default_free,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn model(name: &str, duration: &str, price_minor: Option<i64>) -> UpsertPlanModel {
        UpsertPlanModel {
            name: Some(name.to_string()),
            duration: Some(duration.to_string()),
            price_minor,
            limits: PlanLimits {
                max_groups: 2,
                max_students_per_group: 30,
                max_routes: 3,
                max_resources: 10,
                max_activities: 10,
            },
            is_default_free: false,
            is_active: None,
        }
    }

    fn created_from(new_plan: NewPlanEntity) -> PlanEntity {
        PlanEntity {
            id: Uuid::new_v4(),
            name: new_plan.name,
            duration: new_plan.duration,
            price_minor: new_plan.price_minor,
            limits: new_plan.limits,
            is_default_free: new_plan.is_default_free,
            is_active: new_plan.is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_missing_or_unknown_name() {
        let mut missing = model("basic", "monthly", Some(900));
        missing.name = None;
        assert!(matches!(
            validate_plan_model(&missing),
            Err(PlanRegistryError::Validation(_))
        ));

        let unknown = model("platinum", "monthly", Some(900));
        let err = validate_plan_model(&unknown).unwrap_err();
        assert!(err.to_string().contains("platinum"));
    }

    #[test]
    fn price_is_required_except_for_free_tier() {
        let paid = model("premium", "monthly", None);
        let err = validate_plan_model(&paid).unwrap_err();
        assert!(err.to_string().contains("price is required"));

        let free = model("free", "indefinite", None);
        let plan = validate_plan_model(&free).unwrap();
        assert_eq!(plan.name, PlanName::Free);
        assert!(plan.is_active);
    }

    #[test]
    fn rejects_negative_price_and_limits() {
        let negative_price = model("basic", "monthly", Some(-1));
        assert!(validate_plan_model(&negative_price).is_err());

        let mut negative_limit = model("basic", "monthly", Some(900));
        negative_limit.limits.max_activities = -5;
        let err = validate_plan_model(&negative_limit).unwrap_err();
        assert!(err.to_string().contains("max_activities"));
    }

    #[test]
    fn rejects_unknown_duration() {
        let weekly = model("basic", "weekly", Some(900));
        assert!(matches!(
            validate_plan_model(&weekly),
            Err(PlanRegistryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn create_rejects_second_default_free_plan() {
        let mut plan_repo = MockPlanRepository::new();
        let existing_default = sample_plan(PlanName::Free, true);

        plan_repo
            .expect_find_by_name()
            .with(eq(PlanName::Basic))
            .returning(|_| Ok(None));
        plan_repo
            .expect_list_default_free_flagged()
            .returning(move || Ok(vec![existing_default.clone()]));
        plan_repo.expect_insert().never();

        let usecase = PlanRegistryUseCase::new(Arc::new(plan_repo));
        let mut payload = model("basic", "indefinite", Some(0));
        payload.is_default_free = true;

        let err = usecase.create_plan(payload).await.unwrap_err();
        assert!(matches!(err, PlanRegistryError::Validation(_)));
        assert!(err.to_string().contains("default free plan"));
    }

    #[tokio::test]
    async fn update_may_keep_default_flag_on_the_same_plan() {
        let mut plan_repo = MockPlanRepository::new();
        let existing_default = sample_plan(PlanName::Free, true);
        let plan_id = existing_default.id;
        let for_name = existing_default.clone();
        let for_flag = existing_default.clone();

        plan_repo
            .expect_find_by_name()
            .with(eq(PlanName::Free))
            .returning(move |_| Ok(Some(for_name.clone())));
        plan_repo
            .expect_list_default_free_flagged()
            .returning(move || Ok(vec![for_flag.clone()]));
        plan_repo
            .expect_update()
            .withf(move |id, changes| *id == plan_id && changes.is_default_free)
            .returning(|_, changes| Ok(Some(created_from(changes))));

        let usecase = PlanRegistryUseCase::new(Arc::new(plan_repo));
        let mut payload = model("free", "indefinite", None);
        payload.is_default_free = true;

        let plan = usecase.update_plan(plan_id, payload).await.unwrap();
        assert!(plan.is_default_free);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_name() {
        let mut plan_repo = MockPlanRepository::new();
        let existing = sample_plan(PlanName::Pro, false);

        plan_repo
            .expect_find_by_name()
            .returning(move |_| Ok(Some(existing.clone())));
        plan_repo.expect_insert().never();

        let usecase = PlanRegistryUseCase::new(Arc::new(plan_repo));
        let err = usecase
            .create_plan(model("pro", "monthly", Some(1900)))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn create_persists_valid_plan() {
        let mut plan_repo = MockPlanRepository::new();

        plan_repo.expect_find_by_name().returning(|_| Ok(None));
        plan_repo
            .expect_insert()
            .times(1)
            .returning(|new_plan| Ok(created_from(new_plan)));

        let usecase = PlanRegistryUseCase::new(Arc::new(plan_repo));
        let plan = usecase
            .create_plan(model("premium", "annual", Some(9900)))
            .await
            .unwrap();

        assert_eq!(plan.name, PlanName::Premium);
        assert_eq!(plan.duration, PlanDuration::Annual);
        assert_eq!(plan.limits.max_routes, 3);
    }

    #[tokio::test]
    async fn update_of_missing_plan_is_not_found() {
        let mut plan_repo = MockPlanRepository::new();

        plan_repo.expect_find_by_name().returning(|_| Ok(None));
        plan_repo.expect_update().returning(|_, _| Ok(None));

        let usecase = PlanRegistryUseCase::new(Arc::new(plan_repo));
        let err = usecase
            .update_plan(Uuid::new_v4(), model("basic", "monthly", Some(900)))
            .await
            .unwrap_err();

        assert!(matches!(err, PlanRegistryError::PlanNotFound));
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_internal() {
        let mut plan_repo = MockPlanRepository::new();

        plan_repo
            .expect_list_plans()
            .returning(|| Err(anyhow::anyhow!("connection refused")));

        let usecase = PlanRegistryUseCase::new(Arc::new(plan_repo));
        let err = usecase.list_plans().await.unwrap_err();

        assert!(matches!(err, PlanRegistryError::Internal(_)));
    }
}
