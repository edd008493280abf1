use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::plans::{NewPlanEntity, PlanEntity};
use crate::domain::value_objects::enums::plan_names::PlanName;

#[automock]
#[async_trait]
pub trait PlanRepository {
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>>;
    async fn find_by_name(&self, name: PlanName) -> Result<Option<PlanEntity>>;
    async fn list_plans(&self) -> Result<Vec<PlanEntity>>;
    /// Every plan carrying the default-free flag, active or not.
    async fn list_default_free_flagged(&self) -> Result<Vec<PlanEntity>>;
    async fn find_active_default_free_plan(&self) -> Result<Option<PlanEntity>>;
    async fn insert(&self, new_plan: NewPlanEntity) -> Result<PlanEntity>;
    async fn update(&self, plan_id: Uuid, changes: NewPlanEntity) -> Result<Option<PlanEntity>>;
}
