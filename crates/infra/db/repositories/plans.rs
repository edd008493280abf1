use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::postgres::{postgres_connection::PgPoolSquad, schema::plans};
use domain::{
    entities::plans::{NewPlanEntity, PlanChangesetRow, PlanEntity, PlanRow},
    repositories::plans::PlanRepository,
    value_objects::enums::plan_names::PlanName,
};

pub struct PlanPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn into_entities(rows: Vec<PlanRow>) -> Result<Vec<PlanEntity>> {
    rows.into_iter().map(PlanEntity::try_from).collect()
}

#[async_trait]
impl PlanRepository for PlanPostgres {
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = plans::table
            .filter(plans::id.eq(plan_id))
            .select(PlanRow::as_select())
            .first::<PlanRow>(&mut conn)
            .optional()?;

        row.map(PlanEntity::try_from).transpose()
    }

    async fn find_by_name(&self, name: PlanName) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = plans::table
            .filter(plans::name.eq(name.as_str()))
            .select(PlanRow::as_select())
            .first::<PlanRow>(&mut conn)
            .optional()?;

        row.map(PlanEntity::try_from).transpose()
    }

    async fn list_plans(&self) -> Result<Vec<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = plans::table
            .order(plans::created_at.asc())
            .select(PlanRow::as_select())
            .load::<PlanRow>(&mut conn)?;

        into_entities(rows)
    }

    async fn list_default_free_flagged(&self) -> Result<Vec<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = plans::table
            .filter(plans::is_default_free.eq(true))
            .select(PlanRow::as_select())
            .load::<PlanRow>(&mut conn)?;

        into_entities(rows)
    }

    async fn find_active_default_free_plan(&self) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = plans::table
            .filter(plans::is_default_free.eq(true))
            .filter(plans::is_active.eq(true))
            .select(PlanRow::as_select())
            .first::<PlanRow>(&mut conn)
            .optional()?;

        row.map(PlanEntity::try_from).transpose()
    }

    async fn insert(&self, new_plan: NewPlanEntity) -> Result<PlanEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let changeset = PlanChangesetRow::try_from(&new_plan)?;

        let row = insert_into(plans::table)
            .values(&changeset)
            .returning(PlanRow::as_returning())
            .get_result::<PlanRow>(&mut conn)?;

        PlanEntity::try_from(row)
    }

    async fn update(&self, plan_id: Uuid, changes: NewPlanEntity) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let changeset = PlanChangesetRow::try_from(&changes)?;

        let row = update(plans::table.filter(plans::id.eq(plan_id)))
            .set((&changeset, plans::updated_at.eq(chrono::Utc::now())))
            .returning(PlanRow::as_returning())
            .get_result::<PlanRow>(&mut conn)
            .optional()?;

        row.map(PlanEntity::try_from).transpose()
    }
}
