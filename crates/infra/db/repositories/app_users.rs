use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::postgres::{postgres_connection::PgPoolSquad, schema::app_users};
use domain::{
    entities::app_users::{AppUserEntity, AppUserRow},
    repositories::app_users::AppUserRepository,
    value_objects::{
        enums::{resource_kinds::ResourceKind, user_roles::UserRole},
        subscriptions::RevertSubscriptionModel,
    },
};

pub struct AppUserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AppUserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AppUserRepository for AppUserPostgres {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<AppUserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = app_users::table
            .filter(app_users::id.eq(user_id))
            .select(AppUserRow::as_select())
            .first::<AppUserRow>(&mut conn)
            .optional()?;

        row.map(AppUserEntity::try_from).transpose()
    }

    async fn try_increment_usage(
        &self,
        user_id: Uuid,
        kind: ResourceKind,
        limit: i64,
    ) -> Result<Option<i64>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();
        let target = app_users::table.filter(app_users::id.eq(user_id));

        // UPDATE ... SET counter = counter + 1 WHERE id = $1 AND counter < $limit RETURNING counter
        let used = match kind {
            ResourceKind::Group => update(target.filter(app_users::groups_created.lt(limit)))
                .set((
                    app_users::groups_created.eq(app_users::groups_created + 1_i64),
                    app_users::updated_at.eq(now),
                ))
                .returning(app_users::groups_created)
                .get_result::<i64>(&mut conn)
                .optional()?,
            ResourceKind::LearningPath => {
                update(target.filter(app_users::routes_created.lt(limit)))
                    .set((
                        app_users::routes_created.eq(app_users::routes_created + 1_i64),
                        app_users::updated_at.eq(now),
                    ))
                    .returning(app_users::routes_created)
                    .get_result::<i64>(&mut conn)
                    .optional()?
            }
            ResourceKind::Resource => {
                update(target.filter(app_users::resources_generated.lt(limit)))
                    .set((
                        app_users::resources_generated
                            .eq(app_users::resources_generated + 1_i64),
                        app_users::updated_at.eq(now),
                    ))
                    .returning(app_users::resources_generated)
                    .get_result::<i64>(&mut conn)
                    .optional()?
            }
            ResourceKind::Activity => {
                update(target.filter(app_users::activities_generated.lt(limit)))
                    .set((
                        app_users::activities_generated
                            .eq(app_users::activities_generated + 1_i64),
                        app_users::updated_at.eq(now),
                    ))
                    .returning(app_users::activities_generated)
                    .get_result::<i64>(&mut conn)
                    .optional()?
            }
        };

        Ok(used)
    }

    async fn decrement_usage(&self, user_id: Uuid, kind: ResourceKind) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();
        let target = app_users::table.filter(app_users::id.eq(user_id));

        let affected = match kind {
            ResourceKind::Group => update(target.filter(app_users::groups_created.gt(0_i64)))
                .set((
                    app_users::groups_created.eq(app_users::groups_created - 1_i64),
                    app_users::updated_at.eq(now),
                ))
                .execute(&mut conn)?,
            ResourceKind::LearningPath => {
                update(target.filter(app_users::routes_created.gt(0_i64)))
                    .set((
                        app_users::routes_created.eq(app_users::routes_created - 1_i64),
                        app_users::updated_at.eq(now),
                    ))
                    .execute(&mut conn)?
            }
            ResourceKind::Resource => {
                update(target.filter(app_users::resources_generated.gt(0_i64)))
                    .set((
                        app_users::resources_generated
                            .eq(app_users::resources_generated - 1_i64),
                        app_users::updated_at.eq(now),
                    ))
                    .execute(&mut conn)?
            }
            ResourceKind::Activity => {
                update(target.filter(app_users::activities_generated.gt(0_i64)))
                    .set((
                        app_users::activities_generated
                            .eq(app_users::activities_generated - 1_i64),
                        app_users::updated_at.eq(now),
                    ))
                    .execute(&mut conn)?
            }
        };

        Ok(affected == 1)
    }

    async fn list_teachers_with_subscription_ended_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AppUserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = app_users::table
            .filter(app_users::role.eq(UserRole::Teacher.to_string()))
            .filter(app_users::subscription_end_date.lt(cutoff))
            .order(app_users::subscription_end_date.asc())
            .select(AppUserRow::as_select())
            .load::<AppUserRow>(&mut conn)?;

        rows.into_iter().map(AppUserEntity::try_from).collect()
    }

    async fn revert_subscription(&self, revert_model: RevertSubscriptionModel) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(
            app_users::table
                .filter(app_users::id.eq(revert_model.user_id))
                .filter(app_users::plan_id.is_not_distinct_from(revert_model.expected_plan_id))
                .filter(
                    app_users::subscription_end_date
                        .is_not_distinct_from(revert_model.expected_end_date),
                ),
        )
        .set((
            app_users::plan_id.eq(Some(revert_model.plan_id)),
            app_users::subscription_end_date.eq(revert_model.subscription_end_date),
            app_users::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(affected == 1)
    }
}
