use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{enums::user_roles::UserRole, usage::UsageCounters},
    infra::db::postgres::schema::app_users,
};

/// The subscription-relevant subset of a platform account.
#[derive(Debug, Clone, PartialEq)]
pub struct AppUserEntity {
    pub id: Uuid,
    pub role: UserRole,
    pub plan_id: Option<Uuid>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub usage: UsageCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = app_users)]
pub struct AppUserRow {
    pub id: Uuid,
    pub role: String,
    pub plan_id: Option<Uuid>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub groups_created: i64,
    pub resources_generated: i64,
    pub activities_generated: i64,
    pub routes_created: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AppUserRow> for AppUserEntity {
    type Error = anyhow::Error;

    fn try_from(value: AppUserRow) -> Result<Self> {
        let role = UserRole::from_str(&value.role)
            .ok_or_else(|| anyhow!("user {} has unknown role {:?}", value.id, value.role))?;

        Ok(Self {
            id: value.id,
            role,
            plan_id: value.plan_id,
            subscription_end_date: value.subscription_end_date,
            usage: UsageCounters {
                groups_created: value.groups_created,
                resources_generated: value.resources_generated,
                activities_generated: value.activities_generated,
                routes_created: value.routes_created,
            },
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
