use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        enums::{plan_durations::PlanDuration, plan_names::PlanName},
        plans::PlanLimits,
    },
    infra::db::postgres::schema::plans,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntity {
    pub id: Uuid,
    pub name: PlanName,
    pub duration: PlanDuration,
    pub price_minor: Option<i64>,
    pub limits: PlanLimits,
    pub is_default_free: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated plan attributes, used for both inserts and full updates.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlanEntity {
    pub name: PlanName,
    pub duration: PlanDuration,
    pub price_minor: Option<i64>,
    pub limits: PlanLimits,
    pub is_default_free: bool,
    pub is_active: bool,
}

/// Raw row used for Diesel queries. Limits stay as JSON and are parsed into PlanLimits.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanRow {
    pub id: Uuid,
    pub name: String,
    pub duration: String,
    pub price_minor: Option<i64>,
    pub limits: serde_json::Value,
    pub is_default_free: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = plans)]
#[diesel(treat_none_as_null = true)]
pub struct PlanChangesetRow {
    pub name: String,
    pub duration: String,
    pub price_minor: Option<i64>,
    pub limits: serde_json::Value,
    pub is_default_free: bool,
    pub is_active: bool,
}

impl TryFrom<PlanRow> for PlanEntity {
    type Error = anyhow::Error;

    fn try_from(value: PlanRow) -> Result<Self> {
        let name = PlanName::from_str(&value.name)
            .ok_or_else(|| anyhow!("plan {} has unknown name {:?}", value.id, value.name))?;
        let duration = PlanDuration::from_str(&value.duration).ok_or_else(|| {
            anyhow!(
                "plan {} has unknown duration {:?}",
                value.id,
                value.duration
            )
        })?;
        let limits = serde_json::from_value(value.limits)
            .map_err(|err| anyhow!("plan {} has malformed limits: {}", value.id, err))?;

        Ok(Self {
            id: value.id,
            name,
            duration,
            price_minor: value.price_minor,
            limits,
            is_default_free: value.is_default_free,
            is_active: value.is_active,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

impl TryFrom<&NewPlanEntity> for PlanChangesetRow {
    type Error = anyhow::Error;

    fn try_from(value: &NewPlanEntity) -> Result<Self> {
        Ok(Self {
            name: value.name.to_string(),
            duration: value.duration.to_string(),
            price_minor: value.price_minor,
            limits: serde_json::to_value(value.limits)?,
            is_default_free: value.is_default_free,
            is_active: value.is_active,
        })
    }
}
