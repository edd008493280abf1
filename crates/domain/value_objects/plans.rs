use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::plans::PlanEntity;
use crate::domain::value_objects::enums::{
    plan_durations::PlanDuration, plan_names::PlanName, resource_kinds::ResourceKind,
};

/// Numeric limits attached to a plan. Stored as JSONB in the database with
/// snake_case keys; camelCase keys are accepted on input. Unknown keys are an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PlanLimits {
    #[serde(default, alias = "maxGroups")]
    pub max_groups: i64,

    #[serde(default, alias = "maxStudentsPerGroup")]
    pub max_students_per_group: i64,

    #[serde(default, alias = "maxRoutes")]
    pub max_routes: i64,

    #[serde(default, alias = "maxResources")]
    pub max_resources: i64,

    #[serde(default, alias = "maxActivities")]
    pub max_activities: i64,
}

impl PlanLimits {
    pub fn limit_for(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Group => self.max_groups,
            ResourceKind::LearningPath => self.max_routes,
            ResourceKind::Resource => self.max_resources,
            ResourceKind::Activity => self.max_activities,
        }
    }

    /// Returns the first limit holding a negative value, by field name.
    pub fn first_negative(&self) -> Option<(&'static str, i64)> {
        [
            ("max_groups", self.max_groups),
            ("max_students_per_group", self.max_students_per_group),
            ("max_routes", self.max_routes),
            ("max_resources", self.max_resources),
            ("max_activities", self.max_activities),
        ]
        .into_iter()
        .find(|(_, value)| *value < 0)
    }
}

/// Create/update payload for a plan. Everything is optional here so the registry
/// can report precise validation errors instead of a generic deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpsertPlanModel {
    pub name: Option<String>,
    pub duration: Option<String>,
    pub price_minor: Option<i64>,
    #[serde(default)]
    pub limits: PlanLimits,
    #[serde(default)]
    pub is_default_free: bool,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanDto {
    pub id: Uuid,
    pub name: PlanName,
    pub duration: PlanDuration,
    pub price_minor: Option<i64>,
    pub limits: PlanLimits,
    pub is_default_free: bool,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<PlanEntity> for PlanDto {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            duration: value.duration,
            price_minor: value.price_minor,
            limits: value.limits,
            is_default_free: value.is_default_free,
            is_active: value.is_active,
            updated_at: value.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_for_maps_each_kind_to_its_field() {
        let limits = PlanLimits {
            max_groups: 1,
            max_students_per_group: 2,
            max_routes: 3,
            max_resources: 4,
            max_activities: 5,
        };

        assert_eq!(limits.limit_for(ResourceKind::Group), 1);
        assert_eq!(limits.limit_for(ResourceKind::LearningPath), 3);
        assert_eq!(limits.limit_for(ResourceKind::Resource), 4);
        assert_eq!(limits.limit_for(ResourceKind::Activity), 5);
    }

    #[test]
    fn first_negative_reports_offending_field() {
        let limits = PlanLimits {
            max_resources: -1,
            ..Default::default()
        };

        assert_eq!(limits.first_negative(), Some(("max_resources", -1)));
        assert_eq!(PlanLimits::default().first_negative(), None);
    }

    #[test]
    fn missing_limit_fields_default_to_zero() {
        let limits: PlanLimits = serde_json::from_value(serde_json::json!({
            "max_groups": 3
        }))
        .unwrap();

        assert_eq!(limits.max_groups, 3);
        assert_eq!(limits.max_routes, 0);
    }
}
