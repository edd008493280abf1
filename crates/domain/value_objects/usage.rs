use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    plan_names::PlanName, resource_kinds::ResourceKind, user_roles::UserRole,
};

/// Running totals of live resources owned by a teacher.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageCounters {
    pub groups_created: i64,
    pub resources_generated: i64,
    pub activities_generated: i64,
    pub routes_created: i64,
}

impl UsageCounters {
    pub fn count_for(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Group => self.groups_created,
            ResourceKind::LearningPath => self.routes_created,
            ResourceKind::Resource => self.resources_generated,
            ResourceKind::Activity => self.activities_generated,
        }
    }

    pub fn count_for_mut(&mut self, kind: ResourceKind) -> &mut i64 {
        match kind {
            ResourceKind::Group => &mut self.groups_created,
            ResourceKind::LearningPath => &mut self.routes_created,
            ResourceKind::Resource => &mut self.resources_generated,
            ResourceKind::Activity => &mut self.activities_generated,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuotaDto {
    pub kind: ResourceKind,
    pub used: i64,
    /// `None` when the user is not bound by a plan.
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UsageSummaryDto {
    pub user_id: Uuid,
    pub role: UserRole,
    pub plan_name: Option<PlanName>,
    pub quotas: Vec<QuotaDto>,
    pub max_students_per_group: Option<i64>,
}
