//! In-memory store implementing every repository trait.
//!
//! Each table is a `HashMap` behind a `tokio::sync::RwLock`; conditional updates take
//! the write lock for the whole check-and-set, which gives the same atomicity as the
//! single-statement Postgres updates.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        app_users::AppUserEntity,
        group_members::GroupMemberEntity,
        plans::{NewPlanEntity, PlanEntity},
    },
    repositories::{
        app_users::AppUserRepository, group_members::GroupMemberRepository,
        plans::PlanRepository,
    },
    value_objects::{
        enums::{
            membership_statuses::MembershipStatus, plan_names::PlanName,
            resource_kinds::ResourceKind, user_roles::UserRole,
        },
        subscriptions::RevertSubscriptionModel,
    },
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    plans: Arc<RwLock<HashMap<Uuid, PlanEntity>>>,
    users: Arc<RwLock<HashMap<Uuid, AppUserEntity>>>,
    members: Arc<RwLock<Vec<GroupMemberEntity>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_plan(&self, plan: PlanEntity) {
        self.plans.write().await.insert(plan.id, plan);
    }

    pub async fn put_user(&self, user: AppUserEntity) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn put_member(&self, member: GroupMemberEntity) {
        self.members.write().await.push(member);
    }

    pub async fn user(&self, user_id: Uuid) -> Option<AppUserEntity> {
        self.users.read().await.get(&user_id).cloned()
    }

    pub async fn plan(&self, plan_id: Uuid) -> Option<PlanEntity> {
        self.plans.read().await.get(&plan_id).cloned()
    }
}

#[async_trait]
impl PlanRepository for InMemoryStore {
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        Ok(self.plan(plan_id).await)
    }

    async fn find_by_name(&self, name: PlanName) -> Result<Option<PlanEntity>> {
        Ok(self
            .plans
            .read()
            .await
            .values()
            .find(|plan| plan.name == name)
            .cloned())
    }

    async fn list_plans(&self) -> Result<Vec<PlanEntity>> {
        let mut plans: Vec<PlanEntity> = self.plans.read().await.values().cloned().collect();
        plans.sort_by_key(|plan| plan.created_at);
        Ok(plans)
    }

    async fn list_default_free_flagged(&self) -> Result<Vec<PlanEntity>> {
        Ok(self
            .plans
            .read()
            .await
            .values()
            .filter(|plan| plan.is_default_free)
            .cloned()
            .collect())
    }

    async fn find_active_default_free_plan(&self) -> Result<Option<PlanEntity>> {
        Ok(self
            .plans
            .read()
            .await
            .values()
            .find(|plan| plan.is_default_free && plan.is_active)
            .cloned())
    }

    async fn insert(&self, new_plan: NewPlanEntity) -> Result<PlanEntity> {
        let mut plans = self.plans.write().await;

        if plans.values().any(|plan| plan.name == new_plan.name) {
            return Err(anyhow!("duplicate plan name {}", new_plan.name));
        }

        let now = Utc::now();
        let plan = PlanEntity {
            id: Uuid::new_v4(),
            name: new_plan.name,
            duration: new_plan.duration,
            price_minor: new_plan.price_minor,
            limits: new_plan.limits,
            is_default_free: new_plan.is_default_free,
            is_active: new_plan.is_active,
            created_at: now,
            updated_at: now,
        };
        plans.insert(plan.id, plan.clone());

        Ok(plan)
    }

    async fn update(&self, plan_id: Uuid, changes: NewPlanEntity) -> Result<Option<PlanEntity>> {
        let mut plans = self.plans.write().await;

        let Some(plan) = plans.get_mut(&plan_id) else {
            return Ok(None);
        };
        plan.name = changes.name;
        plan.duration = changes.duration;
        plan.price_minor = changes.price_minor;
        plan.limits = changes.limits;
        plan.is_default_free = changes.is_default_free;
        plan.is_active = changes.is_active;
        plan.updated_at = Utc::now();

        Ok(Some(plan.clone()))
    }
}

#[async_trait]
impl AppUserRepository for InMemoryStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<AppUserEntity>> {
        Ok(self.user(user_id).await)
    }

    async fn try_increment_usage(
        &self,
        user_id: Uuid,
        kind: ResourceKind,
        limit: i64,
    ) -> Result<Option<i64>> {
        let mut users = self.users.write().await;

        let Some(user) = users.get_mut(&user_id) else {
            return Ok(None);
        };
        let counter = user.usage.count_for_mut(kind);
        if *counter >= limit {
            return Ok(None);
        }
        *counter += 1;
        let used = *counter;
        user.updated_at = Utc::now();

        Ok(Some(used))
    }

    async fn decrement_usage(&self, user_id: Uuid, kind: ResourceKind) -> Result<bool> {
        let mut users = self.users.write().await;

        let Some(user) = users.get_mut(&user_id) else {
            return Ok(false);
        };
        let counter = user.usage.count_for_mut(kind);
        if *counter <= 0 {
            return Ok(false);
        }
        *counter -= 1;
        user.updated_at = Utc::now();

        Ok(true)
    }

    async fn list_teachers_with_subscription_ended_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AppUserEntity>> {
        let mut users: Vec<AppUserEntity> = self
            .users
            .read()
            .await
            .values()
            .filter(|user| user.role == UserRole::Teacher)
            .filter(|user| matches!(user.subscription_end_date, Some(end) if end < cutoff))
            .cloned()
            .collect();
        users.sort_by_key(|user| user.subscription_end_date);

        Ok(users)
    }

    async fn revert_subscription(&self, revert_model: RevertSubscriptionModel) -> Result<bool> {
        let mut users = self.users.write().await;

        let Some(user) = users.get_mut(&revert_model.user_id) else {
            return Ok(false);
        };
        if user.plan_id != revert_model.expected_plan_id
            || user.subscription_end_date != revert_model.expected_end_date
        {
            return Ok(false);
        }
        user.plan_id = Some(revert_model.plan_id);
        user.subscription_end_date = revert_model.subscription_end_date;
        user.updated_at = Utc::now();

        Ok(true)
    }
}

#[async_trait]
impl GroupMemberRepository for InMemoryStore {
    async fn count_approved_members(&self, group_id: Uuid) -> Result<i64> {
        let total = self
            .members
            .read()
            .await
            .iter()
            .filter(|member| member.group_id == group_id)
            .filter(|member| member.status == MembershipStatus::Approved)
            .count();

        Ok(total as i64)
    }
}
