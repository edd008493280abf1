use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::app_users::AppUserEntity;
use crate::domain::value_objects::{
    enums::resource_kinds::ResourceKind, subscriptions::RevertSubscriptionModel,
};

#[automock]
#[async_trait]
pub trait AppUserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<AppUserEntity>>;

    /// Increments the usage counter for `kind` only while it is below `limit`, in a
    /// single storage operation. Returns the stored counter after the increment, or
    /// `None` when the limit was already reached.
    async fn try_increment_usage(
        &self,
        user_id: Uuid,
        kind: ResourceKind,
        limit: i64,
    ) -> Result<Option<i64>>;

    /// Decrements the usage counter for `kind`, never below zero. Returns whether a
    /// row changed.
    async fn decrement_usage(&self, user_id: Uuid, kind: ResourceKind) -> Result<bool>;

    async fn list_teachers_with_subscription_ended_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AppUserEntity>>;

    /// Returns false when the user no longer matches the expected plan/end date.
    async fn revert_subscription(&self, revert_model: RevertSubscriptionModel) -> Result<bool>;
}
