use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[automock]
#[async_trait]
pub trait GroupMemberRepository {
    async fn count_approved_members(&self, group_id: Uuid) -> Result<i64>;
}
