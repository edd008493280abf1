use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, dsl::count_star, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::postgres::{postgres_connection::PgPoolSquad, schema::group_members};
use domain::{
    repositories::group_members::GroupMemberRepository,
    value_objects::enums::membership_statuses::MembershipStatus,
};

pub struct GroupMemberPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl GroupMemberPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl GroupMemberRepository for GroupMemberPostgres {
    async fn count_approved_members(&self, group_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = group_members::table
            .filter(group_members::group_id.eq(group_id))
            .filter(group_members::status.eq(MembershipStatus::Approved.to_string()))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(total)
    }
}
