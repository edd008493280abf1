use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::value_objects::enums::membership_statuses::MembershipStatus;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupMemberEntity {
    pub group_id: Uuid,
    pub student_id: Uuid,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
}
