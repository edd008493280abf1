use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::{app_users::AppUserEntity, plans::PlanEntity};
use crate::domain::value_objects::plans::PlanDto;

/// Why a status check ended the way it did. `Misconfigured` and `Internal` are faults,
/// everything else is an ordinary answer.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusOutcome {
    Active,
    Exempt,
    Invalid,
    NotFound,
    PlanInactive,
    Expired,
    Misconfigured,
    Internal,
}

impl StatusOutcome {
    pub fn is_fault(&self) -> bool {
        matches!(self, StatusOutcome::Misconfigured | StatusOutcome::Internal)
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionStatusReport {
    pub is_active: bool,
    pub outcome: StatusOutcome,
    pub message: String,
    pub plan: Option<PlanEntity>,
    pub user: Option<AppUserEntity>,
}

impl SubscriptionStatusReport {
    pub fn active(
        outcome: StatusOutcome,
        message: impl Into<String>,
        user: AppUserEntity,
        plan: Option<PlanEntity>,
    ) -> Self {
        Self {
            is_active: true,
            outcome,
            message: message.into(),
            plan,
            user: Some(user),
        }
    }

    pub fn inactive(
        outcome: StatusOutcome,
        message: impl Into<String>,
        user: Option<AppUserEntity>,
        plan: Option<PlanEntity>,
    ) -> Self {
        Self {
            is_active: false,
            outcome,
            message: message.into(),
            plan,
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusDto {
    pub is_active: bool,
    pub outcome: StatusOutcome,
    pub message: String,
    pub plan: Option<PlanDto>,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

impl From<SubscriptionStatusReport> for SubscriptionStatusDto {
    fn from(value: SubscriptionStatusReport) -> Self {
        Self {
            is_active: value.is_active,
            outcome: value.outcome,
            message: value.message,
            plan: value.plan.map(PlanDto::from),
            subscription_end_date: value.user.and_then(|user| user.subscription_end_date),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefusalKind {
    LimitReached,
    Misconfigured,
    Internal,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum QuotaDecision {
    Allowed {
        used: i64,
        /// `None` when the actor bypasses plan limits.
        limit: Option<i64>,
    },
    Refused {
        kind: RefusalKind,
        message: String,
    },
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }

    pub fn refused(kind: RefusalKind, message: impl Into<String>) -> Self {
        QuotaDecision::Refused {
            kind,
            message: message.into(),
        }
    }
}

/// Conditional plan reassignment: applied only while the user still holds
/// `expected_plan_id` and `expected_end_date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertSubscriptionModel {
    pub user_id: Uuid,
    pub expected_plan_id: Option<Uuid>,
    pub expected_end_date: Option<DateTime<Utc>>,
    pub plan_id: Uuid,
    pub subscription_end_date: Option<DateTime<Utc>>,
}
