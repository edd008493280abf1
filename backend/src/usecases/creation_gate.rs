use std::sync::Arc;

use crates::domain::{
    repositories::{
        app_users::AppUserRepository, group_members::GroupMemberRepository,
        plans::PlanRepository,
    },
    value_objects::{
        enums::resource_kinds::ResourceKind,
        subscriptions::{QuotaDecision, RefusalKind, StatusOutcome, SubscriptionStatusReport},
    },
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{
    subscription_status::SubscriptionStatusUseCase,
    usage_limits::{Subscriber, UsageLimitUseCase},
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Allowed {
        used: i64,
        limit: Option<i64>,
    },
    SubscriptionInactive {
        outcome: StatusOutcome,
        message: String,
    },
    QuotaRefused {
        kind: RefusalKind,
        message: String,
    },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            GateDecision::Allowed { .. } => None,
            GateDecision::SubscriptionInactive { message, .. }
            | GateDecision::QuotaRefused { message, .. } => Some(message),
        }
    }
}

impl From<QuotaDecision> for GateDecision {
    fn from(value: QuotaDecision) -> Self {
        match value {
            QuotaDecision::Allowed { used, limit } => GateDecision::Allowed { used, limit },
            QuotaDecision::Refused { kind, message } => {
                GateDecision::QuotaRefused { kind, message }
            }
        }
    }
}

/// Runs every teacher creation through the subscription check first and the quota
/// reservation second.
pub struct CreationGateUseCase<U, P, G>
where
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    G: GroupMemberRepository + Send + Sync + 'static,
{
    subscription_status: SubscriptionStatusUseCase<U, P>,
    usage_limits: UsageLimitUseCase<U, G>,
}

impl<U, P, G> CreationGateUseCase<U, P, G>
where
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    G: GroupMemberRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, plan_repo: Arc<P>, group_member_repo: Arc<G>) -> Self {
        Self {
            subscription_status: SubscriptionStatusUseCase::new(Arc::clone(&user_repo), plan_repo),
            usage_limits: UsageLimitUseCase::new(user_repo, group_member_repo),
        }
    }

    pub async fn guard_creation(&self, user_id: &str, kind: ResourceKind) -> GateDecision {
        let subscriber = match self.active_subscriber(user_id).await {
            Ok(subscriber) => subscriber,
            Err(refusal) => return refusal,
        };

        let decision = self
            .usage_limits
            .check_and_reserve_quota(&subscriber, kind)
            .await;
        if !decision.is_allowed() {
            info!(
                user_id = %subscriber.user.id,
                %kind,
                "creation_gate: refused at quota stage"
            );
        }

        decision.into()
    }

    pub async fn guard_student_approval(&self, user_id: &str, group_id: Uuid) -> GateDecision {
        let subscriber = match self.active_subscriber(user_id).await {
            Ok(subscriber) => subscriber,
            Err(refusal) => return refusal,
        };

        self.usage_limits
            .check_group_student_capacity(&subscriber, group_id)
            .await
            .into()
    }

    async fn active_subscriber(&self, user_id: &str) -> Result<Subscriber, GateDecision> {
        let report = self
            .subscription_status
            .check_subscription_status(user_id)
            .await;

        let outcome = report.outcome;
        let message = report.message.clone();

        match Subscriber::from_report(report) {
            Some(subscriber) => Ok(subscriber),
            None => {
                info!(
                    raw_user_id = %user_id,
                    ?outcome,
                    "creation_gate: refused at subscription stage"
                );
                Err(GateDecision::SubscriptionInactive { outcome, message })
            }
        }
    }
}

/// Used by handlers that already hold a report, to keep the same refusal shape.
pub fn refusal_from_report(report: &SubscriptionStatusReport) -> GateDecision {
    GateDecision::SubscriptionInactive {
        outcome: report.outcome,
        message: report.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use crates::{
        domain::{
            entities::{app_users::AppUserEntity, plans::PlanEntity},
            value_objects::{
                enums::{
                    plan_durations::PlanDuration, plan_names::PlanName, user_roles::UserRole,
                },
                plans::PlanLimits,
                usage::UsageCounters,
            },
        },
        infra::db::memory::InMemoryStore,
    };

    fn plan(name: PlanName, duration: PlanDuration, limits: PlanLimits) -> PlanEntity {
        PlanEntity {
            id: Uuid::new_v4(),
            name,
            duration,
            price_minor: if name.is_free_tier() { None } else { Some(4900) },
            limits,
            is_default_free: name.is_free_tier(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn member(
        role: UserRole,
        plan: &PlanEntity,
        end: Option<chrono::DateTime<Utc>>,
        usage: UsageCounters,
    ) -> AppUserEntity {
        AppUserEntity {
            id: Uuid::new_v4(),
            role,
            plan_id: Some(plan.id),
            subscription_end_date: end,
            usage,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn gate(store: &Arc<InMemoryStore>) -> CreationGateUseCase<InMemoryStore, InMemoryStore, InMemoryStore> {
        CreationGateUseCase::new(Arc::clone(store), Arc::clone(store), Arc::clone(store))
    }

    #[tokio::test]
    async fn free_plan_allows_one_route_then_refuses() {
        let store = Arc::new(InMemoryStore::new());
        let free = plan(
            PlanName::Free,
            PlanDuration::Indefinite,
            PlanLimits {
                max_routes: 1,
                ..Default::default()
            },
        );
        let teacher = member(UserRole::Teacher, &free, None, UsageCounters::default());
        store.put_plan(free).await;
        store.put_user(teacher.clone()).await;
        let gate = gate(&store);
        let teacher_id = teacher.id.to_string();

        let first = gate
            .guard_creation(&teacher_id, ResourceKind::LearningPath)
            .await;
        assert!(first.is_allowed());

        let second = gate
            .guard_creation(&teacher_id, ResourceKind::LearningPath)
            .await;
        match &second {
            GateDecision::QuotaRefused { kind, message } => {
                assert_eq!(*kind, RefusalKind::LimitReached);
                assert!(message.contains('1'));
            }
            other => panic!("expected quota refusal, got {other:?}"),
        }

        assert_eq!(store.user(teacher.id).await.unwrap().usage.routes_created, 1);
    }

    #[tokio::test]
    async fn expired_premium_is_refused_before_quota() {
        let store = Arc::new(InMemoryStore::new());
        let premium = plan(
            PlanName::Premium,
            PlanDuration::Monthly,
            PlanLimits {
                max_routes: 100,
                ..Default::default()
            },
        );
        let teacher = member(
            UserRole::Teacher,
            &premium,
            Some(Utc::now() - Duration::days(2)),
            UsageCounters::default(),
        );
        store.put_plan(premium).await;
        store.put_user(teacher.clone()).await;

        let decision = gate(&store)
            .guard_creation(&teacher.id.to_string(), ResourceKind::LearningPath)
            .await;

        match &decision {
            GateDecision::SubscriptionInactive { outcome, message } => {
                assert_eq!(*outcome, StatusOutcome::Expired);
                assert!(message.contains("subscription"));
            }
            other => panic!("expected subscription refusal, got {other:?}"),
        }
        assert_eq!(store.user(teacher.id).await.unwrap().usage.routes_created, 0);
    }

    #[tokio::test]
    async fn routes_one_below_max_allows_exactly_one() {
        let store = Arc::new(InMemoryStore::new());
        let pro = plan(
            PlanName::Pro,
            PlanDuration::Annual,
            PlanLimits {
                max_routes: 5,
                ..Default::default()
            },
        );
        let teacher = member(
            UserRole::Teacher,
            &pro,
            Some(Utc::now() + Duration::days(100)),
            UsageCounters {
                routes_created: 4,
                ..Default::default()
            },
        );
        store.put_plan(pro).await;
        store.put_user(teacher.clone()).await;
        let gate = gate(&store);
        let teacher_id = teacher.id.to_string();

        assert!(
            gate.guard_creation(&teacher_id, ResourceKind::LearningPath)
                .await
                .is_allowed()
        );
        assert!(
            !gate
                .guard_creation(&teacher_id, ResourceKind::LearningPath)
                .await
                .is_allowed()
        );
        assert_eq!(store.user(teacher.id).await.unwrap().usage.routes_created, 5);
    }

    #[tokio::test]
    async fn admins_pass_regardless_of_plan_and_usage() {
        let store = Arc::new(InMemoryStore::new());
        let stale = plan(PlanName::Basic, PlanDuration::Monthly, PlanLimits::default());
        let admin = member(
            UserRole::Admin,
            &stale,
            Some(Utc::now() - Duration::days(90)),
            UsageCounters {
                groups_created: 9,
                ..Default::default()
            },
        );
        store.put_user(admin.clone()).await;
        let gate = gate(&store);

        for kind in ResourceKind::ALL {
            assert!(
                gate.guard_creation(&admin.id.to_string(), kind)
                    .await
                    .is_allowed()
            );
        }
        assert!(
            gate.guard_student_approval(&admin.id.to_string(), Uuid::new_v4())
                .await
                .is_allowed()
        );
    }

    #[test]
    fn decisions_serialize_with_a_decision_tag() {
        let refused = serde_json::to_value(GateDecision::QuotaRefused {
            kind: RefusalKind::LimitReached,
            message: "limit of 1 learning paths reached for your plan".to_string(),
        })
        .unwrap();
        assert_eq!(refused["decision"], "quota_refused");
        assert_eq!(refused["kind"], "limit_reached");

        let inactive = serde_json::to_value(GateDecision::SubscriptionInactive {
            outcome: StatusOutcome::Expired,
            message: "subscription expired on 2024-05-01".to_string(),
        })
        .unwrap();
        assert_eq!(inactive["decision"], "subscription_inactive");
        assert_eq!(inactive["outcome"], "expired");
    }

    #[tokio::test]
    async fn unknown_user_is_refused_with_not_found() {
        let store = Arc::new(InMemoryStore::new());

        let decision = gate(&store)
            .guard_creation(&Uuid::new_v4().to_string(), ResourceKind::Group)
            .await;

        assert_eq!(
            decision,
            GateDecision::SubscriptionInactive {
                outcome: StatusOutcome::NotFound,
                message: "user not found".to_string(),
            }
        );
    }
}
