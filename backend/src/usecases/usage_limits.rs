use std::{future::Future, sync::Arc};

use crates::domain::{
    entities::{app_users::AppUserEntity, plans::PlanEntity},
    repositories::{app_users::AppUserRepository, group_members::GroupMemberRepository},
    value_objects::{
        enums::{resource_kinds::ResourceKind, user_roles::UserRole},
        subscriptions::{QuotaDecision, RefusalKind, SubscriptionStatusReport},
        usage::{QuotaDto, UsageSummaryDto},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

const NO_PLAN_MESSAGE: &str = "no plan assigned";
const INTERNAL_ERROR_MESSAGE: &str = "quota could not be checked";

/// A user whose subscription check has passed, together with the plan it resolved.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub user: AppUserEntity,
    pub plan: Option<PlanEntity>,
}

impl Subscriber {
    /// Only an active report carrying a user becomes a subscriber.
    pub fn from_report(report: SubscriptionStatusReport) -> Option<Self> {
        if !report.is_active {
            return None;
        }
        report.user.map(|user| Subscriber {
            user,
            plan: report.plan,
        })
    }
}

#[derive(Debug)]
pub enum QuotaOutcome<T> {
    Created(T),
    Refused { kind: RefusalKind, message: String },
}

#[derive(Debug, Error)]
pub enum UsageLimitError {
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub fn limit_reached_message(limit: i64, label: &str) -> String {
    format!("limit of {limit} {label} reached for your plan")
}

pub struct UsageLimitUseCase<U, G>
where
    U: AppUserRepository + Send + Sync + 'static,
    G: GroupMemberRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    group_member_repo: Arc<G>,
}

impl<U, G> UsageLimitUseCase<U, G>
where
    U: AppUserRepository + Send + Sync + 'static,
    G: GroupMemberRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, group_member_repo: Arc<G>) -> Self {
        Self {
            user_repo,
            group_member_repo,
        }
    }

    /// Reserves one unit of `kind` for the subscriber. A teacher's counter is only ever
    /// moved by the store's conditional increment, so a refusal leaves it untouched.
    pub async fn check_and_reserve_quota(
        &self,
        subscriber: &Subscriber,
        kind: ResourceKind,
    ) -> QuotaDecision {
        let user = &subscriber.user;
        let used = user.usage.count_for(kind);

        if !user.role.is_plan_bound() {
            return QuotaDecision::Allowed { used, limit: None };
        }

        let Some(plan) = subscriber.plan.as_ref() else {
            error!(user_id = %user.id, %kind, "usage_limits: teacher has no plan assigned");
            return QuotaDecision::refused(RefusalKind::Misconfigured, NO_PLAN_MESSAGE);
        };

        let limit = plan.limits.limit_for(kind);
        if used >= limit {
            info!(
                user_id = %user.id,
                %kind,
                used,
                limit,
                "usage_limits: limit reached"
            );
            return QuotaDecision::refused(
                RefusalKind::LimitReached,
                limit_reached_message(limit, kind.plural_label()),
            );
        }

        match self.user_repo.try_increment_usage(user.id, kind, limit).await {
            Ok(Some(used)) => {
                info!(user_id = %user.id, %kind, used, limit, "usage_limits: quota reserved");
                QuotaDecision::Allowed {
                    used,
                    limit: Some(limit),
                }
            }
            Ok(None) => {
                warn!(
                    user_id = %user.id,
                    %kind,
                    limit,
                    "usage_limits: concurrent reservation took the last unit"
                );
                QuotaDecision::refused(
                    RefusalKind::LimitReached,
                    limit_reached_message(limit, kind.plural_label()),
                )
            }
            Err(err) => {
                error!(
                    user_id = %user.id,
                    %kind,
                    db_error = ?err,
                    "usage_limits: failed to reserve quota"
                );
                QuotaDecision::refused(RefusalKind::Internal, INTERNAL_ERROR_MESSAGE)
            }
        }
    }

    /// Reserves quota, runs `create`, and hands the unit back when `create` fails.
    /// The caller's own error is returned unchanged.
    pub async fn create_with_quota<T, E, F, Fut>(
        &self,
        subscriber: &Subscriber,
        kind: ResourceKind,
        create: F,
    ) -> Result<QuotaOutcome<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let reserved = match self.check_and_reserve_quota(subscriber, kind).await {
            QuotaDecision::Allowed { limit, .. } => limit.is_some(),
            QuotaDecision::Refused { kind, message } => {
                return Ok(QuotaOutcome::Refused { kind, message });
            }
        };

        match create().await {
            Ok(created) => Ok(QuotaOutcome::Created(created)),
            Err(err) => {
                if reserved {
                    self.rollback_reservation(subscriber.user.id, kind).await;
                }
                Err(err)
            }
        }
    }

    async fn rollback_reservation(&self, user_id: Uuid, kind: ResourceKind) {
        match self.user_repo.decrement_usage(user_id, kind).await {
            Ok(true) => {
                warn!(%user_id, %kind, "usage_limits: creation failed, reservation released");
            }
            Ok(false) => {
                error!(%user_id, %kind, "usage_limits: reservation to release was not found");
            }
            Err(err) => {
                error!(
                    %user_id,
                    %kind,
                    db_error = ?err,
                    "usage_limits: failed to release reservation"
                );
            }
        }
    }

    /// Compares the live count of approved members against the plan's per-group cap.
    pub async fn check_group_student_capacity(
        &self,
        subscriber: &Subscriber,
        group_id: Uuid,
    ) -> QuotaDecision {
        let user = &subscriber.user;

        if !user.role.is_plan_bound() {
            return QuotaDecision::Allowed {
                used: 0,
                limit: None,
            };
        }

        let Some(plan) = subscriber.plan.as_ref() else {
            error!(user_id = %user.id, %group_id, "usage_limits: teacher has no plan assigned");
            return QuotaDecision::refused(RefusalKind::Misconfigured, NO_PLAN_MESSAGE);
        };

        let approved = match self
            .group_member_repo
            .count_approved_members(group_id)
            .await
        {
            Ok(approved) => approved,
            Err(err) => {
                error!(
                    user_id = %user.id,
                    %group_id,
                    db_error = ?err,
                    "usage_limits: failed to count approved members"
                );
                return QuotaDecision::refused(RefusalKind::Internal, INTERNAL_ERROR_MESSAGE);
            }
        };

        let limit = plan.limits.max_students_per_group;
        if approved >= limit {
            info!(
                user_id = %user.id,
                %group_id,
                approved,
                limit,
                "usage_limits: group is full"
            );
            return QuotaDecision::refused(
                RefusalKind::LimitReached,
                limit_reached_message(limit, "students per group"),
            );
        }

        QuotaDecision::Allowed {
            used: approved,
            limit: Some(limit),
        }
    }

    /// Frees one unit after a hard delete. Only admins may do this.
    pub async fn release_quota(
        &self,
        actor_role: UserRole,
        owner_id: Uuid,
        kind: ResourceKind,
    ) -> Result<bool, UsageLimitError> {
        if actor_role != UserRole::Admin {
            warn!(%owner_id, %kind, role = %actor_role, "usage_limits: release refused");
            return Err(UsageLimitError::Forbidden(
                "only administrators can release quota".to_string(),
            ));
        }

        let released = self
            .user_repo
            .decrement_usage(owner_id, kind)
            .await
            .map_err(|err| {
                error!(%owner_id, %kind, db_error = ?err, "usage_limits: failed to release quota");
                UsageLimitError::Internal(err)
            })?;
        info!(%owner_id, %kind, released, "usage_limits: quota released");

        Ok(released)
    }

    pub fn usage_summary(
        &self,
        user: &AppUserEntity,
        plan: Option<&PlanEntity>,
    ) -> UsageSummaryDto {
        let bound_plan = plan.filter(|_| user.role.is_plan_bound());

        let quotas = ResourceKind::ALL
            .into_iter()
            .map(|kind| {
                let used = user.usage.count_for(kind);
                let limit = bound_plan.map(|plan| plan.limits.limit_for(kind));
                QuotaDto {
                    kind,
                    used,
                    limit,
                    remaining: limit.map(|limit| (limit - used).max(0)),
                }
            })
            .collect();

        UsageSummaryDto {
            user_id: user.id,
            role: user.role,
            plan_name: plan.map(|plan| plan.name),
            quotas,
            max_students_per_group: bound_plan.map(|plan| plan.limits.max_students_per_group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use crates::{
        domain::{
            entities::group_members::GroupMemberEntity,
            repositories::{
                app_users::MockAppUserRepository, group_members::MockGroupMemberRepository,
            },
            value_objects::{
                enums::{
                    membership_statuses::MembershipStatus, plan_durations::PlanDuration,
                    plan_names::PlanName,
                },
                plans::PlanLimits,
                usage::UsageCounters,
            },
        },
        infra::db::memory::InMemoryStore,
    };
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn plan_with(limits: PlanLimits) -> PlanEntity {
        PlanEntity {
            id: Uuid::new_v4(),
            name: PlanName::Basic,
            duration: PlanDuration::Monthly,
            price_minor: Some(900),
            limits,
            is_default_free: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn account(role: UserRole, plan: &PlanEntity, usage: UsageCounters) -> AppUserEntity {
        AppUserEntity {
            id: Uuid::new_v4(),
            role,
            plan_id: Some(plan.id),
            subscription_end_date: Some(Utc::now() + Duration::days(20)),
            usage,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn routes_plan(max_routes: i64) -> PlanEntity {
        plan_with(PlanLimits {
            max_routes,
            max_students_per_group: 3,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn one_below_limit_allows_exactly_one_more() {
        let store = Arc::new(InMemoryStore::new());
        let plan = routes_plan(3);
        let teacher = account(
            UserRole::Teacher,
            &plan,
            UsageCounters {
                routes_created: 2,
                ..Default::default()
            },
        );
        store.put_user(teacher.clone()).await;
        let usecase = UsageLimitUseCase::new(Arc::clone(&store), Arc::clone(&store));

        let subscriber = Subscriber {
            user: teacher.clone(),
            plan: Some(plan.clone()),
        };
        let first = usecase
            .check_and_reserve_quota(&subscriber, ResourceKind::LearningPath)
            .await;
        assert_eq!(
            first,
            QuotaDecision::Allowed {
                used: 3,
                limit: Some(3)
            }
        );

        let refreshed = Subscriber {
            user: store.user(teacher.id).await.unwrap(),
            plan: Some(plan),
        };
        let second = usecase
            .check_and_reserve_quota(&refreshed, ResourceKind::LearningPath)
            .await;
        match second {
            QuotaDecision::Refused { kind, message } => {
                assert_eq!(kind, RefusalKind::LimitReached);
                assert!(message.contains("limit of 3 learning paths"));
            }
            other => panic!("expected refusal, got {other:?}"),
        }

        assert_eq!(store.user(teacher.id).await.unwrap().usage.routes_created, 3);
    }

    #[tokio::test]
    async fn stale_snapshot_loses_race_to_store_limit() {
        let store = Arc::new(InMemoryStore::new());
        let plan = routes_plan(1);
        let teacher = account(UserRole::Teacher, &plan, UsageCounters::default());
        store.put_user(teacher.clone()).await;
        let usecase = UsageLimitUseCase::new(Arc::clone(&store), Arc::clone(&store));
        let subscriber = Subscriber {
            user: teacher.clone(),
            plan: Some(plan),
        };

        let first = usecase
            .check_and_reserve_quota(&subscriber, ResourceKind::LearningPath)
            .await;
        let second = usecase
            .check_and_reserve_quota(&subscriber, ResourceKind::LearningPath)
            .await;

        assert!(first.is_allowed());
        assert!(!second.is_allowed());
        assert_eq!(store.user(teacher.id).await.unwrap().usage.routes_created, 1);
    }

    #[tokio::test]
    async fn admins_are_never_refused() {
        let plan = routes_plan(0);
        let admin = account(
            UserRole::Admin,
            &plan,
            UsageCounters {
                routes_created: 50,
                groups_created: 50,
                ..Default::default()
            },
        );
        let mut user_repo = MockAppUserRepository::new();
        user_repo.expect_try_increment_usage().never();
        let usecase = UsageLimitUseCase::new(
            Arc::new(user_repo),
            Arc::new(MockGroupMemberRepository::new()),
        );
        let subscriber = Subscriber {
            user: admin,
            plan: Some(plan),
        };

        for kind in ResourceKind::ALL {
            let decision = usecase.check_and_reserve_quota(&subscriber, kind).await;
            assert!(decision.is_allowed(), "{kind} refused for admin");
        }
        assert!(
            usecase
                .check_group_student_capacity(&subscriber, Uuid::new_v4())
                .await
                .is_allowed()
        );
    }

    #[tokio::test]
    async fn teacher_without_plan_is_refused_as_misconfigured() {
        let plan = routes_plan(5);
        let mut teacher = account(UserRole::Teacher, &plan, UsageCounters::default());
        teacher.plan_id = None;
        let usecase = UsageLimitUseCase::new(
            Arc::new(MockAppUserRepository::new()),
            Arc::new(MockGroupMemberRepository::new()),
        );
        let subscriber = Subscriber {
            user: teacher,
            plan: None,
        };

        let decision = usecase
            .check_and_reserve_quota(&subscriber, ResourceKind::Group)
            .await;

        assert_eq!(
            decision,
            QuotaDecision::refused(RefusalKind::Misconfigured, "no plan assigned")
        );
    }

    #[tokio::test]
    async fn store_failure_is_refused_as_internal() {
        let plan = routes_plan(5);
        let teacher = account(UserRole::Teacher, &plan, UsageCounters::default());
        let mut user_repo = MockAppUserRepository::new();
        user_repo
            .expect_try_increment_usage()
            .returning(|_, _, _| Err(anyhow::anyhow!("deadlock detected")));
        let usecase = UsageLimitUseCase::new(
            Arc::new(user_repo),
            Arc::new(MockGroupMemberRepository::new()),
        );
        let subscriber = Subscriber {
            user: teacher,
            plan: Some(plan),
        };

        let decision = usecase
            .check_and_reserve_quota(&subscriber, ResourceKind::LearningPath)
            .await;

        assert!(matches!(
            decision,
            QuotaDecision::Refused {
                kind: RefusalKind::Internal,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn allowed_reports_the_stored_counter_not_the_snapshot() {
        let plan = routes_plan(10);
        let teacher = account(
            UserRole::Teacher,
            &plan,
            UsageCounters {
                routes_created: 2,
                ..Default::default()
            },
        );
        let mut user_repo = MockAppUserRepository::new();
        user_repo
            .expect_try_increment_usage()
            .times(1)
            .returning(|_, _, _| Ok(Some(7)));
        let usecase = UsageLimitUseCase::new(
            Arc::new(user_repo),
            Arc::new(MockGroupMemberRepository::new()),
        );
        let subscriber = Subscriber {
            user: teacher,
            plan: Some(plan),
        };

        let decision = usecase
            .check_and_reserve_quota(&subscriber, ResourceKind::LearningPath)
            .await;

        assert_eq!(
            decision,
            QuotaDecision::Allowed {
                used: 7,
                limit: Some(10),
            }
        );
    }

    #[tokio::test]
    async fn failed_create_releases_the_reservation() {
        let store = Arc::new(InMemoryStore::new());
        let plan = routes_plan(2);
        let teacher = account(UserRole::Teacher, &plan, UsageCounters::default());
        store.put_user(teacher.clone()).await;
        let usecase = UsageLimitUseCase::new(Arc::clone(&store), Arc::clone(&store));
        let subscriber = Subscriber {
            user: teacher.clone(),
            plan: Some(plan),
        };

        let result: Result<QuotaOutcome<Uuid>, String> = usecase
            .create_with_quota(&subscriber, ResourceKind::LearningPath, || async {
                Err("insert failed".to_string())
            })
            .await;

        assert_eq!(result.unwrap_err(), "insert failed");
        assert_eq!(store.user(teacher.id).await.unwrap().usage.routes_created, 0);

        let created: Result<QuotaOutcome<&str>, String> = usecase
            .create_with_quota(&subscriber, ResourceKind::LearningPath, || async {
                Ok("path-1")
            })
            .await;

        assert!(matches!(created, Ok(QuotaOutcome::Created("path-1"))));
        assert_eq!(store.user(teacher.id).await.unwrap().usage.routes_created, 1);
    }

    #[tokio::test]
    async fn refused_create_never_runs_the_closure() {
        let plan = routes_plan(0);
        let teacher = account(UserRole::Teacher, &plan, UsageCounters::default());
        let usecase = UsageLimitUseCase::new(
            Arc::new(MockAppUserRepository::new()),
            Arc::new(MockGroupMemberRepository::new()),
        );
        let subscriber = Subscriber {
            user: teacher,
            plan: Some(plan),
        };

        let ran = AtomicBool::new(false);
        let outcome: Result<QuotaOutcome<()>, String> = usecase
            .create_with_quota(&subscriber, ResourceKind::LearningPath, || async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(!ran.load(Ordering::SeqCst));

        assert!(matches!(
            outcome,
            Ok(QuotaOutcome::Refused {
                kind: RefusalKind::LimitReached,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn group_capacity_counts_only_approved_students() {
        let store = Arc::new(InMemoryStore::new());
        let plan = routes_plan(1);
        let teacher = account(UserRole::Teacher, &plan, UsageCounters::default());
        let group_id = Uuid::new_v4();
        for status in [
            MembershipStatus::Approved,
            MembershipStatus::Approved,
            MembershipStatus::Pending,
        ] {
            store
                .put_member(GroupMemberEntity {
                    group_id,
                    student_id: Uuid::new_v4(),
                    status,
                    created_at: Utc::now(),
                })
                .await;
        }
        let usecase = UsageLimitUseCase::new(Arc::clone(&store), Arc::clone(&store));
        let subscriber = Subscriber {
            user: teacher,
            plan: Some(plan),
        };

        assert_eq!(
            usecase
                .check_group_student_capacity(&subscriber, group_id)
                .await,
            QuotaDecision::Allowed {
                used: 2,
                limit: Some(3)
            }
        );

        store
            .put_member(GroupMemberEntity {
                group_id,
                student_id: Uuid::new_v4(),
                status: MembershipStatus::Approved,
                created_at: Utc::now(),
            })
            .await;

        let full = usecase
            .check_group_student_capacity(&subscriber, group_id)
            .await;
        match full {
            QuotaDecision::Refused { kind, message } => {
                assert_eq!(kind, RefusalKind::LimitReached);
                assert!(message.contains("limit of 3 students per group"));
            }
            other => panic!("expected refusal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn only_admins_release_quota() {
        let owner_id = Uuid::new_v4();
        let mut user_repo = MockAppUserRepository::new();
        user_repo
            .expect_decrement_usage()
            .with(eq(owner_id), eq(ResourceKind::Resource))
            .times(1)
            .returning(|_, _| Ok(true));
        let usecase = UsageLimitUseCase::new(
            Arc::new(user_repo),
            Arc::new(MockGroupMemberRepository::new()),
        );

        let denied = usecase
            .release_quota(UserRole::Teacher, owner_id, ResourceKind::Resource)
            .await;
        assert!(matches!(denied, Err(UsageLimitError::Forbidden(_))));

        let released = usecase
            .release_quota(UserRole::Admin, owner_id, ResourceKind::Resource)
            .await
            .unwrap();
        assert!(released);
    }

    #[test]
    fn usage_summary_computes_remaining_for_teachers() {
        let plan = plan_with(PlanLimits {
            max_groups: 2,
            max_students_per_group: 25,
            max_routes: 4,
            max_resources: 10,
            max_activities: 1,
        });
        let teacher = account(
            UserRole::Teacher,
            &plan,
            UsageCounters {
                groups_created: 1,
                routes_created: 4,
                activities_generated: 3,
                ..Default::default()
            },
        );
        let usecase = UsageLimitUseCase::new(
            Arc::new(MockAppUserRepository::new()),
            Arc::new(MockGroupMemberRepository::new()),
        );

        let summary = usecase.usage_summary(&teacher, Some(&plan));

        assert_eq!(summary.plan_name, Some(PlanName::Basic));
        assert_eq!(summary.max_students_per_group, Some(25));
        let routes = summary
            .quotas
            .iter()
            .find(|quota| quota.kind == ResourceKind::LearningPath)
            .unwrap();
        assert_eq!(routes.remaining, Some(0));
        let activities = summary
            .quotas
            .iter()
            .find(|quota| quota.kind == ResourceKind::Activity)
            .unwrap();
        assert_eq!(activities.remaining, Some(0));
        let groups = summary
            .quotas
            .iter()
            .find(|quota| quota.kind == ResourceKind::Group)
            .unwrap();
        assert_eq!(groups.remaining, Some(1));
    }

    #[test]
    fn usage_summary_has_no_limits_for_students() {
        let plan = routes_plan(1);
        let student = account(UserRole::Student, &plan, UsageCounters::default());
        let usecase = UsageLimitUseCase::new(
            Arc::new(MockAppUserRepository::new()),
            Arc::new(MockGroupMemberRepository::new()),
        );

        let summary = usecase.usage_summary(&student, None);

        assert!(summary.quotas.iter().all(|quota| quota.limit.is_none()));
        assert_eq!(summary.max_students_per_group, None);
    }
}
