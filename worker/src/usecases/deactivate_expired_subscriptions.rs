use chrono::{DateTime, NaiveTime, Utc};
use crates::domain::{
    entities::{app_users::AppUserEntity, plans::PlanEntity},
    repositories::{app_users::AppUserRepository, plans::PlanRepository},
    value_objects::subscriptions::RevertSubscriptionModel,
};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const MAX_REPORTED_IDS: usize = 20;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DeactivateExpiredSubscriptionsResult {
    pub success: bool,
    pub message: String,
    pub deactivated_count: usize,
    pub stale_dates_cleared: usize,
    pub skipped_conflicts: usize,
    pub failed: usize,
    pub failed_user_ids: Vec<Uuid>,
}

impl DeactivateExpiredSubscriptionsResult {
    fn aborted(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    fn record_failure(&mut self, user_id: Uuid) {
        self.failed += 1;
        if self.failed_user_ids.len() < MAX_REPORTED_IDS {
            self.failed_user_ids.push(user_id);
        }
    }
}

enum Step {
    Reverted,
    StaleDateCleared,
    Conflict,
    Skipped,
}

/// Reverts teachers whose finite subscription lapsed before today (UTC) to the
/// default free plan. Writes are conditional on the plan and end date read, so a
/// concurrent upgrade always wins. Runs never overlap.
pub struct DeactivateExpiredSubscriptionsUseCase {
    plan_repo: Arc<dyn PlanRepository + Send + Sync>,
    user_repo: Arc<dyn AppUserRepository + Send + Sync>,
    run_lock: Mutex<()>,
}

impl DeactivateExpiredSubscriptionsUseCase {
    pub fn new(
        plan_repo: Arc<dyn PlanRepository + Send + Sync>,
        user_repo: Arc<dyn AppUserRepository + Send + Sync>,
    ) -> Self {
        Self {
            plan_repo,
            user_repo,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> DeactivateExpiredSubscriptionsResult {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> DeactivateExpiredSubscriptionsResult {
        let _running = self.run_lock.lock().await;

        let default_plan = match self.plan_repo.find_active_default_free_plan().await {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                error!("expired_subscriptions: no active default free plan, sweep aborted");
                return DeactivateExpiredSubscriptionsResult::aborted(
                    "no active default free plan is configured",
                );
            }
            Err(err) => {
                error!(db_error = ?err, "expired_subscriptions: failed to load default plan");
                return DeactivateExpiredSubscriptionsResult::aborted(
                    "default free plan could not be loaded",
                );
            }
        };

        let cutoff = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let candidates = match self
            .user_repo
            .list_teachers_with_subscription_ended_before(cutoff)
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(%cutoff, db_error = ?err, "expired_subscriptions: failed to list candidates");
                return DeactivateExpiredSubscriptionsResult::aborted(
                    "expired subscriptions could not be listed",
                );
            }
        };
        info!(
            %cutoff,
            candidates = candidates.len(),
            default_plan_id = %default_plan.id,
            "expired_subscriptions: sweep started"
        );

        let mut result = DeactivateExpiredSubscriptionsResult {
            success: true,
            ..Default::default()
        };
        let mut plans: HashMap<Uuid, Option<PlanEntity>> = HashMap::new();

        for user in candidates {
            match self.sweep_user(&user, &default_plan, now, &mut plans).await {
                Ok(Step::Reverted) => result.deactivated_count += 1,
                Ok(Step::StaleDateCleared) => result.stale_dates_cleared += 1,
                Ok(Step::Conflict) => {
                    warn!(
                        user_id = %user.id,
                        "expired_subscriptions: user changed since read, skipped"
                    );
                    result.skipped_conflicts += 1;
                }
                Ok(Step::Skipped) => {}
                Err(err) => {
                    error!(
                        user_id = %user.id,
                        error = ?err,
                        "expired_subscriptions: failed to revert user"
                    );
                    result.record_failure(user.id);
                }
            }
        }

        result.message = format!(
            "{} expired subscriptions reverted to the {} plan",
            result.deactivated_count, default_plan.name
        );
        if result.failed > 0 {
            result.message.push_str(&format!(", {} failed", result.failed));
        }

        info!(
            deactivated_count = result.deactivated_count,
            stale_dates_cleared = result.stale_dates_cleared,
            skipped_conflicts = result.skipped_conflicts,
            failed = result.failed,
            "expired_subscriptions: completed"
        );

        result
    }

    async fn sweep_user(
        &self,
        user: &AppUserEntity,
        default_plan: &PlanEntity,
        now: DateTime<Utc>,
        plans: &mut HashMap<Uuid, Option<PlanEntity>>,
    ) -> anyhow::Result<Step> {
        // A finite default plan falls through and gets a fresh period below.
        if user.plan_id == Some(default_plan.id) && default_plan.duration.is_indefinite() {
            let cleared = self
                .user_repo
                .revert_subscription(RevertSubscriptionModel {
                    user_id: user.id,
                    expected_plan_id: user.plan_id,
                    expected_end_date: user.subscription_end_date,
                    plan_id: default_plan.id,
                    subscription_end_date: None,
                })
                .await?;
            return Ok(if cleared {
                debug!(user_id = %user.id, "expired_subscriptions: stale end date cleared");
                Step::StaleDateCleared
            } else {
                Step::Conflict
            });
        }

        if let Some(plan_id) = user.plan_id {
            let plan = match plans.get(&plan_id) {
                Some(cached) => cached.clone(),
                None => {
                    let loaded = self.plan_repo.find_by_id(plan_id).await?;
                    plans.insert(plan_id, loaded.clone());
                    loaded
                }
            };

            if plan.is_some_and(|plan| plan.duration.is_indefinite()) {
                return Ok(Step::Skipped);
            }
        }

        let subscription_end_date = default_plan
            .duration
            .renewal_period()
            .map(|period| now + period);

        let reverted = self
            .user_repo
            .revert_subscription(RevertSubscriptionModel {
                user_id: user.id,
                expected_plan_id: user.plan_id,
                expected_end_date: user.subscription_end_date,
                plan_id: default_plan.id,
                subscription_end_date,
            })
            .await?;

        if reverted {
            info!(
                user_id = %user.id,
                previous_plan_id = ?user.plan_id,
                "expired_subscriptions: reverted to default plan"
            );
            Ok(Step::Reverted)
        } else {
            Ok(Step::Conflict)
        }
    }
}
