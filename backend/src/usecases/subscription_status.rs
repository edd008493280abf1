use std::sync::Arc;

use chrono::{DateTime, Utc};
use crates::domain::{
    entities::{app_users::AppUserEntity, plans::PlanEntity},
    repositories::{app_users::AppUserRepository, plans::PlanRepository},
    value_objects::subscriptions::{StatusOutcome, SubscriptionStatusReport},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const INTERNAL_ERROR_MESSAGE: &str = "subscription status could not be determined";

/// Decides whether a user may use plan-gated features right now.
///
/// Store failures are folded into an `Internal` report, so callers only ever see a
/// report and never an error.
pub struct SubscriptionStatusUseCase<U, P>
where
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    plan_repo: Arc<P>,
}

impl<U, P> SubscriptionStatusUseCase<U, P>
where
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, plan_repo: Arc<P>) -> Self {
        Self {
            user_repo,
            plan_repo,
        }
    }

    pub async fn check_subscription_status(&self, user_id: &str) -> SubscriptionStatusReport {
        self.check_subscription_status_at(user_id, Utc::now()).await
    }

    pub async fn check_subscription_status_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> SubscriptionStatusReport {
        let Ok(user_id) = Uuid::parse_str(user_id.trim()) else {
            warn!(raw_user_id = %user_id, "subscription_status: malformed user id");
            return SubscriptionStatusReport::inactive(
                StatusOutcome::Invalid,
                "invalid user id",
                None,
                None,
            );
        };

        let user = match self.user_repo.find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                info!(%user_id, "subscription_status: user not found");
                return SubscriptionStatusReport::inactive(
                    StatusOutcome::NotFound,
                    "user not found",
                    None,
                    None,
                );
            }
            Err(err) => {
                error!(%user_id, db_error = ?err, "subscription_status: failed to load user");
                return SubscriptionStatusReport::inactive(
                    StatusOutcome::Internal,
                    INTERNAL_ERROR_MESSAGE,
                    None,
                    None,
                );
            }
        };

        if !user.role.is_plan_bound() {
            debug!(%user_id, role = %user.role, "subscription_status: role is exempt");
            let message = format!("{} accounts are not bound by a plan", user.role);
            return SubscriptionStatusReport::active(StatusOutcome::Exempt, message, user, None);
        }

        let Some(plan_id) = user.plan_id else {
            error!(%user_id, "subscription_status: teacher has no plan assigned");
            return SubscriptionStatusReport::inactive(
                StatusOutcome::Misconfigured,
                "no plan assigned",
                Some(user),
                None,
            );
        };

        let plan = match self.plan_repo.find_by_id(plan_id).await {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                error!(%user_id, %plan_id, "subscription_status: assigned plan does not exist");
                return SubscriptionStatusReport::inactive(
                    StatusOutcome::Misconfigured,
                    "no plan assigned",
                    Some(user),
                    None,
                );
            }
            Err(err) => {
                error!(
                    %user_id,
                    %plan_id,
                    db_error = ?err,
                    "subscription_status: failed to load plan"
                );
                return SubscriptionStatusReport::inactive(
                    StatusOutcome::Internal,
                    INTERNAL_ERROR_MESSAGE,
                    Some(user),
                    None,
                );
            }
        };

        let report = evaluate_plan_status(user, plan, now);
        debug!(
            %user_id,
            %plan_id,
            is_active = report.is_active,
            outcome = ?report.outcome,
            "subscription_status: evaluated"
        );

        report
    }
}

/// Pure part of the check: a teacher and their resolved plan at instant `now`.
pub fn evaluate_plan_status(
    user: AppUserEntity,
    plan: PlanEntity,
    now: DateTime<Utc>,
) -> SubscriptionStatusReport {
    if !plan.is_active {
        return SubscriptionStatusReport::inactive(
            StatusOutcome::PlanInactive,
            format!("the {} plan is not active", plan.name),
            Some(user),
            Some(plan),
        );
    }

    if plan.duration.is_indefinite() {
        return SubscriptionStatusReport::active(
            StatusOutcome::Active,
            format!("the {} plan does not expire", plan.name),
            user,
            Some(plan),
        );
    }

    match user.subscription_end_date {
        None => {
            error!(
                user_id = %user.id,
                plan_id = %plan.id,
                "subscription_status: finite plan without an end date"
            );
            SubscriptionStatusReport::inactive(
                StatusOutcome::Misconfigured,
                format!("the {} plan has no subscription end date", plan.name),
                Some(user),
                Some(plan),
            )
        }
        Some(end_date) if end_date < now => SubscriptionStatusReport::inactive(
            StatusOutcome::Expired,
            format!(
                "subscription expired on {}",
                end_date.format("%Y-%m-%d")
            ),
            Some(user),
            Some(plan),
        ),
        Some(end_date) => SubscriptionStatusReport::active(
            StatusOutcome::Active,
            format!(
                "subscription active until {}",
                end_date.format("%Y-%m-%d")
            ),
            user,
            Some(plan),
        ),
    }
}
