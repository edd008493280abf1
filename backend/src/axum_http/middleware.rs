use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use crates::domain::repositories::{app_users::AppUserRepository, plans::PlanRepository};
use tracing::error;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{
        creation_gate::refusal_from_report, subscription_status::SubscriptionStatusUseCase,
        usage_limits::Subscriber,
    },
};

/// Lets the request through only for an active subscription and hands the resolved
/// [`Subscriber`] to the handler as a request extension.
pub async fn require_active_subscription<U, P>(
    State(subscription_status): State<Arc<SubscriptionStatusUseCase<U, P>>>,
    auth: AuthUser,
    mut request: Request,
    next: Next,
) -> Response
where
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    let report = subscription_status
        .check_subscription_status(&auth.user_id.to_string())
        .await;

    if !report.is_active {
        return refusal_from_report(&report).into_response();
    }

    let Some(subscriber) = Subscriber::from_report(report) else {
        error!(user_id = %auth.user_id, "middleware: active report without a user");
        return AppError::Internal(anyhow::anyhow!("active report without a user")).into_response();
    };

    request.extensions_mut().insert(subscriber);
    next.run(request).await
}
