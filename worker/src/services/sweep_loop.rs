use crate::{
    config::config_model::Sweep,
    usecases::deactivate_expired_subscriptions::DeactivateExpiredSubscriptionsUseCase,
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

pub async fn run_sweep_loop(
    usecase: Arc<DeactivateExpiredSubscriptionsUseCase>,
    settings: Sweep,
) -> Result<()> {
    info!(
        interval_seconds = settings.interval_seconds,
        run_on_start = settings.run_on_start,
        "sweep_loop: starting"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(settings.interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately.
    if !settings.run_on_start {
        ticker.tick().await;
    }

    loop {
        ticker.tick().await;

        let result = usecase.run().await;
        if result.success {
            info!(
                deactivated_count = result.deactivated_count,
                failed = result.failed,
                "sweep_loop: {}",
                result.message
            );
        } else {
            error!("sweep_loop: sweep aborted: {}", result.message);
        }
    }
}
