use anyhow::Result;
use crates::domain::repositories::{app_users::AppUserRepository, plans::PlanRepository};
use crates::infra::db::{
    postgres::postgres_connection,
    repositories::{app_users::AppUserPostgres, plans::PlanPostgres},
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{
    axum_http, config, services,
    usecases::deactivate_expired_subscriptions::DeactivateExpiredSubscriptionsUseCase,
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!(stage = %config::config_loader::get_stage(), "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let plan_repository: Arc<dyn PlanRepository + Send + Sync> =
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool_arc)));
    let app_user_repository: Arc<dyn AppUserRepository + Send + Sync> =
        Arc::new(AppUserPostgres::new(Arc::clone(&db_pool_arc)));

    let sweep_usecase = Arc::new(DeactivateExpiredSubscriptionsUseCase::new(
        plan_repository,
        app_user_repository,
    ));

    let sweep_loop = tokio::spawn(services::sweep_loop::run_sweep_loop(
        Arc::clone(&sweep_usecase),
        dotenvy_env.sweep.clone(),
    ));

    let server_config = Arc::clone(&dotenvy_env);
    let http_server = tokio::spawn(async move {
        axum_http::http_serve::start(server_config, sweep_usecase).await
    });

    tokio::select! {
        result = sweep_loop => result??,
        result = http_server => result??,
    };
    Ok(())
}
