//! rg-cleanup: deletes stale resource groups and orphaned role assignments.

#![forbid(unsafe_code)]

mod cleanup_config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rg_cleanup_application::{ResourceGroupSweeper, RoleAssignmentReconciler, SweepOptions};
use rg_cleanup_core::{AppError, AppResult};
use rg_cleanup_infrastructure::{
    AccessTokenSource, ArmResourceGroupRepository, ArmRoleAssignmentRepository,
    AzureIdentityTokenSource, GraphDirectoryService,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cleanup_config::{CleanupArgs, CleanupConfig};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Initializing rg-cleanup");
    let args = CleanupArgs::parse();
    info!(
        dry_run = args.dry_run,
        ttl = %args.ttl,
        regex = %args.regex,
        role_assignments = args.role_assignments,
        identity = args.identity,
        az_cli = args.az_cli,
        fail_fast = args.fail_fast,
        role_assignments_best_effort = args.role_assignments_best_effort,
        "args"
    );

    run(args).await
}

async fn run(args: CleanupArgs) -> AppResult<()> {
    let config = CleanupConfig::load(args)
        .inspect_err(|error| error!(error = %error, "Error when validating options"))?;

    info!(
        subscription_id = %config.subscription_id,
        client_id = config.client_id.as_deref().unwrap_or(""),
        credential = config.credential.label(),
        resource_manager = %config.endpoints.resource_manager(),
        graph = %config.endpoints.graph(),
        "configuration loaded"
    );

    if config.dry_run {
        info!("Dry-run enabled - printing logs but not actually deleting resource groups");
    }

    let token_source: Arc<dyn AccessTokenSource> = Arc::new(
        AzureIdentityTokenSource::new(&config.credential)
            .inspect_err(|error| error!(error = %error, "Error when obtaining credential"))?,
    );
    let http_client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let sweeper = ResourceGroupSweeper::new(
        Arc::new(ArmResourceGroupRepository::new(
            http_client.clone(),
            token_source.clone(),
            &config.endpoints,
            config.subscription_id.clone(),
        )),
        config.retention.clone(),
        SweepOptions {
            dry_run: config.dry_run,
            continue_on_error: config.sweep_continue_on_error,
        },
    );
    sweeper
        .sweep()
        .await
        .inspect_err(|error| error!(error = %error, "Error when cleaning up resource groups"))?;

    if !config.role_assignments {
        info!("Skipping role assignment cleanup");
        return Ok(());
    }

    let reconciler = RoleAssignmentReconciler::new(
        Arc::new(ArmRoleAssignmentRepository::new(
            http_client.clone(),
            token_source.clone(),
            &config.endpoints,
        )),
        Arc::new(GraphDirectoryService::new(
            http_client,
            token_source,
            &config.endpoints,
        )),
    )
    .with_continue_on_error(config.role_assignments_continue_on_error);

    reconciler
        .reconcile(&config.subscription_id, config.dry_run)
        .await
        .inspect_err(|error| error!(error = %error, "Error when cleaning up role assignments"))?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
