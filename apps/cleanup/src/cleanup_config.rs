use std::env;

use clap::Parser;
use rg_cleanup_core::{AppError, AppResult, SubscriptionId};
use rg_cleanup_domain::{RetentionPolicy, parse_ttl};
use rg_cleanup_infrastructure::{
    AzureEndpoints, CredentialMode, PUBLIC_GRAPH_ENDPOINT, PUBLIC_RESOURCE_MANAGER_ENDPOINT,
};

pub const SUBSCRIPTION_ID_ENV: &str = "SUBSCRIPTION_ID";
pub const AAD_CLIENT_ID_ENV: &str = "AAD_CLIENT_ID";
pub const AAD_CLIENT_SECRET_ENV: &str = "AAD_CLIENT_SECRET";
pub const TENANT_ID_ENV: &str = "TENANT_ID";
pub const RESOURCE_MANAGER_ENDPOINT_ENV: &str = "AZURE_RESOURCE_MANAGER_ENDPOINT";
pub const GRAPH_ENDPOINT_ENV: &str = "MICROSOFT_GRAPH_ENDPOINT";

/// Deletes stale Azure resource groups and orphaned role assignments.
#[derive(Parser, Debug, Clone)]
#[command(name = "rg-cleanup", version, long_about = None)]
pub struct CleanupArgs {
    /// Log what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// How long a resource group may live before it is considered stale (e.g. 72h, 3h30m, 2d)
    #[arg(long, default_value = "72h")]
    pub ttl: String,

    /// Only delete resource groups whose whole name matches this regex
    #[arg(long, default_value = "")]
    pub regex: String,

    /// Also delete role assignments whose service principal no longer exists
    #[arg(long)]
    pub role_assignments: bool,

    /// Authenticate with the managed identity named by AAD_CLIENT_ID
    #[arg(long)]
    pub identity: bool,

    /// Authenticate with the logged in Azure CLI
    #[arg(long)]
    pub az_cli: bool,

    /// Stop the resource group sweep at the first failed delete
    #[arg(long)]
    pub fail_fast: bool,

    /// Keep deleting role assignments after a failed delete
    #[arg(long)]
    pub role_assignments_best_effort: bool,
}

#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub subscription_id: SubscriptionId,
    pub client_id: Option<String>,
    pub credential: CredentialMode,
    pub retention: RetentionPolicy,
    pub endpoints: AzureEndpoints,
    pub dry_run: bool,
    pub role_assignments: bool,
    pub sweep_continue_on_error: bool,
    pub role_assignments_continue_on_error: bool,
}

impl CleanupConfig {
    pub fn load(args: CleanupArgs) -> AppResult<Self> {
        Self::from_sources(args, |name| env::var(name).ok())
    }

    /// Builds the configuration from parsed flags and an environment lookup.
    pub fn from_sources<F>(args: CleanupArgs, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let subscription_id = SubscriptionId::new(
            value(SUBSCRIPTION_ID_ENV).ok_or_else(|| empty_env(SUBSCRIPTION_ID_ENV))?,
        )?;
        let client_id = value(AAD_CLIENT_ID_ENV);
        let client_secret = value(AAD_CLIENT_SECRET_ENV);
        let tenant_id = value(TENANT_ID_ENV);

        if !args.az_cli {
            if client_id.is_none() {
                return Err(empty_env(AAD_CLIENT_ID_ENV));
            }
            if !args.identity {
                if client_secret.is_none() {
                    return Err(empty_env(AAD_CLIENT_SECRET_ENV));
                }
                if tenant_id.is_none() {
                    return Err(empty_env(TENANT_ID_ENV));
                }
            }
        }

        let credential = select_credential(&args, client_id.clone(), client_secret, tenant_id)?;
        let retention = RetentionPolicy::new(parse_ttl(args.ttl.as_str())?, args.regex.as_str())?;
        let endpoints = AzureEndpoints::new(
            value(RESOURCE_MANAGER_ENDPOINT_ENV)
                .as_deref()
                .unwrap_or(PUBLIC_RESOURCE_MANAGER_ENDPOINT),
            value(GRAPH_ENDPOINT_ENV)
                .as_deref()
                .unwrap_or(PUBLIC_GRAPH_ENDPOINT),
        )?;

        Ok(Self {
            subscription_id,
            client_id,
            credential,
            retention,
            endpoints,
            dry_run: args.dry_run,
            role_assignments: args.role_assignments,
            sweep_continue_on_error: !args.fail_fast,
            role_assignments_continue_on_error: args.role_assignments_best_effort,
        })
    }
}

/// Picks the first applicable credential: managed identity, client secret, Azure CLI.
fn select_credential(
    args: &CleanupArgs,
    client_id: Option<String>,
    client_secret: Option<String>,
    tenant_id: Option<String>,
) -> AppResult<CredentialMode> {
    if args.identity {
        return Ok(CredentialMode::ManagedIdentity { client_id });
    }

    if let (Some(client_secret), Some(tenant_id), Some(client_id)) =
        (client_secret, tenant_id, client_id)
    {
        return Ok(CredentialMode::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        });
    }

    if args.az_cli {
        return Ok(CredentialMode::AzureCli);
    }

    Err(AppError::Validation(
        "no login option configured; use --identity, --az-cli or a client secret".to_owned(),
    ))
}

fn empty_env(name: &str) -> AppError {
    AppError::Validation(format!("${name} is empty"))
}
