//! Access token acquisition through `azure_identity`.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use azure_core::credentials::{Secret, TokenCredential};
use azure_identity::{
    AzureCliCredential, ClientSecretCredential, ManagedIdentityCredential,
    ManagedIdentityCredentialOptions, UserAssignedId,
};
use rg_cleanup_core::{AppError, AppResult};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Source of bearer tokens for one OAuth scope.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Returns a bearer token valid for `scope`.
    async fn bearer_token(&self, scope: &str) -> AppResult<String>;
}

/// How the process authenticates against Azure.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialMode {
    /// Service principal with a client secret.
    ClientSecret {
        /// Directory tenant id.
        tenant_id: String,
        /// Application (client) id.
        client_id: String,
        /// Client secret.
        client_secret: String,
    },
    /// Managed identity, user-assigned when a client id is given.
    ManagedIdentity {
        /// Client id of the user-assigned identity.
        client_id: Option<String>,
    },
    /// Token from the locally logged in Azure CLI.
    AzureCli,
}

impl CredentialMode {
    /// Returns a short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ClientSecret { .. } => "client_secret",
            Self::ManagedIdentity { .. } => "managed_identity",
            Self::AzureCli => "azure_cli",
        }
    }
}

impl Debug for CredentialMode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => formatter
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            Self::ManagedIdentity { client_id } => formatter
                .debug_struct("ManagedIdentity")
                .field("client_id", client_id)
                .finish(),
            Self::AzureCli => formatter.write_str("AzureCli"),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Token source backed by an `azure_identity` credential, caching one token per scope.
pub struct AzureIdentityTokenSource {
    credential: Arc<dyn TokenCredential>,
    mode: &'static str,
    cached_tokens: RwLock<HashMap<String, CachedToken>>,
}

impl Debug for AzureIdentityTokenSource {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AzureIdentityTokenSource")
            .field("mode", &self.mode)
            .finish()
    }
}

impl AzureIdentityTokenSource {
    /// Builds the credential selected by `mode`.
    pub fn new(mode: &CredentialMode) -> AppResult<Self> {
        let credential: Arc<dyn TokenCredential> = match mode {
            CredentialMode::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => ClientSecretCredential::new(
                tenant_id.as_str(),
                client_id.clone(),
                Secret::new(client_secret.clone()),
                None,
            )
            .map_err(|error| credential_error(mode, &error))?,
            CredentialMode::ManagedIdentity { client_id } => {
                let options = client_id.as_ref().map(|client_id| ManagedIdentityCredentialOptions {
                    user_assigned_id: Some(UserAssignedId::ClientId(client_id.clone())),
                    ..Default::default()
                });
                ManagedIdentityCredential::new(options)
                    .map_err(|error| credential_error(mode, &error))?
            }
            CredentialMode::AzureCli => {
                AzureCliCredential::new(None).map_err(|error| credential_error(mode, &error))?
            }
        };

        Ok(Self {
            credential,
            mode: mode.label(),
            cached_tokens: RwLock::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl AccessTokenSource for AzureIdentityTokenSource {
    async fn bearer_token(&self, scope: &str) -> AppResult<String> {
        {
            let cached_tokens = self.cached_tokens.read().await;
            if let Some(cached) = cached_tokens.get(scope)
                && Instant::now() < cached.refresh_at
            {
                return Ok(cached.token.clone());
            }
        }

        let mut cached_tokens = self.cached_tokens.write().await;
        if let Some(cached) = cached_tokens.get(scope)
            && Instant::now() < cached.refresh_at
        {
            return Ok(cached.token.clone());
        }

        let access_token = self
            .credential
            .get_token(&[scope], None)
            .await
            .map_err(|error| {
                AppError::Unauthorized(format!(
                    "failed to acquire {} token for scope '{scope}': {error}",
                    self.mode
                ))
            })?;

        let lifetime_seconds = (access_token.expires_on - OffsetDateTime::now_utc())
            .whole_seconds()
            .max(0)
            .unsigned_abs();
        let refresh_at = Instant::now()
            + Duration::from_secs(lifetime_seconds).saturating_sub(TOKEN_REFRESH_MARGIN);
        let token = access_token.token.secret().to_owned();

        debug!(
            mode = self.mode,
            scope,
            expires_in_seconds = lifetime_seconds,
            "acquired access token"
        );

        cached_tokens.insert(
            scope.to_owned(),
            CachedToken {
                token: token.clone(),
                refresh_at,
            },
        );

        Ok(token)
    }
}

fn credential_error(mode: &CredentialMode, error: &azure_core::Error) -> AppError {
    AppError::Unauthorized(format!(
        "failed to create {} credential: {error}",
        mode.label()
    ))
}
