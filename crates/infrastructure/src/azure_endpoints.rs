use rg_cleanup_core::{AppError, AppResult};
use url::Url;

/// Azure public cloud resource manager endpoint.
pub const PUBLIC_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com";

/// Microsoft Graph endpoint for the public cloud.
pub const PUBLIC_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com";

/// Base URLs of the services the adapters talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureEndpoints {
    resource_manager: Url,
    graph: Url,
}

impl AzureEndpoints {
    /// Creates endpoints from base URLs such as `https://management.azure.com`.
    pub fn new(resource_manager: &str, graph: &str) -> AppResult<Self> {
        Ok(Self {
            resource_manager: parse_base_url("resource manager", resource_manager)?,
            graph: parse_base_url("graph", graph)?,
        })
    }

    /// Returns the public cloud endpoints.
    pub fn public() -> AppResult<Self> {
        Self::new(PUBLIC_RESOURCE_MANAGER_ENDPOINT, PUBLIC_GRAPH_ENDPOINT)
    }

    /// Returns the resource manager base URL.
    #[must_use]
    pub fn resource_manager(&self) -> &Url {
        &self.resource_manager
    }

    /// Returns the Microsoft Graph base URL.
    #[must_use]
    pub fn graph(&self) -> &Url {
        &self.graph
    }

    /// Returns the token scope for the resource manager.
    #[must_use]
    pub fn resource_manager_scope(&self) -> String {
        default_scope(&self.resource_manager)
    }

    /// Returns the token scope for Microsoft Graph.
    #[must_use]
    pub fn graph_scope(&self) -> String {
        default_scope(&self.graph)
    }
}

fn parse_base_url(label: &str, value: &str) -> AppResult<Url> {
    let url = Url::parse(value.trim()).map_err(|error| {
        AppError::Validation(format!("invalid {label} endpoint '{value}': {error}"))
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "{label} endpoint '{value}' must be an http(s) base URL"
        )));
    }

    Ok(url)
}

fn default_scope(url: &Url) -> String {
    format!("{}/.default", url.as_str().trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_scopes_use_default_suffix() {
        let endpoints = AzureEndpoints::public();
        assert!(endpoints.is_ok());
        let endpoints = endpoints.unwrap_or_else(|_| unreachable!());
        assert_eq!(
            endpoints.resource_manager_scope(),
            "https://management.azure.com/.default"
        );
        assert_eq!(endpoints.graph_scope(), "https://graph.microsoft.com/.default");
    }

    #[test]
    fn non_http_endpoints_are_rejected() {
        assert!(AzureEndpoints::new("mailto:ops@example.com", PUBLIC_GRAPH_ENDPOINT).is_err());
        assert!(AzureEndpoints::new(PUBLIC_RESOURCE_MANAGER_ENDPOINT, "not a url").is_err());
    }
}
