use std::sync::Arc;

use rg_cleanup_core::{AppError, AppResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::azure_token_source::AccessTokenSource;

/// Authenticated JSON client for one Azure REST endpoint.
///
/// Every request carries a bearer token for `scope`. Absolute URLs handed in
/// from responses (for example `nextLink`) must share the origin of `base_url`
/// so the token is never sent elsewhere.
#[derive(Clone)]
pub(crate) struct AzureRestClient {
    http_client: reqwest::Client,
    token_source: Arc<dyn AccessTokenSource>,
    base_url: Url,
    scope: String,
}

impl AzureRestClient {
    pub(crate) fn new(
        http_client: reqwest::Client,
        token_source: Arc<dyn AccessTokenSource>,
        base_url: Url,
        scope: String,
    ) -> Self {
        Self {
            http_client,
            token_source,
            base_url,
            scope,
        }
    }

    /// Builds a URL below the base from path segments and query pairs.
    pub(crate) fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                AppError::Internal(format!("endpoint '{}' cannot be a base", self.base_url))
            })?;
            path.pop_if_empty().extend(segments);
        }
        append_query(&mut url, query);
        Ok(url)
    }

    /// Builds a URL from a resource id path such as `/subscriptions/.../roleAssignments/x`.
    pub(crate) fn resource_id_endpoint(
        &self,
        resource_id: &str,
        query: &[(&str, &str)],
    ) -> AppResult<Url> {
        let segments: Vec<&str> = resource_id
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.is_empty() {
            return Err(AppError::Validation(format!(
                "resource id '{resource_id}' is empty"
            )));
        }
        self.endpoint(&segments, query)
    }

    /// Parses a continuation link returned by the service.
    pub(crate) fn continuation(&self, link: &str) -> AppResult<Url> {
        let url = Url::parse(link).map_err(|error| {
            AppError::Upstream(format!("invalid continuation link '{link}': {error}"))
        })?;

        if url.origin() != self.base_url.origin() {
            return Err(AppError::Upstream(format!(
                "continuation link '{link}' does not belong to '{}'",
                self.base_url
            )));
        }

        Ok(url)
    }

    pub(crate) async fn get_json<T>(&self, url: Url) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let request = self.http_client.get(url.clone());
        let response = self.send(request, &url).await?;
        decode_json(response, &url).await
    }

    pub(crate) async fn post_json<B, T>(&self, url: Url, body: &B) -> AppResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.http_client.post(url.clone()).json(body);
        let response = self.send(request, &url).await?;
        decode_json(response, &url).await
    }

    /// Sends a DELETE and returns the success status code.
    pub(crate) async fn delete(&self, url: Url) -> AppResult<reqwest::StatusCode> {
        let request = self.http_client.delete(url.clone());
        let response = self.send(request, &url).await?;
        Ok(response.status())
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> AppResult<reqwest::Response> {
        let token = self.token_source.bearer_token(&self.scope).await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("request to '{url}' failed: {error}")))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<response body unavailable>".to_owned());
        Err(status_error(status, url, &body))
    }
}

fn append_query(url: &mut Url, query: &[(&str, &str)]) {
    if query.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in query {
        pairs.append_pair(key, value);
    }
}

async fn decode_json<T>(response: reqwest::Response, url: &Url) -> AppResult<T>
where
    T: DeserializeOwned,
{
    let body = response.bytes().await.map_err(|error| {
        AppError::Internal(format!("failed to read response from '{url}': {error}"))
    })?;
    serde_json::from_slice(&body).map_err(|error| {
        AppError::Internal(format!("failed to decode response from '{url}': {error}"))
    })
}

pub(crate) fn status_error(status: reqwest::StatusCode, url: &Url, body: &str) -> AppError {
    let message = format!("{status} from '{}': {}", url.path(), body.trim());
    match status {
        reqwest::StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        reqwest::StatusCode::FORBIDDEN => AppError::Forbidden(message),
        reqwest::StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ => AppError::Upstream(message),
    }
}
