use std::{marker::PhantomData, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{StoryFeed, UserId},
    error::ApiError,
    protocol::{CategorySummary, CommentPayload, Page, PageQuery, ReplyPayload, StorySummary},
};
use tracing::debug;
use url::Url;

use crate::{error::FetchError, ResourceFetcher};

/// Typed client for the site's paginated REST endpoints.
pub struct DashboardApi {
    http: Client,
    base_url: Url,
}

impl DashboardApi {
    pub fn new(base_url: &str, request_timeout: Duration) -> anyhow::Result<Arc<Self>> {
        // Url::join treats a base without a trailing slash as a file and
        // would drop its last segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("invalid api base url '{base_url}'"))?;
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Arc::new(Self { http, base_url }))
    }

    pub fn stories(self: &Arc<Self>, feed: StoryFeed) -> ApiResource<StorySummary> {
        self.resource(format!("posts/{}", feed.as_path_segment()))
    }

    pub fn categories(self: &Arc<Self>) -> ApiResource<CategorySummary> {
        self.resource("categories")
    }

    pub fn user_comments(self: &Arc<Self>, user_id: UserId) -> ApiResource<CommentPayload> {
        self.resource(format!("users/{}/comments", user_id.0))
    }

    pub fn user_likes(self: &Arc<Self>, user_id: UserId) -> ApiResource<StorySummary> {
        self.resource(format!("users/{}/likes", user_id.0))
    }

    pub fn user_replies(self: &Arc<Self>, user_id: UserId) -> ApiResource<ReplyPayload> {
        self.resource(format!("users/{}/replies", user_id.0))
    }

    /// Binds this client to a relative collection path; the typed methods
    /// above are thin wrappers over it.
    pub fn resource<T>(self: &Arc<Self>, path: impl Into<String>) -> ApiResource<T> {
        ApiResource {
            api: Arc::clone(self),
            path: path.into(),
            _marker: PhantomData,
        }
    }

    async fn fetch_page_at<T: DeserializeOwned>(
        &self,
        path: &str,
        query: PageQuery,
    ) -> Result<Page<T>, FetchError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| FetchError::transport(None, format!("invalid path '{path}': {err}")))?;
        debug!(%url, page = query.page, limit = query.limit, "requesting page");

        let response = self
            .http
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|err| FetchError::transport(None, err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::transport(Some(status.as_u16()), err.to_string()))?;

        if !status.is_success() {
            // The API reports failures as a structured body; fall back to
            // the status line when it does not.
            let message = match serde_json::from_slice::<ApiError>(&body) {
                Ok(api_err) => api_err.to_string(),
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("unrecognized http failure")
                    .to_string(),
            };
            return Err(FetchError::transport(Some(status.as_u16()), message));
        }

        let page: Page<T> = serde_json::from_slice(&body)
            .map_err(|err| FetchError::decode(err.to_string()))?;
        if page.docs.len() > page.limit as usize {
            return Err(FetchError::decode(format!(
                "{} docs exceed the page limit {}",
                page.docs.len(),
                page.limit
            )));
        }
        Ok(page)
    }
}

/// One paginated collection endpoint, scoped to a client instance.
pub struct ApiResource<T> {
    api: Arc<DashboardApi>,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T> ResourceFetcher<T> for ApiResource<T>
where
    T: DeserializeOwned + Send + Sync,
{
    async fn fetch_page(&self, query: PageQuery) -> Result<Page<T>, FetchError> {
        self.api.fetch_page_at(&self.path, query).await
    }
}

#[cfg(test)]
#[path = "tests/api_client_tests.rs"]
mod tests;
