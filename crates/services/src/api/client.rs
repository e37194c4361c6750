use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use super::config::ApiConfig;
use crate::error::ApiError;

/// Empty query string for plain GETs.
pub(crate) const NO_QUERY: &[(&str, &str)] = &[];

/// Thin JSON-over-HTTP wrapper shared by every backend collaborator.
///
/// Attaches the bearer token when configured and turns non-success
/// responses into `ApiError` before any body is decoded.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Build a client from `TRAIL_API_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidConfig` for malformed settings.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ApiConfig::from_env()?)
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub(crate) async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.config.url(path);
        debug!(%url, "GET");
        let response = self
            .authorized(self.client.get(url))
            .query(query)
            .send()
            .await?;
        decode(response).await
    }

    pub(crate) async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.config.url(path);
        debug!(%url, "POST");
        let response = self
            .authorized(self.client.post(url))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    /// POST with query parameters only, discarding the response body.
    pub(crate) async fn post_query<Q>(&self, path: &str, query: &Q) -> Result<(), ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.config.url(path);
        debug!(%url, "POST");
        let response = self
            .authorized(self.client.post(url))
            .query(query)
            .send()
            .await?;
        check_status(response).await.map(drop)
    }

    /// PATCH with query parameters and an empty JSON object body.
    pub(crate) async fn patch_query<Q>(&self, path: &str, query: &Q) -> Result<(), ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.config.url(path);
        debug!(%url, "PATCH");
        let response = self
            .authorized(self.client.patch(url))
            .query(query)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check_status(response).await.map(drop)
    }

    /// Whether the backend answers its health probe.
    pub async fn health(&self) -> bool {
        let url = self.config.url("/health");
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(%err, "health probe failed");
                false
            }
        }
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }

    let detail = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));

    Err(ApiError::Status { status, detail })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ApiError::Decode)
}
