use std::time::Duration;

use async_trait::async_trait;
use lokictx_core::ContextConfig;
use lokictx_protocol::query_range::{QueryRangeRequest, QueryRangeResponse, QUERY_RANGE_PATH};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Tenant header understood by multi-tenant Loki deployments.
pub const ORG_ID_HEADER: &str = "X-Scope-OrgID";

/// Anything that can answer a `query_range` request.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn query_range(
        &self,
        request: &QueryRangeRequest,
    ) -> Result<QueryRangeResponse, ClientError>;
}

/// Typed HTTP client for the backend's range query endpoint.
#[derive(Clone)]
pub struct LokiClient {
    http: reqwest::Client,
    base_url: Url,
    org_id: Option<String>,
}

impl LokiClient {
    /// Creates a client with no request timeout and no tenant header.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let url = Url::parse(base_url).map_err(|err| ClientError::InvalidUrl {
            url: base_url.to_string(),
            source: err,
        })?;
        Self::with_options(url, None, None)
    }

    pub fn from_config(config: &ContextConfig) -> Result<Self, ClientError> {
        Self::with_options(
            config.loki_url.clone(),
            config.timeout,
            config.org_id.clone(),
        )
    }

    fn with_options(
        mut url: Url,
        timeout: Option<Duration>,
        org_id: Option<String>,
    ) -> Result<Self, ClientError> {
        // Keep any path prefix (e.g. a reverse-proxy mount) when joining.
        if !url.path().ends_with('/') {
            let mut path = url.path().trim_end_matches('/').to_string();
            path.push('/');
            url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ClientError::Http(err.to_string()))?;

        Ok(Self {
            http,
            base_url: url,
            org_id,
        })
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self) -> Result<Url, ClientError> {
        self.base_url
            .join(QUERY_RANGE_PATH)
            .map_err(|err| ClientError::InvalidUrl {
                url: format!("{}{}", self.base_url, QUERY_RANGE_PATH),
                source: err,
            })
    }
}

#[async_trait]
impl LogSource for LokiClient {
    async fn query_range(
        &self,
        request: &QueryRangeRequest,
    ) -> Result<QueryRangeResponse, ClientError> {
        let url = self.endpoint()?;
        let mut call = self.http.get(url).query(request);
        if let Some(org_id) = &self.org_id {
            call = call.header(ORG_ID_HEADER, org_id);
        }

        let response = call
            .send()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus {
                status,
                body: body.trim().to_string(),
            });
        }

        let payload: QueryRangeResponse = response
            .json()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))?;

        debug!(
            direction = ?request.direction,
            limit = request.limit,
            streams = payload.streams().len(),
            entries = payload.entry_count(),
            "query_range answered"
        );
        Ok(payload)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid backend url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("backend HTTP request failed: {0}")]
    Http(String),
    #[error("backend returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}
