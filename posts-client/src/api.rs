use crate::metrics::{FetchMetrics, MetricsCollector, RequestMetrics};
use crate::PostFetcher;
use async_trait::async_trait;
use postboard_core::{AppConfig, CoreError, Post, PostsApiError};
use reqwest::{header, Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// HTTP client for the posts endpoint. One GET per call, no retries, no cache.
#[derive(Debug)]
pub struct PostsApiClient {
    http_client: Client,
    endpoint: Url,
    metrics: Arc<MetricsCollector>,
    user_agent: String,
}

impl PostsApiClient {
    pub fn new(
        endpoint: &str,
        user_agent: String,
        timeout: Option<Duration>,
    ) -> Result<Self, CoreError> {
        let endpoint = Url::parse(endpoint).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid posts endpoint '{}': {}", endpoint, e),
        })?;

        let mut builder = Client::builder().user_agent(&user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            endpoint,
            metrics: Arc::new(MetricsCollector::new()),
            user_agent,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        Self::new(
            &config.posts_endpoint,
            config.user_agent.clone(),
            config.request_timeout(),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Issues the GET and decodes the body. Every outcome is recorded in
    /// the metrics collector before it is returned.
    pub async fn get_posts(&self) -> Result<Vec<Post>, CoreError> {
        let start_time = Instant::now();
        let mut status_code = None;

        info!("Starting fetch from {}", self.endpoint);
        let result = self.execute(&mut status_code).await;

        let request_metrics = RequestMetrics {
            endpoint: self.endpoint.path().to_string(),
            status_code,
            response_time: start_time.elapsed(),
            posts_received: result.as_ref().map(Vec::len).unwrap_or(0),
            success: result.is_ok(),
            error_type: result.as_ref().err().map(error_type),
        };
        let totals = self.metrics.record_request(request_metrics).await;
        debug!(
            "Fetch totals: {} requests, {:.0}% ok, {} parse failures, avg {:?}",
            totals.total_requests,
            totals.success_rate() * 100.0,
            totals.parse_failures,
            totals.average_response_time()
        );

        result
    }

    async fn execute(&self, status_code: &mut Option<u16>) -> Result<Vec<Post>, CoreError> {
        let response = self
            .http_client
            .get(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!("Network error for GET {}: {}", self.endpoint, e);
                transport_error(e)
            })?;

        let status = response.status();
        *status_code = Some(status.as_u16());
        info!("Response status: {}", status);

        if !status.is_success() {
            error!("Request failed with status: {} for {}", status, self.endpoint);
            return Err(status_error(status));
        }

        let body = response.bytes().await.map_err(|e| {
            error!("Failed to read response body from {}: {}", self.endpoint, e);
            transport_error(e)
        })?;

        let posts = decode_posts(&body)?;
        info!("Received {} posts", posts.len());
        Ok(posts)
    }

    pub async fn get_metrics(&self) -> FetchMetrics {
        self.metrics.get_metrics().await
    }
}

#[async_trait]
impl PostFetcher for PostsApiClient {
    async fn fetch_posts(&self) -> Result<Vec<Post>, CoreError> {
        self.get_posts().await
    }
}

/// Decodes a JSON array of posts. Anything else, including an array with an
/// incomplete post, is a parse failure.
pub fn decode_posts(body: &[u8]) -> Result<Vec<Post>, CoreError> {
    serde_json::from_slice::<Vec<Post>>(body).map_err(|e| {
        error!("Failed to parse posts payload: {}", e);
        CoreError::PostsApi(PostsApiError::InvalidResponse {
            details: e.to_string(),
        })
    })
}

fn transport_error(e: reqwest::Error) -> CoreError {
    if e.is_timeout() {
        warn!("Request to posts endpoint timed out");
        CoreError::PostsApi(PostsApiError::RequestTimeout)
    } else {
        CoreError::PostsApi(PostsApiError::Unreachable {
            reason: e.to_string(),
        })
    }
}

fn status_error(status: StatusCode) -> CoreError {
    debug!("Mapping HTTP status {} to fetch error", status);
    CoreError::PostsApi(PostsApiError::HttpStatus {
        status_code: status.as_u16(),
    })
}

fn error_type(error: &CoreError) -> String {
    if error.is_parse_error() {
        "parse_error".to_string()
    } else {
        match error {
            CoreError::PostsApi(PostsApiError::RequestTimeout) => "timeout".to_string(),
            CoreError::PostsApi(PostsApiError::HttpStatus { .. }) => "http_status".to_string(),
            _ => "network_error".to_string(),
        }
    }
}
