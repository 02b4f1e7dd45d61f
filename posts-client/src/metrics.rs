use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct FetchMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub parse_failures: u64,
    pub posts_received: u64,
    pub total_response_time: Duration,
    pub last_request_time: Option<SystemTime>,
    pub last_status_code: Option<u16>,
}

impl FetchMetrics {
    pub fn average_response_time(&self) -> Duration {
        if self.total_requests == 0 {
            Duration::from_millis(0)
        } else {
            let nanos = self.total_response_time.as_nanos() / u128::from(self.total_requests);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub endpoint: String,
    pub status_code: Option<u16>,
    pub response_time: Duration,
    pub posts_received: usize,
    pub success: bool,
    pub error_type: Option<String>,
}

#[derive(Debug)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<FetchMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(FetchMetrics::default())),
        }
    }

    /// Folds one request into the totals and returns the updated snapshot.
    pub async fn record_request(&self, request_metrics: RequestMetrics) -> FetchMetrics {
        let mut metrics = self.metrics.write().await;

        metrics.total_requests += 1;
        metrics.last_request_time = Some(SystemTime::now());
        metrics.total_response_time += request_metrics.response_time;
        metrics.last_status_code = request_metrics.status_code;

        if request_metrics.success {
            metrics.successful_requests += 1;
            metrics.posts_received += request_metrics.posts_received as u64;
        } else {
            metrics.failed_requests += 1;
            if request_metrics.error_type.as_deref() == Some("parse_error") {
                metrics.parse_failures += 1;
            }
        }
        metrics.clone()
    }

    pub async fn get_metrics(&self) -> FetchMetrics {
        self.metrics.read().await.clone()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
