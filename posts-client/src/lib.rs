use async_trait::async_trait;
use postboard_core::{CoreError, Post};

pub mod api;
pub mod metrics;


pub use api::{decode_posts, PostsApiClient};
pub use metrics::{FetchMetrics, MetricsCollector};

/// Source of posts for a screen.
///
/// One call is one attempt: implementations do not retry or cache, and
/// callers decide when to ask again.
#[async_trait]
pub trait PostFetcher: Send + Sync {
    async fn fetch_posts(&self) -> Result<Vec<Post>, CoreError>;
}
