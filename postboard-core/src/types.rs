use serde::{Deserialize, Serialize};

/// Preference key under which the last search term is stored.
pub const SEARCH_TEXT_KEY: &str = "SEARCH_TEXT";

pub const DEFAULT_POSTS_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://postboard.db";
pub const DEFAULT_USER_AGENT: &str = "postboard/0.1";

/// A single post as served by the posts endpoint.
///
/// All four fields are required on the wire; a payload missing any of them
/// is rejected when the response is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
}

/// Posts authored by one user, in the order they arrived from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostGroup {
    pub user_id: i64,
    pub posts: Vec<Post>,
}

impl PostGroup {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            posts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn label(&self) -> String {
        format!("User {}", self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub posts_endpoint: String,
    pub database_url: String,
    pub user_agent: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            posts_endpoint: DEFAULT_POSTS_ENDPOINT.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: None,
        }
    }
}
