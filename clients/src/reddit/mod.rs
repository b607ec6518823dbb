use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod http;
mod limiter;
pub use http::RedditClient;
pub use limiter::RateLimiter;

/// A fetched post. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub subreddit: String,
    pub score: i64,
    pub num_comments: i64,
    pub created_time: f64,
    pub url: String,
    pub author: String,
    pub flair: Option<String>,
}

/// A fetched comment. `post_id` is a back-reference to the parent post, not
/// an ownership edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub content: String,
    pub score: i64,
    pub created_time: f64,
    pub author: String,
    pub parent_id: Option<String>,
    pub depth: u32,
    pub upvotes: i64,
    pub downvotes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Relevance,
    Top,
    New,
}

impl Sort {
    pub fn as_str(self) -> &'static str {
        match self {
            Sort::Relevance => "relevance",
            Sort::Top => "top",
            Sort::New => "new",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

#[async_trait]
pub trait RedditApi {
    /// Community names ranked by how often they appear among search results
    /// for `keyword`, most frequent first.
    async fn search_communities(&self, keyword: &str) -> Result<Vec<String>>;

    /// Posts matching `query` within one community, for a single
    /// sort/time-window pass, capped at `limit` results.
    async fn search_posts(
        &self,
        community: &str,
        query: &str,
        sort: Sort,
        window: Option<TimeWindow>,
        limit: u32,
    ) -> Result<Vec<Post>>;

    /// Up to `limit` comments for a post with `score >= min_score`, skipping
    /// removed/deleted bodies and comments without an identifiable author.
    async fn fetch_comments(&self, post_id: &str, limit: u32, min_score: i64)
    -> Result<Vec<Comment>>;
}
