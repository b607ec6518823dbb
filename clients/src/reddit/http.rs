use super::limiter::RateLimiter;
use super::{Comment, Post, RedditApi, Sort, TimeWindow};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

const USER_AGENT: &str = concat!("pain-point-research/", env!("CARGO_PKG_VERSION"));

/// Client for the public Reddit JSON API. Every request goes through the
/// rate limiter.
pub struct RedditClient {
    http: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl RedditClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url("https://www.reddit.com".to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().user_agent(USER_AGENT).build()?,
            base_url,
            limiter: RateLimiter::new(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        self.limiter
            .call(|| async {
                let response = self.http.get(&url).query(query).send().await?;
                if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(Error::RateLimited(format!("too many requests for {url}")));
                }
                let value = response
                    .error_for_status()?
                    .json::<serde_json::Value>()
                    .await?;
                Ok(value)
            })
            .await
    }
}

#[async_trait]
impl RedditApi for RedditClient {
    async fn search_communities(&self, keyword: &str) -> Result<Vec<String>> {
        let value = self
            .get_json(
                "/search.json",
                &[
                    ("q", keyword.to_string()),
                    ("sort", "relevance".to_string()),
                    ("t", "all".to_string()),
                    ("limit", "100".to_string()),
                ],
            )
            .await?;

        let listing: Listing<PostData> = serde_json::from_value(value)?;
        Ok(rank_communities(&listing))
    }

    async fn search_posts(
        &self,
        community: &str,
        query: &str,
        sort: Sort,
        window: Option<TimeWindow>,
        limit: u32,
    ) -> Result<Vec<Post>> {
        let mut params = vec![
            ("q", query.to_string()),
            ("restrict_sr", "1".to_string()),
            ("sort", sort.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(window) = window {
            params.push(("t", window.as_str().to_string()));
        }

        let value = self
            .get_json(&format!("/r/{community}/search.json"), &params)
            .await?;

        let listing: Listing<PostData> = serde_json::from_value(value)?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into_post())
            .collect())
    }

    async fn fetch_comments(
        &self,
        post_id: &str,
        limit: u32,
        min_score: i64,
    ) -> Result<Vec<Comment>> {
        let value = self
            .get_json(
                &format!("/comments/{post_id}.json"),
                &[("raw_json", "1".to_string())],
            )
            .await?;

        // The endpoint returns [post listing, comment listing].
        let comment_listing = value.get(1).cloned().unwrap_or_default();
        let mut comments = Vec::new();
        collect_comments(
            &comment_listing,
            post_id,
            min_score,
            limit as usize,
            &mut comments,
        );
        Ok(comments)
    }
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    children: Vec<Child<T>>,
}

#[derive(Debug, Deserialize)]
struct Child<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    subreddit: String,
    score: i64,
    num_comments: i64,
    created_utc: f64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    link_flair_text: Option<String>,
}

impl PostData {
    fn into_post(self) -> Post {
        Post {
            id: self.id,
            title: self.title,
            content: self.selftext,
            subreddit: self.subreddit,
            score: self.score,
            num_comments: self.num_comments,
            created_time: self.created_utc,
            url: self.url,
            author: self.author.unwrap_or_else(|| "[deleted]".to_string()),
            flair: self.link_flair_text,
        }
    }
}

/// Community names ranked by how often they occur in the search results,
/// most frequent first. Ties break alphabetically to keep output stable.
fn rank_communities(listing: &Listing<PostData>) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for child in &listing.data.children {
        *counts.entry(child.data.subreddit.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(name, _)| name.to_string()).collect()
}

/// Walks a comment listing depth-first, keeping usable comments that clear
/// `min_score` until `limit` is reached. The tree mixes comment nodes with
/// "more" stubs, so children are inspected structurally.
fn collect_comments(
    listing: &serde_json::Value,
    post_id: &str,
    min_score: i64,
    limit: usize,
    out: &mut Vec<Comment>,
) {
    let Some(children) = listing.pointer("/data/children").and_then(|v| v.as_array()) else {
        return;
    };

    for child in children {
        if out.len() >= limit {
            return;
        }
        if child.get("kind").and_then(|k| k.as_str()) != Some("t1") {
            continue;
        }
        let Some(data) = child.get("data") else {
            continue;
        };

        let body = data.get("body").and_then(|v| v.as_str()).unwrap_or_default();
        let author = data
            .get("author")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let score = data.get("score").and_then(|v| v.as_i64()).unwrap_or_default();

        let usable = !body.is_empty()
            && body != "[deleted]"
            && body != "[removed]"
            && !author.is_empty()
            && author != "[deleted]";

        if usable && score >= min_score {
            out.push(Comment {
                id: data
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                post_id: post_id.to_string(),
                content: body.to_string(),
                score,
                created_time: data
                    .get("created_utc")
                    .and_then(|v| v.as_f64())
                    .unwrap_or_default(),
                author: author.to_string(),
                parent_id: data
                    .get("parent_id")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                depth: data.get("depth").and_then(|v| v.as_u64()).unwrap_or_default() as u32,
                upvotes: data.get("ups").and_then(|v| v.as_i64()).unwrap_or_default(),
                downvotes: data.get("downs").and_then(|v| v.as_i64()).unwrap_or_default(),
            });
        }

        if let Some(replies) = data.get("replies") {
            if replies.is_object() {
                collect_comments(replies, post_id, min_score, limit, out);
            }
        }
    }
}
