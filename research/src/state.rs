use crate::schemas::{PainPointSummary, SolutionSummary};
use clients::reddit::{Comment, Post};
use clients::vectors::PainPoint;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recognized tunables for a research run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    pub num_keywords: usize,
    pub posts_per_subreddit: u32,
    pub min_post_score: i64,
    pub min_comments: i64,
    pub comments_per_post: u32,
    pub min_comment_score: i64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            num_keywords: 5,
            posts_per_subreddit: 10,
            min_post_score: 10,
            min_comments: 5,
            comments_per_post: 50,
            min_comment_score: 2,
        }
    }
}

/// The single record threaded through every pipeline stage. Each collection
/// is written by exactly one stage; later stages read but never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    pub project_id: String,
    pub project_idea: String,
    pub config: ResearchConfig,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subreddits: Vec<String>,
    #[serde(default)]
    pub reddit_posts: Vec<Post>,
    #[serde(default)]
    pub filtered_posts: Vec<Post>,
    #[serde(default)]
    pub reddit_comments: Vec<Comment>,
    #[serde(default)]
    pub pain_points: Vec<PainPoint>,
    #[serde(default)]
    pub summarized_pain_points: Option<PainPointSummary>,
    #[serde(default)]
    pub solution_keywords: Vec<String>,
    #[serde(default)]
    pub solution_reddit_posts: Vec<Post>,
    #[serde(default)]
    pub solution_filtered_posts: Vec<Post>,
    #[serde(default)]
    pub reddit_solutions: Vec<String>,
    #[serde(default)]
    pub llm_solutions: Vec<String>,
    #[serde(default)]
    pub summarized_llm_solutions: Option<SolutionSummary>,
    #[serde(default)]
    pub report_path: String,
}

impl ResearchState {
    pub fn new(project_id: &str, project_idea: &str, config: ResearchConfig) -> Self {
        Self {
            project_id: project_id.to_string(),
            project_idea: project_idea.to_string(),
            config,
            keywords: Vec::new(),
            subreddits: Vec::new(),
            reddit_posts: Vec::new(),
            filtered_posts: Vec::new(),
            reddit_comments: Vec::new(),
            pain_points: Vec::new(),
            summarized_pain_points: None,
            solution_keywords: Vec::new(),
            solution_reddit_posts: Vec::new(),
            solution_filtered_posts: Vec::new(),
            reddit_solutions: Vec::new(),
            llm_solutions: Vec::new(),
            summarized_llm_solutions: None,
            report_path: String::new(),
        }
    }
}

/// Deterministic identifier for a pain point: the same text always hashes to
/// the same id, so repeat runs upsert instead of accumulating duplicates.
pub fn content_id(text: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, text.as_bytes()).to_string()
}
