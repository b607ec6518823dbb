mod report;
mod schemas;
mod state;
mod truncate;
mod workflow;

use clap::Parser;
use clients::Result;
use clients::llm::{OpenAIEmbedder, OpenAIExtractor};
use clients::progress::LogProgress;
use clients::reddit::RedditClient;
use clients::vectors::QdrantStore;
use state::ResearchConfig;
use std::path::PathBuf;
use std::sync::Arc;
use workflow::{ResearchWorkflow, RunHandle};

/// Mine Reddit for user-voiced pain points around a project idea, cluster
/// them, and generate candidate solutions.
#[derive(Parser)]
struct Args {
    /// Stable identifier for this research project
    #[arg(long)]
    project_id: String,

    /// Free-text description of the project idea
    #[arg(long)]
    idea: String,

    /// Chat model used for structured extraction
    #[arg(long, env = "MODEL_NAME")]
    model: String,

    /// OpenAI-compatible endpoint for the chat model
    #[arg(long, env = "LLM_ENDPOINT")]
    endpoint: String,

    #[arg(long, env = "EMBEDDING_MODEL")]
    embedding_model: String,

    #[arg(long, env = "EMBEDDING_ENDPOINT")]
    embedding_endpoint: String,

    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6334")]
    qdrant_url: String,

    /// Directory where run artifacts are written
    #[arg(long, default_value = "projects")]
    projects_path: PathBuf,

    #[arg(long, default_value_t = 5)]
    num_keywords: usize,

    #[arg(long, default_value_t = 10)]
    posts_per_subreddit: u32,

    #[arg(long, default_value_t = 10)]
    min_post_score: i64,

    #[arg(long, default_value_t = 5)]
    min_comments: i64,

    #[arg(long, default_value_t = 50)]
    comments_per_post: u32,

    #[arg(long, default_value_t = 2)]
    min_comment_score: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let workflow = ResearchWorkflow::builder()
        .reddit(Arc::new(RedditClient::new()?))
        .extractor(OpenAIExtractor::new(args.model, args.endpoint))
        .embedder(OpenAIEmbedder::new(args.embedding_model, args.embedding_endpoint))
        .store(Arc::new(QdrantStore::connect(&args.qdrant_url).await?))
        .report(Arc::new(report::MarkdownReport::new(
            args.projects_path.join(&args.project_id),
        )))
        .progress(Arc::new(LogProgress))
        .projects_path(args.projects_path.clone())
        .build()?;

    let config = ResearchConfig {
        num_keywords: args.num_keywords,
        posts_per_subreddit: args.posts_per_subreddit,
        min_post_score: args.min_post_score,
        min_comments: args.min_comments,
        comments_per_post: args.comments_per_post,
        min_comment_score: args.min_comment_score,
    };

    let handle = RunHandle::new();
    let outcome = workflow
        .run_research(&handle, &args.project_id, &args.idea, config)
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    println!("final state: {}", outcome.snapshot_path.display());
    Ok(())
}
