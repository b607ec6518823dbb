use crate::report::ReportGenerator;
use crate::schemas::{
    KeywordList, PainPointCategory, PainPointList, PainPointSummary, PostScore,
    SolutionKeywordList, SolutionNarrative, SolutionPostScore, SolutionSummary,
};
use crate::state::{ResearchConfig, ResearchState, content_id};
use crate::truncate::truncate_to_word_budget;
use clients::llm::{Embedder, Extractor, SamplingParams, extract};
use clients::progress::ProgressSink;
use clients::reddit::{Comment, Post, RedditApi, Sort, TimeWindow};
use clients::vectors::{DUPLICATE_THRESHOLD, PainPoint, SimilarityStore};
use clients::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const KEYWORDS_PROMPT: &str = include_str!("prompts/keywords.md");
const FILTER_POST_PROMPT: &str = include_str!("prompts/filter_post.md");
const PAIN_POINTS_PROMPT: &str = include_str!("prompts/pain_points.md");
const CATEGORIZE_PROMPT: &str = include_str!("prompts/categorize.md");
const SUMMARIZE_PROMPT: &str = include_str!("prompts/summarize_pain_points.md");
const SOLUTION_KEYWORDS_PROMPT: &str = include_str!("prompts/solution_keywords.md");
const FILTER_SOLUTION_PROMPT: &str = include_str!("prompts/filter_solution_post.md");
const THEME_SOLUTION_PROMPT: &str = include_str!("prompts/theme_solution.md");
const SUMMARIZE_SOLUTIONS_PROMPT: &str = include_str!("prompts/summarize_solutions.md");

/// Posts scoring below this relevance verdict are dropped.
const RELEVANCE_THRESHOLD: u32 = 7;
/// Characters of post content shown to the relevance scorers.
const POST_EXCERPT_CHARS: usize = 500;
/// Word ceiling for the concatenated community-sourced solution texts.
const SOLUTION_WORD_BUDGET: usize = 10_000;
/// Communities kept per keyword during discovery.
const COMMUNITIES_PER_KEYWORD: usize = 2;
/// The three search passes run per keyword and community.
const SEARCH_STRATEGIES: [(Sort, Option<TimeWindow>); 3] = [
    (Sort::Relevance, Some(TimeWindow::All)),
    (Sort::Top, Some(TimeWindow::Month)),
    (Sort::New, None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Keywords,
    Subreddits,
    SearchPosts,
    FilterPosts,
    ExtractComments,
    AnalyzeContent,
    StoreVectors,
    SummarizePainPoints,
    SolutionKeywords,
    GenerateSolutions,
    GenerateReport,
}

impl Stage {
    pub const ALL: [Stage; 11] = [
        Stage::Keywords,
        Stage::Subreddits,
        Stage::SearchPosts,
        Stage::FilterPosts,
        Stage::ExtractComments,
        Stage::AnalyzeContent,
        Stage::StoreVectors,
        Stage::SummarizePainPoints,
        Stage::SolutionKeywords,
        Stage::GenerateSolutions,
        Stage::GenerateReport,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Keywords => "generate_keywords",
            Stage::Subreddits => "find_subreddits",
            Stage::SearchPosts => "search_posts",
            Stage::FilterPosts => "filter_posts",
            Stage::ExtractComments => "extract_comments",
            Stage::AnalyzeContent => "analyze_content",
            Stage::StoreVectors => "store_vectors",
            Stage::SummarizePainPoints => "summarize_pain_points",
            Stage::SolutionKeywords => "solution_keywords",
            Stage::GenerateSolutions => "generate_solutions",
            Stage::GenerateReport => "generate_report",
        }
    }
}

/// Caller-owned handle for one research run. Cancellation is cooperative:
/// it is checked before each stage, never mid-call.
#[derive(Default)]
pub struct RunHandle {
    cancelled: AtomicBool,
}

impl RunHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Headline cardinalities of a completed run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub keywords_found: usize,
    pub subreddits_found: usize,
    pub posts_found: usize,
    pub filtered_posts: usize,
    pub comments_found: usize,
    pub pain_points_identified: usize,
}

/// Public result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub state: ResearchState,
    pub snapshot_path: PathBuf,
    pub summary: RunSummary,
}

/// Drives the research pipeline: a fixed, strictly sequential chain of
/// stages over one mutable state record, with every external call going
/// through the collaborator traits.
pub struct ResearchWorkflow {
    reddit: Arc<dyn RedditApi + Send + Sync>,
    extractor: Arc<dyn Extractor + Send + Sync>,
    embedder: Arc<dyn Embedder + Send + Sync>,
    store: Arc<dyn SimilarityStore + Send + Sync>,
    report: Arc<dyn ReportGenerator + Send + Sync>,
    progress: Arc<dyn ProgressSink>,
    projects_path: PathBuf,
}

pub struct WorkflowBuilder {
    reddit: Option<Arc<dyn RedditApi + Send + Sync>>,
    extractor: Option<Arc<dyn Extractor + Send + Sync>>,
    embedder: Option<Arc<dyn Embedder + Send + Sync>>,
    store: Option<Arc<dyn SimilarityStore + Send + Sync>>,
    report: Option<Arc<dyn ReportGenerator + Send + Sync>>,
    progress: Option<Arc<dyn ProgressSink>>,
    projects_path: Option<PathBuf>,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self {
            reddit: None,
            extractor: None,
            embedder: None,
            store: None,
            report: None,
            progress: None,
            projects_path: None,
        }
    }

    pub fn reddit(mut self, reddit: Arc<dyn RedditApi + Send + Sync>) -> Self {
        self.reddit = Some(reddit);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn Extractor + Send + Sync>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder + Send + Sync>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn store(mut self, store: Arc<dyn SimilarityStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn report(mut self, report: Arc<dyn ReportGenerator + Send + Sync>) -> Self {
        self.report = Some(report);
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn projects_path(mut self, path: PathBuf) -> Self {
        self.projects_path = Some(path);
        self
    }

    pub fn build(self) -> Result<ResearchWorkflow> {
        Ok(ResearchWorkflow {
            reddit: self
                .reddit
                .ok_or(Error::MissingArg("reddit client is required".to_string()))?,
            extractor: self
                .extractor
                .ok_or(Error::MissingArg("extractor is required".to_string()))?,
            embedder: self
                .embedder
                .ok_or(Error::MissingArg("embedder is required".to_string()))?,
            store: self
                .store
                .ok_or(Error::MissingArg("similarity store is required".to_string()))?,
            report: self
                .report
                .ok_or(Error::MissingArg("report generator is required".to_string()))?,
            progress: self
                .progress
                .unwrap_or_else(|| Arc::new(clients::progress::LogProgress)),
            projects_path: self.projects_path.unwrap_or_else(|| PathBuf::from("projects")),
        })
    }
}

impl ResearchWorkflow {
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::new()
    }

    /// Runs the full pipeline for one project. Any collaborator failure
    /// aborts the run wrapped with the failing stage's name; the snapshot is
    /// written only after the terminal stage, so a failed run leaves nothing
    /// behind.
    pub async fn run_research(
        &self,
        handle: &RunHandle,
        project_id: &str,
        project_idea: &str,
        config: ResearchConfig,
    ) -> Result<RunOutcome> {
        tracing::info!(project_id, project_idea, "starting research");
        let mut state = ResearchState::new(project_id, project_idea, config);

        for stage in Stage::ALL {
            if handle.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.progress.on_progress(stage.name(), "starting");
            state = self.run_stage(stage, state).await.map_err(|cause| Error::Stage {
                stage: stage.name(),
                source: Box::new(cause),
            })?;
        }

        let snapshot_path = self.write_snapshot(&state)?;
        tracing::info!(path = %snapshot_path.display(), "research complete");

        let summary = RunSummary {
            keywords_found: state.keywords.len(),
            subreddits_found: state.subreddits.len(),
            posts_found: state.reddit_posts.len(),
            filtered_posts: state.filtered_posts.len(),
            comments_found: state.reddit_comments.len(),
            pain_points_identified: state.pain_points.len(),
        };

        Ok(RunOutcome {
            state,
            snapshot_path,
            summary,
        })
    }

    async fn run_stage(&self, stage: Stage, state: ResearchState) -> Result<ResearchState> {
        match stage {
            Stage::Keywords => self.generate_keywords(state).await,
            Stage::Subreddits => self.find_subreddits(state).await,
            Stage::SearchPosts => self.search_posts(state).await,
            Stage::FilterPosts => self.filter_posts(state).await,
            Stage::ExtractComments => self.extract_comments(state).await,
            Stage::AnalyzeContent => self.analyze_content(state).await,
            Stage::StoreVectors => self.store_vectors(state).await,
            Stage::SummarizePainPoints => self.summarize_pain_points(state).await,
            Stage::SolutionKeywords => self.solution_keywords(state).await,
            Stage::GenerateSolutions => self.generate_solutions(state).await,
            Stage::GenerateReport => self.generate_report(state).await,
        }
    }

    async fn generate_keywords(&self, mut state: ResearchState) -> Result<ResearchState> {
        let result: KeywordList = extract(
            self.extractor.as_ref(),
            KEYWORDS_PROMPT,
            &[("project_idea", state.project_idea.as_str())],
            SamplingParams::deliberate(512),
        )
        .await?;

        state.keywords = result.keywords;
        state.keywords.truncate(state.config.num_keywords);
        tracing::info!(keywords = ?state.keywords, "keywords selected");
        self.progress.on_progress(
            Stage::Keywords.name(),
            &format!("selected {} keywords", state.keywords.len()),
        );
        Ok(state)
    }

    async fn find_subreddits(&self, mut state: ResearchState) -> Result<ResearchState> {
        state.subreddits = self.discover_communities(Stage::Subreddits, &state.keywords).await?;
        tracing::info!(subreddits = ?state.subreddits, "communities discovered");
        Ok(state)
    }

    /// Top communities per keyword, unioned as a set across keywords.
    async fn discover_communities(&self, stage: Stage, keywords: &[String]) -> Result<Vec<String>> {
        let mut communities = HashSet::new();
        for keyword in keywords {
            self.progress
                .on_progress(stage.name(), &format!("searching communities for {keyword}"));
            let ranked = self.reddit.search_communities(keyword).await?;
            communities.extend(ranked.into_iter().take(COMMUNITIES_PER_KEYWORD));
        }
        Ok(communities.into_iter().collect())
    }

    async fn search_posts(&self, mut state: ResearchState) -> Result<ResearchState> {
        state.reddit_posts = self
            .search_keyword_posts(Stage::SearchPosts, &state.subreddits, &state.keywords, &state.config)
            .await?;
        tracing::info!(count = state.reddit_posts.len(), "unique posts found");
        self.progress.on_progress(
            Stage::SearchPosts.name(),
            &format!("found {} posts total", state.reddit_posts.len()),
        );
        Ok(state)
    }

    /// Three-pass search for every keyword across every community. Posts
    /// below the score or comment floors are discarded; the first occurrence
    /// of an id wins.
    async fn search_keyword_posts(
        &self,
        stage: Stage,
        communities: &[String],
        keywords: &[String],
        config: &ResearchConfig,
    ) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let mut seen = HashSet::new();

        for keyword in keywords {
            self.progress
                .on_progress(stage.name(), &format!("searching posts for {keyword}"));
            for community in communities {
                for (sort, window) in SEARCH_STRATEGIES {
                    let found = self
                        .reddit
                        .search_posts(community, keyword, sort, window, config.posts_per_subreddit)
                        .await?;
                    for post in found {
                        if post.score < config.min_post_score
                            || post.num_comments < config.min_comments
                        {
                            continue;
                        }
                        if seen.insert(post.id.clone()) {
                            posts.push(post);
                        }
                    }
                }
            }
        }

        Ok(posts)
    }

    async fn filter_posts(&self, mut state: ResearchState) -> Result<ResearchState> {
        let mut filtered = Vec::new();
        for post in &state.reddit_posts {
            let excerpt: String = post.content.chars().take(POST_EXCERPT_CHARS).collect();
            let verdict: PostScore = extract(
                self.extractor.as_ref(),
                FILTER_POST_PROMPT,
                &[
                    ("project_idea", state.project_idea.as_str()),
                    ("post_content", excerpt.as_str()),
                ],
                SamplingParams::standard(128),
            )
            .await?;

            if verdict.score >= RELEVANCE_THRESHOLD {
                filtered.push(post.clone());
            }
        }

        tracing::info!(kept = filtered.len(), of = state.reddit_posts.len(), "posts filtered");
        self.progress.on_progress(
            Stage::FilterPosts.name(),
            &format!("kept {} relevant posts", filtered.len()),
        );
        state.filtered_posts = filtered;
        Ok(state)
    }

    async fn extract_comments(&self, mut state: ResearchState) -> Result<ResearchState> {
        let mut comments = Vec::new();
        for post in &state.filtered_posts {
            self.progress.on_progress(
                Stage::ExtractComments.name(),
                &format!("fetching comments for {}", post.title),
            );
            let fetched = self
                .reddit
                .fetch_comments(&post.id, state.config.comments_per_post, state.config.min_comment_score)
                .await?;
            comments.extend(fetched);
        }

        tracing::info!(count = comments.len(), "comments extracted");
        state.reddit_comments = comments;
        Ok(state)
    }

    async fn analyze_content(&self, mut state: ResearchState) -> Result<ResearchState> {
        // Index once instead of rescanning the comment list for every post.
        let mut by_post: HashMap<&str, Vec<&Comment>> = HashMap::new();
        for comment in &state.reddit_comments {
            by_post.entry(comment.post_id.as_str()).or_default().push(comment);
        }

        let mut pain_points = Vec::new();
        for post in &state.filtered_posts {
            self.progress.on_progress(
                Stage::AnalyzeContent.name(),
                &format!("analyzing {}", post.title),
            );
            let comments_text: String = by_post
                .get(post.id.as_str())
                .map(|comments| {
                    comments
                        .iter()
                        .enumerate()
                        .map(|(i, c)| format!("Comment {}:\n{}\n", i + 1, c.content))
                        .collect()
                })
                .unwrap_or_default();

            let extracted: PainPointList = extract(
                self.extractor.as_ref(),
                PAIN_POINTS_PROMPT,
                &[
                    ("project_idea", state.project_idea.as_str()),
                    ("post_text", post.content.as_str()),
                    ("post_comments", comments_text.as_str()),
                ],
                SamplingParams::standard(8_000),
            )
            .await?;

            for text in extracted.pain_points {
                let categorized: PainPointCategory = extract(
                    self.extractor.as_ref(),
                    CATEGORIZE_PROMPT,
                    &[
                        ("project_idea", state.project_idea.as_str()),
                        ("pain_point", text.as_str()),
                    ],
                    SamplingParams::standard(128),
                )
                .await?;

                pain_points.push(PainPoint {
                    id: content_id(&text),
                    content: text,
                    category: categorized.category.as_str().to_string(),
                    sources_post: post.id.clone(),
                });
            }
        }

        tracing::info!(count = pain_points.len(), "pain points identified");
        state.pain_points = pain_points;
        Ok(state)
    }

    /// Embeds each pain point and stores it unless a near-duplicate is
    /// already persisted for this project. The check is sequential per
    /// point, against whatever is stored at that moment.
    async fn store_vectors(&self, state: ResearchState) -> Result<ResearchState> {
        for point in &state.pain_points {
            let vector = self.embedder.embed(&point.content).await?;
            let duplicate = self
                .store
                .nearest(&state.project_id, vector.clone(), DUPLICATE_THRESHOLD)
                .await?;

            match duplicate {
                Some(existing) => {
                    tracing::info!(
                        id = %point.id,
                        nearest = %existing.id,
                        score = existing.score,
                        "near-duplicate pain point skipped"
                    );
                }
                None => {
                    self.store.upsert(&state.project_id, point, vector).await?;
                    tracing::info!(id = %point.id, "pain point stored");
                }
            }
        }

        self.progress.on_progress(Stage::StoreVectors.name(), "embeddings stored");
        Ok(state)
    }

    async fn summarize_pain_points(&self, mut state: ResearchState) -> Result<ResearchState> {
        let stored = self.store.scan_all(&state.project_id).await?;
        let listing: String = stored
            .iter()
            .enumerate()
            .map(|(i, point)| format!("{}. {}\n", i + 1, point.content))
            .collect();

        let summary: PainPointSummary = extract(
            self.extractor.as_ref(),
            SUMMARIZE_PROMPT,
            &[
                ("project_idea", state.project_idea.as_str()),
                ("pain_points", listing.as_str()),
            ],
            SamplingParams::deliberate(16_000),
        )
        .await?;

        self.progress.on_progress(
            Stage::SummarizePainPoints.name(),
            &format!("grouped into {} themes", summary.themes.len()),
        );
        state.summarized_pain_points = Some(summary);
        Ok(state)
    }

    async fn solution_keywords(&self, mut state: ResearchState) -> Result<ResearchState> {
        let summary = state.summarized_pain_points.as_ref().ok_or(Error::MissingArg(
            "pain point summary must precede solution keywords".to_string(),
        ))?;
        let themes = format_themes(summary);

        let result: SolutionKeywordList = extract(
            self.extractor.as_ref(),
            SOLUTION_KEYWORDS_PROMPT,
            &[("pain_points", themes.as_str())],
            SamplingParams::deliberate(16_000),
        )
        .await?;

        state.solution_keywords = result.keywords;
        state.solution_keywords.truncate(state.config.num_keywords);
        tracing::info!(keywords = ?state.solution_keywords, "solution keywords selected");
        Ok(state)
    }

    async fn generate_solutions(&self, mut state: ResearchState) -> Result<ResearchState> {
        let summary = state.summarized_pain_points.clone().ok_or(Error::MissingArg(
            "pain point summary must precede solution generation".to_string(),
        ))?;
        let themes = format_themes(&summary);

        let communities = self
            .discover_communities(Stage::GenerateSolutions, &state.solution_keywords)
            .await?;
        tracing::info!(count = communities.len(), "solution communities discovered");

        state.solution_reddit_posts = self
            .search_keyword_posts(
                Stage::GenerateSolutions,
                &communities,
                &state.solution_keywords,
                &state.config,
            )
            .await?;

        let mut kept = Vec::new();
        let mut solutions = Vec::new();
        for (i, post) in state.solution_reddit_posts.iter().enumerate() {
            self.progress.on_progress(
                Stage::GenerateSolutions.name(),
                &format!("({}/{}) scoring {}", i + 1, state.solution_reddit_posts.len(), post.title),
            );
            let excerpt: String = post.content.chars().take(POST_EXCERPT_CHARS).collect();
            let verdict: SolutionPostScore = extract(
                self.extractor.as_ref(),
                FILTER_SOLUTION_PROMPT,
                &[
                    ("project_idea", state.project_idea.as_str()),
                    ("pain_points", themes.as_str()),
                    ("post_content", excerpt.as_str()),
                ],
                SamplingParams::standard(4_096),
            )
            .await?;

            if verdict.score >= RELEVANCE_THRESHOLD {
                kept.push(post.clone());
                solutions.push(verdict.solution);
            }
        }

        state.reddit_solutions = truncate_to_word_budget(&solutions, SOLUTION_WORD_BUDGET);
        state.solution_filtered_posts = kept;

        let mut llm_solutions = Vec::new();
        for theme in &summary.themes {
            let text = format!("Pain point: {}\nDescription: {}", theme.theme_name, theme.description);
            let narrative: SolutionNarrative = extract(
                self.extractor.as_ref(),
                THEME_SOLUTION_PROMPT,
                &[
                    ("project_idea", state.project_idea.as_str()),
                    ("pain_point", text.as_str()),
                ],
                SamplingParams::standard(2_048),
            )
            .await?;
            llm_solutions.push(narrative.solution);
        }
        state.llm_solutions = llm_solutions;

        let generated = numbered("Solution", &state.llm_solutions);
        let community_sourced = numbered("Solution", &state.reddit_solutions);
        let unified: SolutionSummary = extract(
            self.extractor.as_ref(),
            SUMMARIZE_SOLUTIONS_PROMPT,
            &[
                ("project_idea", state.project_idea.as_str()),
                ("pain_points", themes.as_str()),
                ("llm_solutions", generated.as_str()),
                ("reddit_solutions", community_sourced.as_str()),
            ],
            SamplingParams::deliberate(16_000),
        )
        .await?;

        state.summarized_llm_solutions = Some(unified);
        Ok(state)
    }

    async fn generate_report(&self, mut state: ResearchState) -> Result<ResearchState> {
        let visualizations = self.report.generate_visualizations().await?;
        let markdown = self.report.generate_markdown(&state).await?;
        let path = self.report.generate_pdf(&markdown, &visualizations).await?;

        self.progress
            .on_progress(Stage::GenerateReport.name(), &format!("report at {}", path.display()));
        state.report_path = path.display().to_string();
        Ok(state)
    }

    fn write_snapshot(&self, state: &ResearchState) -> Result<PathBuf> {
        let dir = self.projects_path.join(&state.project_id);
        std::fs::create_dir_all(&dir)?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("final_state_{stamp}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(state)?)?;
        Ok(path)
    }
}

fn format_themes(summary: &PainPointSummary) -> String {
    summary
        .themes
        .iter()
        .map(|theme| format!("{}: {}\n", theme.theme_name, theme.description))
        .collect()
}

fn numbered(label: &str, items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{} {}:\n{}\n", label, i + 1, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ResearchWorkflow, RunHandle, Stage};
    use crate::report::ReportGenerator;
    use crate::state::{ResearchConfig, ResearchState, content_id};
    use async_trait::async_trait;
    use clients::llm::{Embedder, Extractor, SamplingParams};
    use clients::progress::ProgressSink;
    use clients::reddit::{Comment, Post, RedditApi, Sort, TimeWindow};
    use clients::vectors::{Neighbor, PainPoint, SimilarityStore};
    use clients::{Error, Result};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    fn post(id: &str, score: i64, num_comments: i64) -> Post {
        Post {
            id: id.to_string(),
            title: format!("post {id}"),
            content: "our deploy pipeline takes forever".to_string(),
            subreddit: "devops".to_string(),
            score,
            num_comments,
            created_time: 1700000000.0,
            url: format!("https://example.com/{id}"),
            author: "alice".to_string(),
            flair: None,
        }
    }

    struct MockReddit;

    #[async_trait]
    impl RedditApi for MockReddit {
        async fn search_communities(&self, _keyword: &str) -> Result<Vec<String>> {
            Ok(vec!["devops".to_string()])
        }

        async fn search_posts(
            &self,
            _community: &str,
            _query: &str,
            _sort: Sort,
            _window: Option<TimeWindow>,
            _limit: u32,
        ) -> Result<Vec<Post>> {
            // Identical results per strategy, so dedup gets exercised.
            Ok(vec![post("p1", 5, 3), post("p2", 1, 2)])
        }

        async fn fetch_comments(
            &self,
            post_id: &str,
            _limit: u32,
            _min_score: i64,
        ) -> Result<Vec<Comment>> {
            Ok(vec![Comment {
                id: format!("c-{post_id}"),
                post_id: post_id.to_string(),
                content: "switching registries halved our build time".to_string(),
                score: 4,
                created_time: 1700000100.0,
                author: "bob".to_string(),
                parent_id: None,
                depth: 0,
                upvotes: 4,
                downvotes: 0,
            }])
        }
    }

    struct MockExtractor;

    #[async_trait]
    impl Extractor for MockExtractor {
        async fn complete(
            &self,
            _prompt: &str,
            schema: serde_json::Value,
            _sampling: SamplingParams,
        ) -> Result<String> {
            let shape = schema["title"].as_str().unwrap_or_default();
            let raw = match shape {
                "KeywordList" => r#"{"keywords": ["latency"]}"#,
                "PostScore" => r#"{"score": 9}"#,
                "PainPointList" => r#"{"pain_points": ["deploys are slow"]}"#,
                "PainPointCategory" => r#"{"category": "Performance & Speed"}"#,
                "PainPointSummary" => {
                    r#"{"themes": [{"theme_name": "Slow pipelines", "description": "deploys take too long"}], "insight": "speed dominates"}"#
                }
                "SolutionKeywordList" => r#"{"keywords": ["ci caching"]}"#,
                "SolutionPostScore" => r#"{"score": 8, "solution": "cache build layers"}"#,
                "SolutionNarrative" => r#"{"solution": "add incremental builds"}"#,
                "SolutionSummary" => {
                    r#"{"themes": [{"theme_name": "Slow pipelines", "solution": "cache and parallelize"}]}"#
                }
                other => panic!("unexpected extraction shape: {other}"),
            };
            Ok(raw.to_string())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl Extractor for FailingExtractor {
        async fn complete(
            &self,
            _prompt: &str,
            _schema: serde_json::Value,
            _sampling: SamplingParams,
        ) -> Result<String> {
            Err(Error::Upstream("model endpoint is down".to_string()))
        }
    }

    struct MockEmbedder;

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            // Identical text embeds identically; a final coordinate keeps
            // vectors for different texts from being parallel.
            let mut vector = vec![1.0, 0.5, 0.25];
            vector.push(text.len() as f32);
            Ok(vector)
        }
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[derive(Default)]
    struct MockStore {
        records: Mutex<Vec<(String, PainPoint, Vec<f32>)>>,
    }

    #[async_trait]
    impl SimilarityStore for MockStore {
        async fn upsert(&self, project_id: &str, point: &PainPoint, vector: Vec<f32>) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .push((project_id.to_string(), point.clone(), vector));
            Ok(())
        }

        async fn nearest(
            &self,
            project_id: &str,
            vector: Vec<f32>,
            threshold: f32,
        ) -> Result<Option<Neighbor>> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|(pid, _, _)| pid == project_id)
                .map(|(_, point, stored)| (point.id.clone(), cosine(&vector, stored)))
                .filter(|(_, score)| *score >= threshold)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, score)| Neighbor { id, score }))
        }

        async fn scan_all(&self, project_id: &str) -> Result<Vec<PainPoint>> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|(pid, _, _)| pid == project_id)
                .map(|(_, point, _)| point.clone())
                .collect())
        }

        async fn count(&self, project_id: &str) -> Result<u64> {
            let records = self.records.lock().unwrap();
            Ok(records.iter().filter(|(pid, _, _)| pid == project_id).count() as u64)
        }
    }

    struct MockReport;

    #[async_trait]
    impl ReportGenerator for MockReport {
        async fn generate_visualizations(&self) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }

        async fn generate_markdown(&self, state: &ResearchState) -> Result<String> {
            Ok(format!("# {}", state.project_idea))
        }

        async fn generate_pdf(&self, _markdown: &str, _viz: &[PathBuf]) -> Result<PathBuf> {
            Ok(PathBuf::from("report.md"))
        }
    }

    #[derive(Default)]
    struct CollectingProgress {
        stages: Mutex<Vec<String>>,
    }

    impl ProgressSink for CollectingProgress {
        fn on_progress(&self, stage: &str, _detail: &str) {
            self.stages.lock().unwrap().push(stage.to_string());
        }
    }

    fn scenario_config() -> ResearchConfig {
        ResearchConfig {
            num_keywords: 1,
            posts_per_subreddit: 2,
            min_post_score: 0,
            min_comments: 0,
            comments_per_post: 5,
            min_comment_score: 0,
        }
    }

    fn workflow(
        extractor: Arc<dyn Extractor + Send + Sync>,
        store: Arc<MockStore>,
        progress: Arc<CollectingProgress>,
        projects_path: &Path,
    ) -> ResearchWorkflow {
        ResearchWorkflow::builder()
            .reddit(Arc::new(MockReddit))
            .extractor(extractor)
            .embedder(Arc::new(MockEmbedder))
            .store(store)
            .report(Arc::new(MockReport))
            .progress(progress)
            .projects_path(projects_path.to_path_buf())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_run() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(MockStore::default());
        let progress = Arc::new(CollectingProgress::default());
        let workflow = workflow(Arc::new(MockExtractor), store.clone(), progress.clone(), dir.path());

        let handle = RunHandle::new();
        let outcome = workflow
            .run_research(&handle, "proj-1", "reduce deploy latency", scenario_config())
            .await?;

        let state = &outcome.state;
        assert_eq!(state.keywords, vec!["latency"]);
        assert_eq!(state.subreddits, vec!["devops"]);

        // Two distinct posts survive the three-strategy dedup.
        let mut ids: Vec<&str> = state.reddit_posts.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(state.filtered_posts.len(), 2);
        assert_eq!(state.reddit_comments.len(), 2);

        // One pain point per post, identical text, so one content id.
        assert_eq!(state.pain_points.len(), 2);
        assert_eq!(state.pain_points[0].id, content_id("deploys are slow"));
        assert_eq!(state.pain_points[0].id, state.pain_points[1].id);
        assert_eq!(state.pain_points[0].category, "Performance & Speed");

        // The second identical pain point is a near-duplicate and not stored.
        assert_eq!(store.records.lock().unwrap().len(), 1);

        let summary = state.summarized_pain_points.as_ref().unwrap();
        assert_eq!(summary.themes[0].theme_name, "Slow pipelines");
        assert_eq!(state.solution_keywords, vec!["ci caching"]);
        assert_eq!(state.solution_filtered_posts.len(), 2);
        assert_eq!(state.reddit_solutions, vec!["cache build layers"; 2]);
        assert_eq!(state.llm_solutions, vec!["add incremental builds"]);
        assert!(state.summarized_llm_solutions.is_some());
        assert_eq!(state.report_path, "report.md");

        assert!(outcome.snapshot_path.exists());
        assert_eq!(outcome.summary.posts_found, 2);
        assert_eq!(outcome.summary.comments_found, 2);
        assert_eq!(outcome.summary.pain_points_identified, 2);

        // Every stage reported progress at entry.
        let stages = progress.stages.lock().unwrap();
        for stage in Stage::ALL {
            assert!(stages.iter().any(|s| s == stage.name()), "missing {}", stage.name());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_posts_below_floors_are_dropped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(MockStore::default());
        let progress = Arc::new(CollectingProgress::default());
        let workflow = workflow(Arc::new(MockExtractor), store, progress, dir.path());

        let config = ResearchConfig {
            min_post_score: 3,
            ..scenario_config()
        };
        let handle = RunHandle::new();
        let outcome = workflow
            .run_research(&handle, "proj-2", "reduce deploy latency", config)
            .await?;

        // p2 scores 1, below the floor of 3.
        let ids: Vec<&str> = outcome.state.reddit_posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_run_aborts_before_next_stage() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::default());
        let progress = Arc::new(CollectingProgress::default());
        let workflow = workflow(Arc::new(MockExtractor), store, progress, dir.path());

        let handle = RunHandle::new();
        handle.cancel();

        let result = workflow
            .run_research(&handle, "proj-3", "reduce deploy latency", scenario_config())
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_stage_failure_aborts_run_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::default());
        let progress = Arc::new(CollectingProgress::default());
        let workflow = workflow(Arc::new(FailingExtractor), store, progress, dir.path());

        let handle = RunHandle::new();
        let result = workflow
            .run_research(&handle, "proj-4", "reduce deploy latency", scenario_config())
            .await;

        match result {
            Err(Error::Stage { stage, source }) => {
                assert_eq!(stage, "generate_keywords");
                assert!(matches!(*source, Error::Upstream(_)));
            }
            other => panic!("expected stage error, got {other:?}"),
        }

        // No partial snapshot is left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_solution_keywords_requires_summary() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::default());
        let progress = Arc::new(CollectingProgress::default());
        let workflow = workflow(Arc::new(MockExtractor), store, progress, dir.path());

        let state = ResearchState::new("proj-5", "reduce deploy latency", scenario_config());
        let result = workflow.solution_keywords(state).await;
        assert!(matches!(result, Err(Error::MissingArg(_))));
    }

    #[tokio::test]
    async fn test_same_content_two_projects_stored_twice() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(MockStore::default());
        let progress = Arc::new(CollectingProgress::default());
        let workflow = workflow(Arc::new(MockExtractor), store.clone(), progress, dir.path());

        let handle = RunHandle::new();
        workflow
            .run_research(&handle, "proj-a", "reduce deploy latency", scenario_config())
            .await?;
        workflow
            .run_research(&handle, "proj-b", "reduce deploy latency", scenario_config())
            .await?;

        // One record per project: the dedup scope is the project id.
        let records = store.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store_count(&records, "proj-a"), 1);
        assert_eq!(store_count(&records, "proj-b"), 1);
        Ok(())
    }

    fn store_count(records: &[(String, PainPoint, Vec<f32>)], project_id: &str) -> usize {
        records.iter().filter(|(pid, _, _)| pid == project_id).count()
    }

    #[tokio::test]
    async fn test_rerun_of_same_project_stores_nothing_new() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(MockStore::default());
        let progress = Arc::new(CollectingProgress::default());
        let workflow = workflow(Arc::new(MockExtractor), store.clone(), progress, dir.path());

        let handle = RunHandle::new();
        workflow
            .run_research(&handle, "proj-c", "reduce deploy latency", scenario_config())
            .await?;
        assert_eq!(store.records.lock().unwrap().len(), 1);

        workflow
            .run_research(&handle, "proj-c", "reduce deploy latency", scenario_config())
            .await?;
        assert_eq!(store.records.lock().unwrap().len(), 1);
        Ok(())
    }
}
