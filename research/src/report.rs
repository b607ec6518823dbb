use crate::state::ResearchState;
use async_trait::async_trait;
use clients::Result;
use std::path::PathBuf;

/// Boundary to the export collaborator. The pipeline hands it the final
/// state and records whatever path it returns.
#[async_trait]
pub trait ReportGenerator {
    async fn generate_visualizations(&self) -> Result<Vec<PathBuf>>;

    async fn generate_markdown(&self, state: &ResearchState) -> Result<String>;

    async fn generate_pdf(&self, markdown: &str, visualizations: &[PathBuf]) -> Result<PathBuf>;
}

/// Markdown-only exporter: renders the findings to a file and returns its
/// path. Stands in for a full visualization + PDF pipeline.
pub struct MarkdownReport {
    output_dir: PathBuf,
}

impl MarkdownReport {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl ReportGenerator for MarkdownReport {
    async fn generate_visualizations(&self) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    async fn generate_markdown(&self, state: &ResearchState) -> Result<String> {
        let mut doc = format!("# Market research: {}\n\n", state.project_idea);

        if let Some(summary) = &state.summarized_pain_points {
            doc.push_str("## Pain points\n\n");
            for theme in &summary.themes {
                doc.push_str(&format!("### {}\n\n{}\n\n", theme.theme_name, theme.description));
            }
            doc.push_str(&format!("**Key insight:** {}\n\n", summary.insight));
        }

        if let Some(summary) = &state.summarized_llm_solutions {
            doc.push_str("## Proposed solutions\n\n");
            for theme in &summary.themes {
                doc.push_str(&format!("### {}\n\n{}\n\n", theme.theme_name, theme.solution));
            }
        }

        if !state.reddit_solutions.is_empty() {
            doc.push_str("## Community-sourced solutions\n\n");
            for solution in &state.reddit_solutions {
                doc.push_str(&format!("- {solution}\n"));
            }
            doc.push('\n');
        }

        Ok(doc)
    }

    async fn generate_pdf(&self, markdown: &str, _visualizations: &[PathBuf]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join("report.md");
        std::fs::write(&path, markdown)?;
        Ok(path)
    }
}
