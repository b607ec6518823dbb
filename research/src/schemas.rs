//! One result type per extraction call site. The derived JSON schema is what
//! constrains the model; parsing back into these types is what turns a
//! malformed completion into a `SchemaViolation` instead of bad data
//! flowing downstream.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeywordList {
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SolutionKeywordList {
    pub keywords: Vec<String>,
}

/// Relevance verdict for a single post, 1-10.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct PostScore {
    pub score: u32,
}

/// Relevance verdict plus the solution text extracted from a post.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SolutionPostScore {
    pub score: u32,
    pub solution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PainPointList {
    pub pain_points: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct PainPointCategory {
    pub category: Category,
}

/// Closed set of buckets a pain point can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    #[serde(rename = "User Experience & Interface")]
    UserExperience,
    #[serde(rename = "Performance & Speed")]
    Performance,
    #[serde(rename = "Cost & Pricing")]
    Cost,
    #[serde(rename = "Feature Gaps & Functionality")]
    FeatureGaps,
    #[serde(rename = "Integration & Compatibility")]
    Integration,
    #[serde(rename = "Learning Curve & Documentation")]
    LearningCurve,
    #[serde(rename = "Technical Reliability")]
    Reliability,
    #[serde(rename = "Data & Privacy Concerns")]
    DataPrivacy,
    #[serde(rename = "Customer Support & Community")]
    Support,
    #[serde(rename = "Scalability & Growth Limitations")]
    Scalability,
    #[serde(rename = "Workflow & Productivity")]
    Workflow,
    #[serde(rename = "Mobile & Cross-Platform Issues")]
    CrossPlatform,
    #[serde(rename = "Customization & Flexibility")]
    Customization,
    #[serde(rename = "Market & Competition")]
    Market,
    Other,
}

impl Category {
    pub const ALL: [Category; 15] = [
        Category::UserExperience,
        Category::Performance,
        Category::Cost,
        Category::FeatureGaps,
        Category::Integration,
        Category::LearningCurve,
        Category::Reliability,
        Category::DataPrivacy,
        Category::Support,
        Category::Scalability,
        Category::Workflow,
        Category::CrossPlatform,
        Category::Customization,
        Category::Market,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::UserExperience => "User Experience & Interface",
            Category::Performance => "Performance & Speed",
            Category::Cost => "Cost & Pricing",
            Category::FeatureGaps => "Feature Gaps & Functionality",
            Category::Integration => "Integration & Compatibility",
            Category::LearningCurve => "Learning Curve & Documentation",
            Category::Reliability => "Technical Reliability",
            Category::DataPrivacy => "Data & Privacy Concerns",
            Category::Support => "Customer Support & Community",
            Category::Scalability => "Scalability & Growth Limitations",
            Category::Workflow => "Workflow & Productivity",
            Category::CrossPlatform => "Mobile & Cross-Platform Issues",
            Category::Customization => "Customization & Flexibility",
            Category::Market => "Market & Competition",
            Category::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PainPointTheme {
    pub theme_name: String,
    pub description: String,
}

/// Theme-grouped pain point summary with the overall takeaway.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PainPointSummary {
    pub themes: Vec<PainPointTheme>,
    pub insight: String,
}

/// Speculative solution narrative generated for one theme.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SolutionNarrative {
    pub solution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThemeSolution {
    pub theme_name: String,
    pub solution: String,
}

/// Unified per-theme solution summary synthesized from community-sourced and
/// generated solutions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SolutionSummary {
    pub themes: Vec<ThemeSolution>,
}
