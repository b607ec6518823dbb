use crate::{Error, Result};
use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;

mod openai;
pub use openai::{OpenAIEmbedder, OpenAIExtractor};

/// Decoding knobs forwarded with every completion request.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl SamplingParams {
    /// Preset for calls that benefit from longer deliberation.
    pub fn deliberate(max_tokens: u32) -> Self {
        Self {
            temperature: 0.6,
            top_p: 0.95,
            max_tokens,
        }
    }

    /// Preset for quick per-item calls.
    pub fn standard(max_tokens: u32) -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            max_tokens,
        }
    }
}

#[async_trait]
pub trait Extractor {
    /// Issues one completion constrained to `schema` and returns the raw
    /// model text. Parsing is the caller's concern, see [`extract`].
    async fn complete(
        &self,
        prompt: &str,
        schema: serde_json::Value,
        sampling: SamplingParams,
    ) -> Result<String>;
}

#[async_trait]
pub trait Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Renders `template` with `vars`, issues one schema-constrained completion,
/// and parses the result as `T`. The schema descriptor exists only here at
/// the collaborator boundary; call sites get a typed value or a
/// `SchemaViolation`, which is not retried.
pub async fn extract<T>(
    extractor: &(dyn Extractor + Send + Sync),
    template: &str,
    vars: &[(&str, &str)],
    sampling: SamplingParams,
) -> Result<T>
where
    T: JsonSchema + DeserializeOwned,
{
    let schema = serde_json::to_value(schema_for!(T).schema)?;
    let prompt = render(template, vars);
    let raw = extractor.complete(&prompt, schema, sampling).await?;
    serde_json::from_str(&raw).map_err(|err| Error::SchemaViolation(format!("{err}: {raw}")))
}

/// Substitutes `{name}` placeholders in a prompt template.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}
