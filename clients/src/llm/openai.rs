use crate::llm::{Embedder, Extractor, SamplingParams};
use crate::{Error, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
        CreateEmbeddingRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;

/// Structured-extraction client over an OpenAI-compatible endpoint. The
/// schema constraint is passed through as a JSON-schema response format.
pub struct OpenAIExtractor {
    model: String,
    client: Client<OpenAIConfig>,
}

impl OpenAIExtractor {
    pub fn new(model: String, endpoint: String) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            model,
            client: Client::with_config(OpenAIConfig::new().with_api_base(endpoint)),
        })
    }
}

#[async_trait]
impl Extractor for OpenAIExtractor {
    async fn complete(
        &self,
        prompt: &str,
        schema: serde_json::Value,
        sampling: SamplingParams,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                },
            )])
            .temperature(sampling.temperature)
            .top_p(sampling.top_p)
            .max_tokens(sampling.max_tokens)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "extraction".to_string(),
                    description: None,
                    schema: Some(schema),
                    strict: Some(true),
                },
            })
            .build()?;

        let res = self.client.chat().create(request).await?;

        if res.choices.is_empty() {
            return Err(Error::Upstream("completion has no choices".to_string()));
        }

        res.choices[0]
            .message
            .content
            .clone()
            .ok_or(Error::Upstream("completion content is empty".to_string()))
    }
}

/// Text embedder over an OpenAI-compatible embeddings endpoint.
pub struct OpenAIEmbedder {
    model: String,
    client: Client<OpenAIConfig>,
}

impl OpenAIEmbedder {
    pub fn new(model: String, endpoint: String) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            model,
            client: Client::with_config(OpenAIConfig::new().with_api_base(endpoint)),
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text.to_string())
            .build()?;

        let mut res = self.client.embeddings().create(request).await?;

        if res.data.is_empty() {
            return Err(Error::Upstream("embedding response is empty".to_string()));
        }

        Ok(res.data.remove(0).embedding)
    }
}
