use super::*;
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use std::time::Instant;

/// OpenAI chat completions in JSON mode
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
        Self { client, model }
    }

    fn build_request(
        &self,
        request: &GenerateRequest,
        model: &str,
    ) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.as_str())
                    .build()?
                    .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.as_str())
                .build()?
                .into(),
        );

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject);
        if let Some(max_tokens) = request.max_tokens {
            builder.max_tokens(max_tokens);
        }
        builder.build()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let start = Instant::now();
        let model = request
            .model_override
            .clone()
            .unwrap_or_else(|| self.model.clone());

        let chat_request = self
            .build_request(&request, &model)
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let response =
            tokio::time::timeout(request.timeout, self.client.chat().create(chat_request))
                .await
                .map_err(|_| LlmError::Timeout(request.timeout))?
                .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::ParseError("Empty completion".to_string()))?;

        Ok(GenerateResponse {
            text: text.trim().to_string(),
            metadata: ResponseMetadata {
                provider: self.name().to_string(),
                model,
                tokens_used: response.usage.map(|u| u.total_tokens),
                latency_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system: Option<&str>) -> GenerateRequest {
        GenerateRequest {
            system: system.map(str::to_string),
            prompt: "Name one landmark in Rome as {\"name\": ...}".to_string(),
            max_tokens: Some(100),
            timeout: Duration::from_secs(30),
            model_override: None,
        }
    }

    #[test]
    fn test_build_request_includes_system_prompt() {
        let provider = OpenAiProvider::new("sk-test".to_string(), "gpt-4o-mini".to_string());

        let with_system = provider
            .build_request(&request(Some("Reply with JSON.")), "gpt-4o-mini")
            .unwrap();
        assert_eq!(with_system.messages.len(), 2);
        assert_eq!(with_system.model, "gpt-4o-mini");

        let without = provider.build_request(&request(None), "gpt-4o").unwrap();
        assert_eq!(without.messages.len(), 1);
        assert_eq!(without.model, "gpt-4o");
    }

    #[tokio::test]
    #[ignore] // Only run with actual API key
    async fn test_openai_generate() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let provider = OpenAiProvider::new(api_key, "gpt-4o-mini".to_string());

        let response = provider
            .generate(request(Some("Reply with a JSON object.")))
            .await
            .unwrap();

        assert!(!response.text.is_empty());
        assert_eq!(response.metadata.provider, "openai");
        println!("Generated text: {}", response.text);
    }
}
