mod ollama;
mod openai;

use async_trait::async_trait;
use std::time::Duration;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// Request to generate text
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Instructions sent ahead of the prompt
    pub system: Option<String>,
    /// The prompt text
    pub prompt: String,
    /// Maximum response length in tokens (provider-dependent)
    pub max_tokens: Option<u32>,
    /// Timeout for the request
    pub timeout: Duration,
    /// Optional model override (e.g., "gpt-4o" instead of configured model)
    pub model_override: Option<String>,
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// The generated text
    pub text: String,
    /// Provider-specific metadata (model used, tokens consumed, etc.)
    pub metadata: ResponseMetadata,
}

/// Metadata about the LLM response
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    /// Name of the provider (e.g., "openai", "ollama")
    pub provider: String,
    /// Model name used
    pub model: String,
    /// Tokens consumed (if available)
    pub tokens_used: Option<u32>,
    /// Latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers must implement
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse>;

    /// Get the name of this provider
    fn name(&self) -> &str;
}

/// Manager for multiple LLM providers
pub struct LlmManager {
    pub providers: Vec<Box<dyn LlmProvider>>,
    /// Timeout applied to generated requests
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl LlmManager {
    pub fn new(providers: Vec<Box<dyn LlmProvider>>) -> Self {
        Self {
            providers,
            timeout: Duration::from_secs(30),
            max_tokens: 2000,
        }
    }

    /// Request with this manager's timeout and token defaults
    pub fn request(&self, system: &str, prompt: String) -> GenerateRequest {
        GenerateRequest {
            system: Some(system.to_string()),
            prompt,
            max_tokens: Some(self.max_tokens),
            timeout: self.timeout,
            model_override: None,
        }
    }

    /// Try providers in order and return the first success.
    /// The last provider error is returned when all fail.
    pub async fn generate_first(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let mut last_error =
            LlmError::ConfigError("No LLM providers configured".to_string());

        for provider in &self.providers {
            match provider.generate(request.clone()).await {
                Ok(response) => {
                    tracing::info!(
                        "Generated {} chars with {}:{} in {} ms",
                        response.text.len(),
                        response.metadata.provider,
                        response.metadata.model,
                        response.metadata.latency_ms
                    );
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Generate from a specific provider with optional model override
    /// model_id format: "provider:model" (e.g., "openai:gpt-4o", "ollama:llama3.2")
    pub async fn generate_from_model(
        &self,
        model_id: &str,
        request: GenerateRequest,
    ) -> LlmResult<GenerateResponse> {
        let (provider_name, model_name) = model_id.split_once(':').ok_or_else(|| {
            LlmError::ConfigError("Invalid model ID format, expected 'provider:model'".to_string())
        })?;

        let provider = self
            .providers
            .iter()
            .find(|p| p.name() == provider_name)
            .ok_or_else(|| {
                LlmError::ConfigError(format!("Provider '{}' not configured", provider_name))
            })?;

        let request_with_override = GenerateRequest {
            model_override: Some(model_name.to_string()),
            ..request
        };

        provider.generate(request_with_override).await
    }
}

/// Configuration for LLM providers
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// OpenAI model to use
    pub openai_model: String,
    /// Ollama base URL
    pub ollama_base_url: Option<String>,
    /// Ollama model to use
    pub ollama_model: String,
    /// Default timeout for LLM requests
    pub default_timeout: Duration,
    /// Default max tokens for responses
    pub default_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            ollama_base_url: Some("http://localhost:11434".to_string()),
            ollama_model: "llama3.2".to_string(),
            default_timeout: Duration::from_secs(30),
            default_max_tokens: 2000,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl LlmConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        // Unset means local default, set-but-empty disables Ollama
        let ollama_base_url = match std::env::var("OLLAMA_BASE_URL") {
            Ok(url) => {
                let trimmed = url.trim();
                (!trimmed.is_empty()).then(|| trimmed.trim_end_matches('/').to_string())
            }
            Err(_) => defaults.ollama_base_url,
        };

        Self {
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            openai_model: non_empty_env("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            ollama_base_url,
            ollama_model: non_empty_env("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            default_timeout: std::env::var("LLM_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_timeout),
            default_max_tokens: std::env::var("LLM_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_max_tokens),
        }
    }

    /// Build an LlmManager with all configured providers
    pub fn build_manager(&self) -> LlmResult<LlmManager> {
        let mut providers: Vec<Box<dyn LlmProvider>> = Vec::new();

        // OpenAI first: when both are configured it is the primary
        if let Some(api_key) = &self.openai_api_key {
            providers.push(Box::new(OpenAiProvider::new(
                api_key.clone(),
                self.openai_model.clone(),
            )));
        }

        if let Some(base_url) = &self.ollama_base_url {
            providers.push(Box::new(OllamaProvider::new(
                base_url.clone(),
                self.ollama_model.clone(),
            )?));
        }

        if providers.is_empty() {
            return Err(LlmError::ConfigError(
                "No LLM providers configured. Set OPENAI_API_KEY or OLLAMA_BASE_URL".to_string(),
            ));
        }

        let mut manager = LlmManager::new(providers);
        manager.timeout = self.default_timeout;
        manager.max_tokens = self.default_max_tokens;
        Ok(manager)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.ollama_model, "llama3.2");
        assert_eq!(config.default_timeout, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("OPENAI_API_KEY", "  sk-test  ");
        std::env::set_var("OLLAMA_BASE_URL", "");
        std::env::set_var("LLM_TIMEOUT", "5");
        std::env::remove_var("OPENAI_MODEL");

        let config = LlmConfig::from_env();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert!(config.ollama_base_url.is_none());
        assert_eq!(config.default_timeout, Duration::from_secs(5));

        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("OLLAMA_BASE_URL");
        std::env::remove_var("LLM_TIMEOUT");
    }

    #[test]
    fn test_build_manager_requires_provider() {
        let config = LlmConfig {
            ollama_base_url: None,
            ..LlmConfig::default()
        };
        assert!(matches!(
            config.build_manager(),
            Err(LlmError::ConfigError(_))
        ));
    }

    #[test]
    fn test_build_manager_applies_defaults() {
        let config = LlmConfig {
            default_timeout: Duration::from_secs(7),
            default_max_tokens: 99,
            ..LlmConfig::default()
        };
        let manager = config.build_manager().unwrap();
        assert_eq!(manager.providers.len(), 1);
        assert_eq!(manager.providers[0].name(), "ollama");

        let request = manager.request("sys", "hello".to_string());
        assert_eq!(request.timeout, Duration::from_secs(7));
        assert_eq!(request.max_tokens, Some(99));
        assert_eq!(request.system.as_deref(), Some("sys"));
    }

    #[tokio::test]
    async fn test_generate_first_falls_back() {
        let manager = LlmManager::new(vec![
            Box::new(MockProvider::failing("broken")),
            Box::new(MockProvider::replying("hello")),
        ]);

        let response = manager
            .generate_first(manager.request("sys", "hi".to_string()))
            .await
            .unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(response.metadata.provider, "mock");
    }

    #[tokio::test]
    async fn test_generate_first_all_fail() {
        let manager = LlmManager::new(vec![Box::new(MockProvider::failing("broken"))]);
        let result = manager
            .generate_first(manager.request("sys", "hi".to_string()))
            .await;
        assert!(matches!(result, Err(LlmError::ApiError(_))));

        let empty = LlmManager::new(vec![]);
        assert!(matches!(
            empty.generate_first(empty.request("sys", "hi".to_string())).await,
            Err(LlmError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_from_model() {
        let manager = manager_replying("ok");

        let response = manager
            .generate_from_model("mock:tiny", manager.request("sys", "hi".to_string()))
            .await
            .unwrap();
        assert_eq!(response.metadata.model, "tiny");

        assert!(manager
            .generate_from_model("nope", manager.request("sys", "hi".to_string()))
            .await
            .is_err());
        assert!(manager
            .generate_from_model("openai:gpt-4o", manager.request("sys", "hi".to_string()))
            .await
            .is_err());
    }
}
