use super::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Ollama provider implementation
pub struct OllamaProvider {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the given base URL and model
    pub fn new(base_url: String, model: String) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        Ok(Self {
            base_url,
            model,
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Ask Ollama to constrain output to valid JSON
    format: &'static str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaProvider {
    fn generate_body(&self, request: &GenerateRequest) -> OllamaGenerateRequest {
        OllamaGenerateRequest {
            model: request
                .model_override
                .clone()
                .unwrap_or_else(|| self.model.clone()),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            format: "json",
            stream: false,
            options: request.max_tokens.map(|num_predict| OllamaOptions {
                num_predict: Some(num_predict),
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let start = Instant::now();
        let body = self.generate_body(&request);
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let response = tokio::time::timeout(
            request.timeout,
            self.client.post(&url).json(&body).send(),
        )
        .await
        .map_err(|_| LlmError::Timeout(request.timeout))?
        .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::ApiError(format!("Ollama returned {}", status)));
        }

        let reply: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        Ok(GenerateResponse {
            text: reply.response.trim().to_string(),
            metadata: ResponseMetadata {
                provider: self.name().to_string(),
                model: body.model,
                tokens_used: reply.eval_count,
                latency_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_body() {
        let provider =
            OllamaProvider::new("http://localhost:11434".to_string(), "llama3.2".to_string())
                .unwrap();
        let request = GenerateRequest {
            system: None,
            prompt: "Plan a walk".to_string(),
            max_tokens: Some(100),
            timeout: Duration::from_secs(5),
            model_override: Some("mistral".to_string()),
        };

        let json = serde_json::to_value(provider.generate_body(&request)).unwrap();
        assert_eq!(json["model"], "mistral");
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 100);
        assert!(json.get("system").is_none());
    }

    #[tokio::test]
    #[ignore] // Only run with Ollama running locally
    async fn test_ollama_generate() {
        let provider =
            OllamaProvider::new("http://localhost:11434".to_string(), "llama3.2".to_string())
                .unwrap();

        let request = GenerateRequest {
            system: Some("Reply with a JSON object.".to_string()),
            prompt: "Name one landmark in Paris as {\"name\": ...}".to_string(),
            max_tokens: Some(100),
            timeout: Duration::from_secs(30),
            model_override: None,
        };

        let response = provider.generate(request).await.unwrap();

        assert!(!response.text.is_empty());
        assert_eq!(response.metadata.provider, "ollama");
        println!("Generated text: {}", response.text);
    }
}
