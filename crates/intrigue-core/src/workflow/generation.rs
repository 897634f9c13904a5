//! Text generation backend.
//!
//! `TextGenerator` is the seam the step executor talks to; the HTTP
//! implementation speaks either the Gemini `generateContent` API or an
//! OpenAI-compatible chat completions API, selected by adapter name.

use async_trait::async_trait;

use crate::config::TextGenConfig;

/// One prompt-in, text-out request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Ask the backend for a JSON-only response.
    pub json_mode: bool,
    /// Let the backend ground its answer with web search.
    pub web_search: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Text generation is not configured: {0}")]
    MissingConfig(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Unknown adapter type: '{0}'")]
    UnknownAdapter(String),
}

impl GenerationError {
    /// 401/403 from the provider: credentials need fixing, retrying won't help.
    pub fn is_auth(&self) -> bool {
        matches!(self, GenerationError::Upstream { status: 401 | 403, .. })
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Calls a hosted text model over HTTP.
pub struct HttpTextGenerator {
    client: reqwest::Client,
    config: TextGenConfig,
}

impl HttpTextGenerator {
    pub fn new(config: TextGenConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300)) // 5 min timeout
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                GenerationError::MissingConfig(
                    "set TEXT_GEN_API_KEY (or GEMINI_API_KEY)".to_string(),
                )
            })
    }

    /// POST {base_url}/v1beta/models/{model}:generateContent
    async fn call_gemini(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            request.model
        );

        let mut body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": request.prompt } ] }
            ]
        });
        if request.json_mode {
            body["generationConfig"] = serde_json::json!({ "responseMimeType": "application/json" });
        }
        if request.web_search {
            body["tools"] = serde_json::json!([ { "google_search": {} } ]);
        }

        tracing::info!(
            "[TextGen] Calling Gemini: model={} json={} search={}",
            request.model,
            request.json_mode,
            request.web_search
        );

        let json = self
            .send(self.client.post(&url).header("x-goog-api-key", api_key).json(&body))
            .await?;

        // Concatenate all text parts of the first candidate
        let text = json
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|cand| cand.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| GenerationError::InvalidResponse("no candidates in Gemini response".to_string()))?;

        Ok(text)
    }

    /// POST {base_url}/chat/completions
    async fn call_openai(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [ { "role": "user", "content": request.prompt } ]
        });
        if request.json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        if request.web_search {
            tracing::debug!("[TextGen] web search is not supported by the openai adapter; ignoring");
        }

        tracing::info!(
            "[TextGen] Calling OpenAI-compatible API: {} (model: {})",
            url,
            request.model
        );

        let json = self
            .send(
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", api_key))
                    .json(&body),
            )
            .await?;

        json.get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| GenerationError::InvalidResponse("no choices in completion response".to_string()))
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<serde_json::Value, GenerationError> {
        let response = builder
            .header("content-type", "application/json")
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| GenerationError::Http(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: response_text,
            });
        }

        serde_json::from_str(&response_text)
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response JSON: {}", e)))
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self.config.adapter.as_str() {
            "gemini" | "google" => self.call_gemini(request).await,
            "openai" | "openai-compatible" => self.call_openai(request).await,
            other => Err(GenerationError::UnknownAdapter(other.to_string())),
        }
    }
}
