//! Image generation backend and story illustration prompts.
//!
//! The backend is a submit-then-poll job API: a POST returns a polling URL,
//! which is read every `poll_interval` until the job is ready, fails, or the
//! attempt bound runs out.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ImageGenConfig;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image generation is not configured: {0}")]
    MissingConfig(String),

    #[error("Image generation failed: {0}")]
    Generation(String),

    #[error("Image generation timed out after {attempts} polling attempts")]
    Timeout { attempts: u32 },
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image and return its URL.
    async fn generate(&self, prompt: &str) -> Result<String, ImageError>;
}

/// Editorial category of a story, derived from its free-text tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCategory {
    Market,
    Global,
    Whale,
    Lesson,
    Spotlight,
}

impl ImageCategory {
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| tag.contains(n));
        if has(&["price", "market"]) {
            Self::Market
        } else if has(&["global", "world"]) {
            Self::Global
        } else if has(&["whale", "institution"]) {
            Self::Whale
        } else if has(&["lesson", "educat", "learn"]) {
            Self::Lesson
        } else {
            Self::Spotlight
        }
    }

    fn scene(&self) -> &'static str {
        match self {
            Self::Market => {
                "A dramatic editorial scene of market energy: a glowing bitcoin coin rising over an \
                 abstract city skyline at dawn, sense of momentum and motion"
            }
            Self::Global => {
                "A sweeping view of the globe at night with glowing network lines connecting \
                 continents, bitcoin-orange light pulses travelling between cities"
            }
            Self::Whale => {
                "A giant stylised whale gliding through deep ocean water beneath a fleet of small \
                 boats, conveying scale and quiet power"
            }
            Self::Lesson => {
                "A warm, inviting study desk with an open notebook, a lamp, and a softly glowing \
                 bitcoin coin, conveying curiosity and learning"
            }
            Self::Spotlight => {
                "A single subject lit by a theatrical spotlight on a dark stage, with a subtle \
                 bitcoin motif in the light"
            }
        }
    }
}

const STYLE_SUFFIX: &str = "Style: modern editorial illustration, deep navy background with \
     bitcoin-orange accents, clean composition, high detail. No text, no letters, no numbers, \
     no logos, no charts, no graphs.";

/// Deterministic illustration prompt for a story.
pub fn build_image_prompt(category: &str, headline: &str) -> String {
    let scene = ImageCategory::from_tag(category).scene();
    let headline = headline.trim();
    if headline.is_empty() {
        format!("{}. {}", scene, STYLE_SUFFIX)
    } else {
        format!("{}. Theme: \"{}\". {}", scene, headline, STYLE_SUFFIX)
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    id: Option<String>,
    polling_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    result: Option<PollResult>,
}

#[derive(Debug, Deserialize)]
struct PollResult {
    sample: Option<String>,
}

pub struct HttpImageGenerator {
    client: reqwest::Client,
    config: ImageGenConfig,
}

impl HttpImageGenerator {
    pub fn new(config: ImageGenConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    async fn submit(&self, api_key: &str, prompt: &str) -> Result<SubmitResponse, ImageError> {
        let url = format!(
            "{}/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let body = serde_json::json!({
            "prompt": prompt,
            "width": 1024,
            "height": 768,
            "output_format": "jpeg",
        });

        let response = self
            .client
            .post(&url)
            .header("x-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ImageError::Generation(format!("submit failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ImageError::Generation(format!("submit returned {}: {}", status, text)));
        }

        response
            .json::<SubmitResponse>()
            .await
            .map_err(|e| ImageError::Generation(format!("invalid submit response: {}", e)))
    }

    async fn poll(&self, api_key: &str, polling_url: &str) -> Result<String, ImageError> {
        let attempts = self.config.max_poll_attempts;
        for attempt in 1..=attempts {
            tokio::time::sleep(self.config.poll_interval).await;

            let response = self
                .client
                .get(polling_url)
                .header("x-key", api_key)
                .send()
                .await
                .map_err(|e| ImageError::Generation(format!("poll failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(ImageError::Generation(format!("poll returned {}: {}", status, text)));
            }

            let poll: PollResponse = response
                .json()
                .await
                .map_err(|e| ImageError::Generation(format!("invalid poll response: {}", e)))?;

            match poll.status.as_str() {
                "Ready" => {
                    return poll
                        .result
                        .and_then(|r| r.sample)
                        .ok_or_else(|| ImageError::Generation("ready without an image URL".to_string()));
                }
                "Error" | "Failed" | "Content Moderated" | "Request Moderated" => {
                    return Err(ImageError::Generation(format!("job ended with status '{}'", poll.status)));
                }
                other => {
                    tracing::debug!("[ImageGen] attempt {}/{}: status {}", attempt, attempts, other);
                }
            }
        }
        Err(ImageError::Timeout { attempts })
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ImageError::MissingConfig("set IMAGE_GEN_API_KEY".to_string()))?;

        let submitted = self.submit(api_key, prompt).await?;
        let polling_url = submitted
            .polling_url
            .ok_or_else(|| ImageError::Generation("no polling URL in submit response".to_string()))?;
        tracing::info!(
            "[ImageGen] Submitted job {}",
            submitted.id.as_deref().unwrap_or("<unknown>")
        );

        self.poll(api_key, &polling_url).await
    }
}
