//! Router harness with in-process stand-ins for the external services.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use intrigue_core::config::AppConfig;
use intrigue_core::distribution::{PostError, PostedTweet, SocialPoster};
use intrigue_core::models::author::XCredentials;
use intrigue_core::workflow::{GenerationError, GenerationRequest, ImageError, ImageGenerator, TextGenerator};
use intrigue_core::{AppState, AppStateInner, Database};

pub struct NoText;

#[async_trait]
impl TextGenerator for NoText {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::MissingConfig("text generation disabled in tests".into()))
    }
}

/// Answers every prompt with the same scripted outcome.
pub enum ImageOutcome {
    Url(&'static str),
    Fail(&'static str),
    Timeout,
    Unconfigured,
}

pub struct FixedImages {
    outcome: ImageOutcome,
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageGenerator for FixedImages {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.outcome {
            ImageOutcome::Url(url) => Ok(url.to_string()),
            ImageOutcome::Fail(reason) => Err(ImageError::Generation(reason.to_string())),
            ImageOutcome::Timeout => Err(ImageError::Timeout { attempts: 3 }),
            ImageOutcome::Unconfigured => Err(ImageError::MissingConfig("IMAGE_GEN_API_KEY is not set".into())),
        }
    }
}

pub struct AlwaysPosts;

#[async_trait]
impl SocialPoster for AlwaysPosts {
    async fn post(&self, credentials: &XCredentials, _text: &str) -> Result<PostedTweet, PostError> {
        Ok(PostedTweet {
            id: "42".into(),
            url: format!("https://x.com/{}/status/42", credentials.username),
        })
    }
}

pub struct Harness {
    pub state: AppState,
    pub images: Arc<FixedImages>,
}

impl Harness {
    pub fn new(config: AppConfig, outcome: ImageOutcome) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let images = Arc::new(FixedImages {
            outcome,
            prompts: Mutex::new(Vec::new()),
        });
        let state = Arc::new(AppStateInner::with_services(
            db,
            config,
            Arc::new(NoText),
            images.clone(),
            Arc::new(AlwaysPosts),
        ));
        Self { state, images }
    }

    pub fn router(&self) -> Router {
        intrigue_server::build_router(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_empty(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::post(uri).body(Body::empty()).unwrap()).await
    }
}
