//! In-process fakes for the external services.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use intrigue_core::config::AppConfig;
use intrigue_core::distribution::{PostError, PostedTweet, SocialPoster};
use intrigue_core::models::author::XCredentials;
use intrigue_core::workflow::{GenerationError, GenerationRequest, ImageError, ImageGenerator, TextGenerator};
use intrigue_core::{AppState, AppStateInner, Database};

/// Replies in order, one per call.
#[derive(Default)]
pub struct ScriptedText {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedText {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::InvalidResponse("no scripted reply left".into())))
    }
}

/// Fails for prompts mentioning `fail_marker`, otherwise returns a URL
/// derived from the call count.
pub struct FakeImages {
    fail_marker: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn new(fail_marker: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            fail_marker: fail_marker.map(String::from),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(prompt.to_string());
            calls.len()
        };
        match &self.fail_marker {
            Some(marker) if prompt.contains(marker.as_str()) => Err(ImageError::Generation("moderated".into())),
            _ => Ok(format!("https://img.example/{}.jpg", n)),
        }
    }
}

/// Posting outcomes in order; succeeds once the script runs out.
#[derive(Default)]
pub struct ScriptedPoster {
    outcomes: Mutex<VecDeque<Result<PostedTweet, PostError>>>,
    pub posted_texts: Mutex<Vec<String>>,
}

impl ScriptedPoster {
    pub fn new(outcomes: Vec<Result<PostedTweet, PostError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            posted_texts: Mutex::new(Vec::new()),
        })
    }
}

pub fn tweet(id: &str) -> Result<PostedTweet, PostError> {
    Ok(PostedTweet {
        id: id.to_string(),
        url: format!("https://x.com/btcintrigue/status/{}", id),
    })
}

#[async_trait]
impl SocialPoster for ScriptedPoster {
    async fn post(&self, _credentials: &XCredentials, text: &str) -> Result<PostedTweet, PostError> {
        let n = {
            let mut texts = self.posted_texts.lock().unwrap();
            texts.push(text.to_string());
            texts.len()
        };
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| tweet(&format!("auto-{}", n)))
    }
}

pub fn test_state(
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageGenerator>,
    poster: Arc<dyn SocialPoster>,
) -> AppState {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    Arc::new(AppStateInner::with_services(db, AppConfig::default(), text, images, poster))
}

pub fn issue_json(headlines: &[&str]) -> String {
    let stories: Vec<serde_json::Value> = headlines
        .iter()
        .map(|h| serde_json::json!({ "category": "PRICE WATCH", "headline": h, "paragraphs": ["p1", "p2"] }))
        .collect();
    serde_json::json!({
        "intro": { "headline": "Good morning", "body": "Here is what moved." },
        "stories": stories
    })
    .to_string()
}
