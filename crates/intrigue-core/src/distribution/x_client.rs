//! X (Twitter) posting client, OAuth 1.0a user context.

use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

use crate::models::author::XCredentials;

type HmacSha1 = Hmac<Sha1>;

/// A post that went out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedTweet {
    pub id: String,
    pub url: String,
}

/// Posting failures, split by how the batch should react to them.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    /// 429: stop the batch, leave entries scheduled for the next run.
    #[error("Rate limited by X API: {0}")]
    RateLimited(String),

    /// 401/403: credentials need fixing.
    #[error("X API authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait SocialPoster: Send + Sync {
    async fn post(&self, credentials: &XCredentials, text: &str) -> Result<PostedTweet, PostError>;
}

pub struct XApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl XApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SocialPoster for XApiClient {
    async fn post(&self, credentials: &XCredentials, text: &str) -> Result<PostedTweet, PostError> {
        let url = format!("{}/2/tweets", self.base_url.trim_end_matches('/'));
        let header = authorization_header("POST", &url, credentials, &nonce(), chrono::Utc::now().timestamp())
            .map_err(PostError::Other)?;

        let response = self
            .client
            .post(&url)
            .header("Authorization", header)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| PostError::Other(format!("X API request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match status {
            200..=299 => {}
            429 => return Err(PostError::RateLimited(body)),
            401 | 403 => return Err(PostError::Auth { status, message: body }),
            _ => return Err(PostError::Other(format!("X API returned {}: {}", status, body))),
        }

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| PostError::Other(format!("Invalid X API response: {}", e)))?;
        let id = json
            .pointer("/data/id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PostError::Other("X API response has no post id".to_string()))?;

        Ok(PostedTweet {
            id: id.to_string(),
            url: post_url(&credentials.username, id),
        })
    }
}

pub fn post_url(username: &str, id: &str) -> String {
    format!("https://x.com/{}/status/{}", username.trim_start_matches('@'), id)
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// `Authorization: OAuth ...` for a request whose body is JSON, so only the
/// oauth_* parameters are signed.
fn authorization_header(
    method: &str,
    url: &str,
    credentials: &XCredentials,
    nonce: &str,
    timestamp: i64,
) -> Result<String, String> {
    let mut params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), credentials.api_key.clone()),
        ("oauth_nonce".into(), nonce.to_string()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp.to_string()),
        ("oauth_token".into(), credentials.access_token.clone()),
        ("oauth_version".into(), "1.0".into()),
    ];
    let signature = sign(method, url, &params, &credentials.api_secret, &credentials.access_secret)?;
    params.push(("oauth_signature".into(), signature));
    params.sort();

    let fields = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {}", fields))
}

/// HMAC-SHA1 signature over the OAuth 1.0a signature base string.
fn sign(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, String> {
    let mut encoded: Vec<(String, String)> = params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!("{}&{}&{}", method.to_uppercase(), encode(url), encode(&param_string));
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| format!("Invalid signing key: {}", e))?;
    mac.update(base.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn signature_matches_published_reference() {
        let params = vec![
            p("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            p("include_entities", "true"),
            p("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            p("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            p("oauth_signature_method", "HMAC-SHA1"),
            p("oauth_timestamp", "1318622958"),
            p("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            p("oauth_version", "1.0"),
        ];
        let sig = sign(
            "post",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
        .unwrap();
        assert_eq!(sig, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn header_carries_all_oauth_fields() {
        let creds = XCredentials {
            username: "btcintrigue".into(),
            api_key: "ck".into(),
            api_secret: "cs".into(),
            access_token: "at".into(),
            access_secret: "as".into(),
        };
        let header = authorization_header("POST", "https://api.twitter.com/2/tweets", &creds, "abc", 1).unwrap();
        assert!(header.starts_with("OAuth "));
        for field in ["oauth_consumer_key=\"ck\"", "oauth_token=\"at\"", "oauth_signature=", "oauth_nonce=\"abc\""] {
            assert!(header.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn post_urls_point_at_x() {
        assert_eq!(post_url("@btcintrigue", "42"), "https://x.com/btcintrigue/status/42");
        assert_eq!(nonce().len(), 32);
    }
}
