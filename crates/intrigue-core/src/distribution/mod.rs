//! Distribution Poster - publishes queued X posts when their time comes.
//!
//! Failure policy per entry:
//! - rate limited: stop, leave this and later entries `scheduled`
//! - auth failure: mark this entry `failed`, stop
//! - anything else: mark this entry `failed`, continue

pub mod x_client;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::ServerError;
use crate::models::distribution::{Distribution, PlannedPost, XPostingScheduleEntry};
use crate::models::issue::Issue;
use crate::store::{AuthorStore, DistributionStore, XPostStore};

pub use x_client::{PostError, PostedTweet, SocialPoster, XApiClient};

/// Spacing between planned posts that carry no explicit delay.
pub const DEFAULT_POST_SPACING_MINUTES: i64 = 30;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingSummary {
    pub success: bool,
    pub posted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_processed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// How the batch continues after one entry.
enum Flow {
    Continue,
    Stop,
}

pub struct DistributionPoster {
    x_posts: XPostStore,
    distributions: DistributionStore,
    authors: AuthorStore,
    poster: Arc<dyn SocialPoster>,
    author_agent_id: Option<String>,
}

impl DistributionPoster {
    pub fn new(
        x_posts: XPostStore,
        distributions: DistributionStore,
        authors: AuthorStore,
        poster: Arc<dyn SocialPoster>,
        author_agent_id: Option<String>,
    ) -> Self {
        Self {
            x_posts,
            distributions,
            authors,
            poster,
            author_agent_id,
        }
    }

    /// Post every entry due at `now`, oldest first.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<PostingSummary, ServerError> {
        let due = self.x_posts.list_due(now).await?;
        if due.is_empty() {
            tracing::debug!("[XPoster] Nothing due");
            return Ok(PostingSummary { success: true, ..Default::default() });
        }

        let author = self.authors.resolve_poster(self.author_agent_id.as_deref()).await?;
        let Some(credentials) = author.as_ref().and_then(|a| a.x_credentials()) else {
            tracing::warn!("[XPoster] No author with X credentials; skipping {} due post(s)", due.len());
            return Ok(PostingSummary {
                success: true,
                skipped: due.len(),
                errors: vec!["No author agent with X credentials configured".to_string()],
                ..Default::default()
            });
        };

        tracing::info!("[XPoster] {} post(s) due, posting as @{}", due.len(), credentials.username);

        let mut summary = PostingSummary { success: true, ..Default::default() };
        let mut touched: BTreeSet<String> = BTreeSet::new();

        for entry in &due {
            let flow = match self.poster.post(&credentials, &entry.post_text).await {
                Ok(posted) => {
                    self.x_posts.mark_posted(&entry.id, &posted.url, Utc::now()).await?;
                    tracing::info!("[XPoster] Posted entry {}: {}", entry.id, posted.url);
                    summary.posted += 1;
                    summary.total_processed += 1;
                    Flow::Continue
                }
                Err(PostError::RateLimited(msg)) => {
                    tracing::warn!("[XPoster] Rate limited at entry {}; stopping batch", entry.id);
                    summary.errors.push(format!("Rate limited: {}", msg));
                    Flow::Stop
                }
                Err(e @ PostError::Auth { .. }) => {
                    let message = format!("Authentication failed, check X credentials: {}", e);
                    self.x_posts.mark_failed(&entry.id, &message).await?;
                    tracing::error!("[XPoster] {}; stopping batch", message);
                    summary.errors.push(message);
                    summary.failed += 1;
                    summary.total_processed += 1;
                    Flow::Stop
                }
                Err(e) => {
                    let message = e.to_string();
                    self.x_posts.mark_failed(&entry.id, &message).await?;
                    tracing::warn!("[XPoster] Entry {} failed: {}", entry.id, message);
                    summary.errors.push(format!("Entry {}: {}", entry.id, message));
                    summary.failed += 1;
                    summary.total_processed += 1;
                    Flow::Continue
                }
            };
            touched.insert(entry.distribution_id.clone());
            if let Flow::Stop = flow {
                break;
            }
        }

        for distribution_id in &touched {
            self.distributions.refresh_status(distribution_id).await?;
        }

        tracing::info!(
            "[XPoster] Done: posted={} failed={} remaining={}",
            summary.posted,
            summary.failed,
            due.len() - summary.total_processed
        );
        Ok(summary)
    }
}

/// Queue planned posts for an issue as one X distribution. Posts with empty
/// text or a story index outside the issue are dropped. Returns `None` when
/// nothing was left to schedule.
pub async fn schedule_posts(
    distributions: &DistributionStore,
    x_posts: &XPostStore,
    issue: &Issue,
    posts: &[PlannedPost],
    now: DateTime<Utc>,
) -> Result<Option<(Distribution, Vec<XPostingScheduleEntry>)>, ServerError> {
    let valid: Vec<&PlannedPost> = posts
        .iter()
        .filter(|p| {
            let in_range = p.story_index >= 0 && (p.story_index as usize) < issue.stories.len().max(1);
            if p.text.trim().is_empty() {
                tracing::warn!("[XPoster] Dropping planned post with empty text");
                false
            } else if !in_range {
                tracing::warn!("[XPoster] Dropping planned post for unknown story {}", p.story_index);
                false
            } else {
                true
            }
        })
        .collect();

    if valid.is_empty() {
        return Ok(None);
    }

    let distribution = distributions.create(&issue.id, "x").await?;
    let mut entries = Vec::with_capacity(valid.len());
    for (i, post) in valid.into_iter().enumerate() {
        let delay = post
            .delay_minutes
            .filter(|d| *d >= 0)
            .unwrap_or(DEFAULT_POST_SPACING_MINUTES * (i as i64 + 1));
        let entry = XPostingScheduleEntry::new(
            distribution.id.clone(),
            issue.id.clone(),
            post.story_index,
            &post.text,
            now + Duration::minutes(delay),
        );
        x_posts.insert(&entry).await?;
        entries.push(entry);
    }

    tracing::info!(
        "[XPoster] Scheduled {} post(s) for issue #{}",
        entries.len(),
        issue.issue_number
    );
    Ok(Some((distribution, entries)))
}
