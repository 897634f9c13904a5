//! Distribution poster: batch stop/continue policy and status bookkeeping.

mod common;

use chrono::{Duration, Utc};

use common::{test_state, tweet, FakeImages, ScriptedPoster, ScriptedText};
use intrigue_core::distribution::PostError;
use intrigue_core::models::author::CreateAuthorInput;
use intrigue_core::models::distribution::{DistributionStatus, XPostStatus, XPostingScheduleEntry};
use intrigue_core::models::issue::IssueDraft;
use intrigue_core::AppState;

async fn seed_author(state: &AppState) {
    state
        .author_store
        .upsert(CreateAuthorInput {
            id: Some("desk".into()),
            name: "Intrigue Desk".into(),
            x_username: Some("btcintrigue".into()),
            x_api_key: Some("ck".into()),
            x_api_secret: Some("cs".into()),
            x_access_token: Some("at".into()),
            x_access_secret: Some("as".into()),
            is_active: true,
        })
        .await
        .unwrap();
}

/// Three due entries, one minute apart, oldest first. Returns (distribution id, entry ids).
async fn seed_batch(state: &AppState) -> (String, Vec<String>) {
    let issue = IssueDraft::default().into_issue(Utc::now());
    state.issue_store.save(&issue).await.unwrap();
    let distribution = state.distribution_store.create(&issue.id, "x").await.unwrap();

    let base = Utc::now() - Duration::minutes(10);
    let mut ids = Vec::new();
    for i in 0..3 {
        let entry = XPostingScheduleEntry::new(
            distribution.id.clone(),
            issue.id.clone(),
            0,
            &format!("post {}", i + 1),
            base + Duration::minutes(i),
        );
        state.x_post_store.insert(&entry).await.unwrap();
        ids.push(entry.id);
    }
    (distribution.id, ids)
}

async fn statuses(state: &AppState, ids: &[String]) -> Vec<XPostStatus> {
    let mut out = Vec::new();
    for id in ids {
        out.push(state.x_post_store.get(id).await.unwrap().unwrap().status);
    }
    out
}

fn state_with(poster: std::sync::Arc<ScriptedPoster>) -> AppState {
    test_state(ScriptedText::ok(&[]), FakeImages::new(None), poster)
}

#[tokio::test]
async fn rate_limit_stops_the_batch_and_keeps_entries_scheduled() {
    let poster = ScriptedPoster::new(vec![tweet("1"), Err(PostError::RateLimited("slow down".into()))]);
    let state = state_with(poster.clone());
    seed_author(&state).await;
    let (distribution_id, ids) = seed_batch(&state).await;

    let summary = state.poster.run(Utc::now()).await.unwrap();

    assert_eq!((summary.posted, summary.failed, summary.skipped), (1, 0, 0));
    assert_eq!(
        statuses(&state, &ids).await,
        vec![XPostStatus::Posted, XPostStatus::Scheduled, XPostStatus::Scheduled]
    );
    assert_eq!(poster.posted_texts.lock().unwrap().len(), 2);

    let first = state.x_post_store.get(&ids[0]).await.unwrap().unwrap();
    assert_eq!(first.post_url.as_deref(), Some("https://x.com/btcintrigue/status/1"));
    assert!(first.posted_at.is_some());

    let distribution = &state.distribution_store.list_by_issue(&first.issue_id).await.unwrap()[0];
    assert_eq!(distribution.id, distribution_id);
    assert_eq!(distribution.status, DistributionStatus::Scheduled);
}

#[tokio::test]
async fn auth_failure_fails_the_entry_and_stops() {
    let poster = ScriptedPoster::new(vec![
        tweet("1"),
        Err(PostError::Auth { status: 401, message: "invalid token".into() }),
    ]);
    let state = state_with(poster.clone());
    seed_author(&state).await;
    let (_, ids) = seed_batch(&state).await;

    let summary = state.poster.run(Utc::now()).await.unwrap();

    assert_eq!((summary.posted, summary.failed), (1, 1));
    assert_eq!(
        statuses(&state, &ids).await,
        vec![XPostStatus::Posted, XPostStatus::Failed, XPostStatus::Scheduled]
    );
    let failed = state.x_post_store.get(&ids[1]).await.unwrap().unwrap();
    assert!(failed.error_message.unwrap().contains("Authentication failed"));
    assert_eq!(poster.posted_texts.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn other_errors_fail_one_entry_and_continue() {
    let poster = ScriptedPoster::new(vec![
        tweet("1"),
        Err(PostError::Other("duplicate content".into())),
        tweet("3"),
    ]);
    let state = state_with(poster);
    seed_author(&state).await;
    let (_, ids) = seed_batch(&state).await;

    let summary = state.poster.run(Utc::now()).await.unwrap();

    assert_eq!((summary.posted, summary.failed, summary.total_processed), (2, 1, 3));
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(
        statuses(&state, &ids).await,
        vec![XPostStatus::Posted, XPostStatus::Failed, XPostStatus::Posted]
    );

    let entry = state.x_post_store.get(&ids[0]).await.unwrap().unwrap();
    let distribution = &state.distribution_store.list_by_issue(&entry.issue_id).await.unwrap()[0];
    assert_eq!(distribution.status, DistributionStatus::Failed);
}

#[tokio::test]
async fn missing_credentials_skip_everything() {
    let poster = ScriptedPoster::new(vec![]);
    let state = state_with(poster.clone());
    let (_, ids) = seed_batch(&state).await;

    let summary = state.poster.run(Utc::now()).await.unwrap();

    assert_eq!((summary.posted, summary.failed, summary.skipped), (0, 0, 3));
    assert!(poster.posted_texts.lock().unwrap().is_empty());
    assert!(statuses(&state, &ids).await.iter().all(|s| *s == XPostStatus::Scheduled));
}

#[tokio::test]
async fn future_entries_are_left_alone() {
    let poster = ScriptedPoster::new(vec![]);
    let state = state_with(poster.clone());
    seed_author(&state).await;
    let (_, ids) = seed_batch(&state).await;

    // Before any entry is due.
    let summary = state.poster.run(Utc::now() - Duration::hours(1)).await.unwrap();

    assert!(summary.success);
    assert_eq!(summary.total_processed, 0);
    assert!(statuses(&state, &ids).await.iter().all(|s| *s == XPostStatus::Scheduled));
}

#[tokio::test]
async fn all_posted_completes_the_distribution() {
    let state = state_with(ScriptedPoster::new(vec![]));
    seed_author(&state).await;
    let (_, ids) = seed_batch(&state).await;

    let summary = state.poster.run(Utc::now()).await.unwrap();
    assert_eq!(summary.posted, 3);

    let entry = state.x_post_store.get(&ids[2]).await.unwrap().unwrap();
    let distribution = &state.distribution_store.list_by_issue(&entry.issue_id).await.unwrap()[0];
    assert_eq!(distribution.status, DistributionStatus::Completed);
}
