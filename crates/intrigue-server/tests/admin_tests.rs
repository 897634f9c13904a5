//! Admin API: approval transitions, schedules and distributions.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::json;

use common::{Harness, ImageOutcome};
use intrigue_core::config::AppConfig;
use intrigue_core::models::issue::{Intro, IssueDraft, Story};

fn harness() -> Harness {
    Harness::new(AppConfig::default(), ImageOutcome::Url("unused"))
}

async fn seed_issue(h: &Harness) -> String {
    let draft = IssueDraft {
        issue_number: Some(7),
        intro: Intro {
            headline: "Good morning".into(),
            body: "Here is what moved.".into(),
        },
        stories: vec![Story {
            id: "s1".into(),
            category: "PRICE WATCH".into(),
            headline: "Bitcoin holds 60k".into(),
            paragraphs: vec!["p1".into()],
            image: None,
            highlight: None,
            take: None,
        }],
    };
    let issue = draft.into_issue(Utc::now());
    h.state.issue_store.save(&issue).await.unwrap();
    issue.id
}

#[tokio::test]
async fn approve_then_publish_over_http() {
    let h = harness();
    let id = seed_issue(&h).await;

    let (status, _) = h.post_empty(&format!("/api/issues/{}/publish", id)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = h.post_empty(&format!("/api/issues/{}/approve", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issue"]["approvalStatus"], "approved");
    assert_eq!(body["issue"]["approvedBy"], "admin");

    let (status, body) = h.post_empty(&format!("/api/issues/{}/publish", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issue"]["status"], "published");

    let (status, body) = h.get("/api/issues?published=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issues"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reject_needs_a_reason() {
    let h = harness();
    let id = seed_issue(&h).await;

    let (status, _) = h
        .post_json(&format!("/api/issues/{}/reject", id), json!({ "reason": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h
        .post_json(&format!("/api/issues/{}/reject", id), json!({ "reason": "Needs sources" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issue"]["approvalStatus"], "rejected");
    assert_eq!(body["issue"]["rejectionReason"], "Needs sources");

    let (_, body) = h.get("/api/issues?approvalStatus=pending_review").await;
    assert!(body["issues"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_issue_is_not_found() {
    let h = harness();
    assert_eq!(h.get("/api/issues/nope").await.0, StatusCode::NOT_FOUND);
    assert_eq!(h.post_empty("/api/issues/nope/approve").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn distributions_are_queued_and_removed_with_the_issue() {
    let h = harness();
    let id = seed_issue(&h).await;

    let (status, body) = h
        .post_json(
            &format!("/api/issues/{}/distributions", id),
            json!({ "posts": [{ "storyIndex": 0, "text": "Bitcoin holds 60k" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert_eq!(body["posts"][0]["status"], "scheduled");

    let (_, body) = h.get(&format!("/api/issues/{}/distributions", id)).await;
    assert_eq!(body["distributions"].as_array().unwrap().len(), 1);

    let request = Request::delete(format!("/api/issues/{}", id)).body(Body::empty()).unwrap();
    let (status, body) = h.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    assert_eq!(body["distributionsDeleted"], 1);
}

#[tokio::test]
async fn schedules_reject_bad_cron_and_list_upcoming_runs() {
    let h = harness();

    let (status, _) = h
        .post_json(
            "/api/schedules",
            json!({ "workflowId": "wf", "name": "bad", "cronExpression": "0 6 * *" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h
        .post_json(
            "/api/schedules",
            json!({ "workflowId": "wf", "name": "daily", "cronExpression": "0 6 * * *", "timezone": "America/New_York" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["schedule"]["id"].as_str().unwrap().to_string();

    let (status, body) = h.get(&format!("/api/schedules/{}?upcoming=3", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upcoming"].as_array().unwrap().len(), 3);

    let (status, body) = h.post_empty(&format!("/api/schedules/{}/run", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["execution"]["status"], "failed");

    let (_, body) = h.get(&format!("/api/schedules/{}/executions", id)).await;
    assert_eq!(body["executions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn author_secrets_never_leave_the_server() {
    let h = harness();
    let (status, body) = h
        .post_json(
            "/api/authors",
            json!({
                "id": "desk",
                "name": "Intrigue Desk",
                "xUsername": "btcintrigue",
                "xApiKey": "ck",
                "xApiSecret": "cs",
                "xAccessToken": "at",
                "xAccessSecret": "as"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author"]["hasCredentials"], true);
    assert!(body["author"].get("xApiSecret").is_none());
    assert!(body["author"].get("xAccessToken").is_none());
}
