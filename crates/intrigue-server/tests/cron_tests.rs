//! Cron trigger endpoints: secret gate and summary bodies.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};

use common::{Harness, ImageOutcome};
use intrigue_core::config::AppConfig;

fn production() -> AppConfig {
    let mut config = AppConfig::default();
    config.cron.production = true;
    config.cron.secret = Some("s3cret".into());
    config
}

#[tokio::test]
async fn run_schedule_reports_an_empty_batch() {
    let h = Harness::new(AppConfig::default(), ImageOutcome::Url("unused"));

    let (status, body) = h.get("/api/cron/run-schedule").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["processed"], 0);
    assert_eq!(body["succeeded"], 0);
    assert_eq!(body["failed"], 0);
    assert!(body["timestamp"].is_string());
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn post_to_x_accepts_post_and_reports_nothing_due() {
    let h = Harness::new(AppConfig::default(), ImageOutcome::Url("unused"));

    let (status, body) = h.post_empty("/api/cron/post-to-x").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["posted"], 0);
    assert_eq!(body["skipped"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn production_requires_the_secret() {
    let h = Harness::new(production(), ImageOutcome::Url("unused"));

    let (status, body) = h.get("/api/cron/run-schedule").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = Request::get("/api/cron/post-to-x")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    assert_eq!(h.send(request).await.0, StatusCode::UNAUTHORIZED);

    let request = Request::post("/api/cron/run-schedule")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = h.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 0);
}

#[tokio::test]
async fn health_check_answers() {
    let h = Harness::new(AppConfig::default(), ImageOutcome::Url("unused"));
    let (status, body) = h.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["server"], "intrigue-server");
}
