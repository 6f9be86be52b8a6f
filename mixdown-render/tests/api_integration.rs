//! Integration tests for the Mixdown render service API
//!
//! Tests the complete API surface including:
//! - Health check
//! - Preview submission and validation
//! - Job polling, listing and deletion
//! - Artifact retrieval

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use mixdown_render::api::{create_router, AppState};
use mixdown_render::ledger::JobLedger;
use mixdown_render::orchestrator::RenderOrchestrator;
use mixdown_render::render::offline::OfflineRenderer;

/// Test helper to create a test server backed by the offline renderer
fn setup_test_server() -> (axum::Router, Arc<JobLedger>, TempDir) {
    let artifact_dir = tempfile::tempdir().expect("Failed to create artifact dir");

    let ledger = Arc::new(JobLedger::new(64));
    let renderer = Arc::new(OfflineRenderer::new(artifact_dir.path().to_path_buf()));
    let orchestrator = Arc::new(RenderOrchestrator::new(
        Arc::clone(&ledger),
        renderer,
        2,
        Duration::from_secs(10),
    ));

    let app_state = AppState {
        orchestrator,
        ledger: Arc::clone(&ledger),
        port: 5760,
    };

    (create_router(app_state), ledger, artifact_dir)
}

/// Helper function to make JSON HTTP requests to the test server
async fn make_request(
    app: &axum::Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let (status, _, bytes) = make_raw_request(app, method, path, body).await;
    let json_body = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };
    (status, json_body)
}

/// Helper returning status, headers and raw bytes (for artifact downloads)
async fn make_raw_request(
    app: &axum::Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(path);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let request = match body {
        Some(json_body) => request.body(Body::from(json_body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();

    (status, headers, bytes)
}

/// A valid one-track session with a single region ending at `end` seconds
fn session_json(end: f64) -> Value {
    json!({
        "id": "session-1",
        "tempo": 120.0,
        "tracks": [{
            "id": "track-1",
            "type": "audio",
            "instrument": "vocal",
            "regions": [{"source": "vox-take3.wav", "start": 0.0, "end": end}]
        }]
    })
}

/// Poll job status until it reaches a terminal state
async fn poll_until_terminal(app: &axum::Router, job_id: &str) -> Value {
    for _ in 0..200 {
        let (status, body) =
            make_request(app, "GET", &format!("/api/v1/jobs/{}", job_id), None).await;
        assert_eq!(status, StatusCode::OK);
        let job = body.expect("job body")["job"].clone();
        let job_status = job["status"].as_str().expect("status string").to_string();
        if job_status == "completed" || job_status == "failed" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal state", job_id);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _ledger, _dir) = setup_test_server();

    let (status, body) = make_request(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.expect("Expected response body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mixdown-render");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_submit_rejects_out_of_range_bpm() {
    let (app, ledger, _dir) = setup_test_server();

    let mut session = session_json(10.0);
    session["tempo"] = json!(500.0);
    let body = json!({"session": session, "renderQuality": "fast"});

    let (status, response) = make_request(&app, "POST", "/api/v1/preview", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let response = response.expect("error body");
    assert_eq!(response["success"], false);
    assert!(
        response["error"].as_str().unwrap().contains("BPM"),
        "error should name BPM: {}",
        response["error"]
    );
    assert!(ledger.is_empty().await, "rejected request must not create a job");
}

#[tokio::test]
async fn test_submit_rejects_malformed_body() {
    let (app, ledger, _dir) = setup_test_server();

    // tracks is not an array
    let body = json!({
        "session": {"id": "s-1", "tempo": 120.0, "tracks": "oops"},
        "renderQuality": "fast"
    });

    let (status, response) = make_request(&app, "POST", "/api/v1/preview", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let response = response.expect("error body");
    assert!(response["error"].as_str().unwrap().contains("malformed"));
    assert!(ledger.is_empty().await);
}

#[tokio::test]
async fn test_submit_rejects_missing_session() {
    let (app, _ledger, _dir) = setup_test_server();

    let (status, _) =
        make_request(&app, "POST", "/api/v1/preview", Some(json!({"renderQuality": "fast"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_and_poll_to_completion() {
    let (app, _ledger, _dir) = setup_test_server();

    let body = json!({"session": session_json(10.0), "renderQuality": "fast"});
    let (status, response) = make_request(&app, "POST", "/api/v1/preview", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    let response = response.expect("submit body");
    assert_eq!(response["success"], true);
    let job_id = response["jobId"].as_str().expect("jobId").to_string();
    // 10 seconds at fast quality (0.1x) with an empty queue
    let estimated = response["estimatedTime"].as_f64().expect("estimatedTime");
    assert!((estimated - 1.0).abs() < 1e-9, "estimate was {}", estimated);

    let job = poll_until_terminal(&app, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"], 100);
    assert_eq!(job["type"], "mix-preview");
    assert_eq!(job["result"]["duration"], 10.0);
    assert_eq!(job["result"]["format"], "wav");
    assert_eq!(job["metadata"]["sessionId"], "session-1");
    assert_eq!(job["metadata"]["trackCount"], 1);
}

#[tokio::test]
async fn test_unknown_job_returns_404() {
    let (app, _ledger, _dir) = setup_test_server();

    let (status, body) =
        make_request(&app, "GET", &format!("/api/v1/jobs/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.expect("error body")["success"], false);
}

#[tokio::test]
async fn test_list_jobs_newest_first() {
    let (app, _ledger, _dir) = setup_test_server();

    for _ in 0..2 {
        let body = json!({"session": session_json(1.0), "renderQuality": "fast"});
        let (status, _) = make_request(&app, "POST", "/api/v1/preview", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) =
        make_request(&app, "GET", "/api/v1/jobs?type=mix-preview", None).await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body.expect("list body")["jobs"].as_array().expect("jobs array").clone();
    assert_eq!(jobs.len(), 2);

    let first = jobs[0]["createdAt"].as_str().expect("createdAt");
    let second = jobs[1]["createdAt"].as_str().expect("createdAt");
    assert!(first >= second, "jobs must be listed newest-first");
}

#[tokio::test]
async fn test_delete_job_then_404() {
    let (app, _ledger, _dir) = setup_test_server();

    let body = json!({"session": session_json(1.0), "renderQuality": "fast"});
    let (_, response) = make_request(&app, "POST", "/api/v1/preview", Some(body)).await;
    let job_id = response.expect("submit body")["jobId"]
        .as_str()
        .expect("jobId")
        .to_string();

    let (status, body) =
        make_request(&app, "DELETE", &format!("/api/v1/jobs/{}", job_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.expect("delete body")["success"], true);

    let (status, _) =
        make_request(&app, "GET", &format!("/api/v1/jobs/{}", job_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deletion is idempotent at the ledger but the API reports 404
    let (status, _) =
        make_request(&app, "DELETE", &format!("/api/v1/jobs/{}", job_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_artifact_before_completion_is_400_with_progress() {
    let (app, ledger, _dir) = setup_test_server();

    // Register a job directly so it stays pending
    let job = ledger.create("mix-preview", json!({})).await;

    let (status, body) = make_request(
        &app,
        "GET",
        &format!("/api/v1/preview/{}/artifact", job.id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = body.expect("not-ready body");
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["progress"], 0);
}

#[tokio::test]
async fn test_artifact_download_after_completion() {
    let (app, _ledger, _dir) = setup_test_server();

    let body = json!({"session": session_json(2.0), "renderQuality": "fast"});
    let (_, response) = make_request(&app, "POST", "/api/v1/preview", Some(body)).await;
    let job_id = response.expect("submit body")["jobId"]
        .as_str()
        .expect("jobId")
        .to_string();
    poll_until_terminal(&app, &job_id).await;

    let (status, headers, bytes) = make_raw_request(
        &app,
        "GET",
        &format!("/api/v1/preview/{}/artifact", job_id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "audio/wav");
    let disposition = headers["content-disposition"].to_str().unwrap();
    assert!(disposition.contains(&format!("mix-preview-{}.wav", job_id)));
    assert!(bytes.len() > 44, "expected a non-empty WAV payload");
    assert_eq!(&bytes[0..4], b"RIFF");
}

#[tokio::test]
async fn test_artifact_with_external_url_returns_json() {
    let (app, ledger, _dir) = setup_test_server();

    let job = ledger.create("mix-preview", json!({})).await;
    ledger
        .complete(
            job.id,
            json!({
                "artifactUrl": "https://cdn.example/previews/p.wav",
                "duration": 8.0,
                "peakDb": -0.5,
                "format": "wav"
            }),
        )
        .await
        .expect("complete");

    let (status, body) = make_request(
        &app,
        "GET",
        &format!("/api/v1/preview/{}/artifact", job.id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = body.expect("url body");
    assert_eq!(body["success"], true);
    assert_eq!(body["url"], "https://cdn.example/previews/p.wav");
}

#[tokio::test]
async fn test_artifact_for_unknown_job_is_404() {
    let (app, _ledger, _dir) = setup_test_server();

    let (status, _) = make_request(
        &app,
        "GET",
        &format!("/api/v1/preview/{}/artifact", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
