//! HTTP surface tests

mod common;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use common::RecordingRunner;
use hookd::deploy::Deployer;
use hookd::journal::Journal;
use hookd::server::serve::router;
use hookd::server::state::ServerState;
use hookd::settings::RepoConfig;

const SECRET: &str = "s3cret";

struct Harness {
    app: Router,
    runner: Arc<RecordingRunner>,
    journal: Arc<Journal>,
    repo_dir: PathBuf,
    _dir: TempDir,
}

async fn harness(runner: RecordingRunner) -> Harness {
    let dir = tempdir().unwrap();
    let repo_dir = dir.path().join("backend");
    std::fs::create_dir(&repo_dir).unwrap();

    let journal = Arc::new(Journal::new(dir.path().join("deploy.log"), 100));
    journal.init().await.unwrap();

    let runner = Arc::new(runner);
    let deployer = Arc::new(Deployer::new(runner.clone(), journal.clone()));

    let mut repos = BTreeMap::new();
    repos.insert(
        "backend".to_string(),
        RepoConfig {
            path: repo_dir.clone(),
            branch: "main".to_string(),
            deploy_cmd: "echo ok".to_string(),
        },
    );

    let state = Arc::new(ServerState::new(
        repos,
        SECRET.to_string(),
        journal.clone(),
        deployer,
    ));

    Harness {
        app: router(state),
        runner,
        journal,
        repo_dir,
        _dir: dir,
    }
}

async fn body_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: Body) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(body).unwrap()
}

#[tokio::test]
async fn index_lists_registered_repositories() {
    let h = harness(RecordingRunner::new()).await;

    let response = h.app.oneshot(get("/deploy-hook")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["repositories"]["backend"]["branch"], "main");
    assert_eq!(
        json["repositories"]["backend"]["path"],
        h.repo_dir.display().to_string()
    );
    assert!(json["endpoints"].as_array().unwrap().len() >= 4);
}

#[tokio::test]
async fn logs_endpoint_returns_journal_lines_in_order() {
    let h = harness(RecordingRunner::new()).await;
    h.journal.record("alpha").await;
    h.journal.record("beta").await;

    let response = h.app.oneshot(get("/deploy/logs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["totalLines"], 2);
    let logs = json["logs"].as_array().unwrap();
    assert!(logs[0].as_str().unwrap().ends_with("alpha"));
    assert!(logs[1].as_str().unwrap().ends_with("beta"));
}

#[tokio::test]
async fn wrong_secret_is_rejected_before_any_deployment() {
    let h = harness(RecordingRunner::new()).await;

    let response = h
        .app
        .clone()
        .oneshot(post("/deploy-hook?repo=backend&secret=nope", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "error");

    // Webhook-shaped payloads are rejected just the same
    let payload = serde_json::json!({
        "repository": {"name": "backend"},
        "ref": "refs/heads/main",
    });
    let response = h
        .app
        .oneshot(post("/deploy-hook", Body::from(payload.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(h.runner.call_count(), 0);
}

#[tokio::test]
async fn manual_trigger_deploys_and_echoes_repo_and_branch() {
    let h = harness(RecordingRunner::new()).await;

    let response = h
        .app
        .oneshot(post(
            &format!("/deploy-hook?repo=backend&secret={}", SECRET),
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Deployment completed for backend");
    assert_eq!(json["repo"], "backend");
    assert_eq!(json["branch"], "main");

    assert_eq!(h.runner.call_count(), 1);
    let calls = h.runner.calls();
    assert_eq!(calls[0].0, "echo ok");
    assert_eq!(calls[0].1, h.repo_dir);
}

#[tokio::test]
async fn manual_trigger_branch_is_informational_only() {
    let h = harness(RecordingRunner::new()).await;

    // A branch mismatch never gates a manual trigger
    let response = h
        .app
        .oneshot(post(
            &format!("/deploy?repo=backend&branch=develop&secret={}", SECRET),
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["branch"], "develop");
    assert_eq!(h.runner.call_count(), 1);
}

#[tokio::test]
async fn manual_trigger_unknown_repo_is_404_with_directory() {
    let h = harness(RecordingRunner::new()).await;

    let response = h
        .app
        .oneshot(post(
            &format!("/deploy-hook?repo=ghost&secret={}", SECRET),
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("ghost"));
    assert_eq!(json["available_repos"], serde_json::json!(["backend"]));
    assert_eq!(h.runner.call_count(), 0);
}

#[tokio::test]
async fn manual_trigger_failure_maps_to_500() {
    let h = harness(RecordingRunner::failing()).await;

    let response = h
        .app
        .oneshot(post(
            &format!("/deploy-hook?repo=backend&secret={}", SECRET),
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "error");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Deployment failed for backend:"));
}

#[tokio::test]
async fn webhook_with_matching_ref_deploys() {
    let h = harness(RecordingRunner::new()).await;

    let payload = serde_json::json!({
        "repository": {"name": "backend"},
        "ref": "refs/heads/main",
        "secret": SECRET,
    });
    let response = h
        .app
        .oneshot(post("/deploy-hook", Body::from(payload.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Deployment completed for backend");
    assert_eq!(h.runner.call_count(), 1);
}

#[tokio::test]
async fn webhook_to_other_branch_is_ignored() {
    let h = harness(RecordingRunner::new()).await;

    let payload = serde_json::json!({
        "repository": {"name": "backend"},
        "ref": "refs/heads/develop",
    });
    let response = h
        .app
        .oneshot(post(
            &format!("/deploy-hook?secret={}", SECRET),
            Body::from(payload.to_string()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "ignored");
    assert_eq!(json["message"], "Push to refs/heads/develop, expected main branch");
    assert_eq!(h.runner.call_count(), 0);
}

#[tokio::test]
async fn webhook_without_repository_name_is_400() {
    let h = harness(RecordingRunner::new()).await;

    let payload = serde_json::json!({"ref": "refs/heads/main"});
    let response = h
        .app
        .oneshot(post(
            &format!("/deploy?secret={}", SECRET),
            Body::from(payload.to_string()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "No repository name found");
    assert_eq!(json["available_repos"], serde_json::json!(["backend"]));
}

#[tokio::test]
async fn malformed_json_body_falls_back_to_query_parameters() {
    let h = harness(RecordingRunner::new()).await;

    let response = h
        .app
        .oneshot(post(
            &format!("/deploy?repo=backend&secret={}", SECRET),
            Body::from("{not json"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "success");
    assert_eq!(h.runner.call_count(), 1);
}

#[tokio::test]
async fn options_preflight_returns_ok_everywhere() {
    let h = harness(RecordingRunner::new()).await;

    for uri in ["/deploy-hook", "/deploy/logs", "/anything/else"] {
        let request = Request::builder()
            .method("OPTIONS")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "OPTIONS {}", uri);
    }
}

#[tokio::test]
async fn post_to_a_logs_path_is_404_with_endpoint_directory() {
    let h = harness(RecordingRunner::new()).await;

    for uri in ["/deploy-hook/logs", "/deploy/logs"] {
        let response = h
            .app
            .clone()
            .oneshot(post(uri, Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "POST {}", uri);

        let json = body_json(response.into_body()).await;
        assert_eq!(json["status"], "error");
        assert!(json["endpoints"].as_array().unwrap().len() >= 4);
    }
}

#[tokio::test]
async fn handler_branches_record_journal_trace_lines() {
    let h = harness(RecordingRunner::new()).await;

    h.app.clone().oneshot(get("/deploy-hook")).await.unwrap();
    h.app.clone().oneshot(get("/nope")).await.unwrap();
    let request = Request::builder()
        .method("DELETE")
        .uri("/deploy")
        .body(Body::empty())
        .unwrap();
    h.app.clone().oneshot(request).await.unwrap();

    let lines = h.journal.read_all().await.unwrap();
    assert!(lines.iter().any(|l| l.contains("registered repositories")));
    assert!(lines.iter().any(|l| l.contains("Unknown endpoint requested: GET /nope")));
    assert!(lines.iter().any(|l| l.contains("Rejected DELETE /deploy")));
}

#[tokio::test]
async fn unknown_path_is_404_with_endpoint_directory() {
    let h = harness(RecordingRunner::new()).await;

    let response = h.app.oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "error");
    assert!(json["endpoints"].as_array().unwrap().len() >= 4);
}

#[tokio::test]
async fn unsupported_method_is_405() {
    let h = harness(RecordingRunner::new()).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/nowhere")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    // Known path, wrong method
    let request = Request::builder()
        .method("DELETE")
        .uri("/deploy")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
