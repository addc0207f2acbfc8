//! HTTP request handlers

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::server::state::ServerState;
use crate::utils::version_info;

/// Endpoint directory returned by the index and error responses
pub const ENDPOINTS: [&str; 6] = [
    "GET /deploy-hook",
    "GET /deploy-hook/logs",
    "POST /deploy-hook",
    "GET /deploy",
    "GET /deploy/logs",
    "POST /deploy",
];

/// Index response: registered repositories plus the endpoint directory
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: String,
    pub repositories: BTreeMap<String, RepoInfo>,
    pub endpoints: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct RepoInfo {
    pub path: String,
    pub branch: String,
}

/// Journal listing response
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub status: &'static str,
    pub logs: Vec<String>,
    #[serde(rename = "totalLines")]
    pub total_lines: usize,
}

/// Generic outcome response for trigger requests and errors
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_repos: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<&'static str>>,
}

impl StatusResponse {
    fn new(status: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            repo: None,
            branch: None,
            available_repos: None,
            endpoints: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new("success", message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", message)
    }

    pub fn ignored(message: impl Into<String>) -> Self {
        Self::new("ignored", message)
    }

    fn with_available_repos(mut self, repos: Vec<String>) -> Self {
        self.available_repos = Some(repos);
        self
    }

    fn with_endpoints(mut self) -> Self {
        self.endpoints = Some(ENDPOINTS.to_vec());
        self
    }
}

fn reply(status: StatusCode, body: StatusResponse) -> Response {
    (status, Json(body)).into_response()
}

/// Repository directory handler
pub async fn index_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    state
        .journal
        .record(&format!(
            "Listing {} registered repositories",
            state.repos.len()
        ))
        .await;

    let repositories = state
        .repos
        .iter()
        .map(|(key, config)| {
            (
                key.clone(),
                RepoInfo {
                    path: config.path.display().to_string(),
                    branch: config.branch.clone(),
                },
            )
        })
        .collect();

    Json(IndexResponse {
        status: "success",
        service: "hookd",
        version: version_info().version,
        repositories,
        endpoints: ENDPOINTS.to_vec(),
    })
}

/// Journal listing handler. A journal read failure yields an empty listing
/// with an error status rather than a 5xx.
pub async fn logs_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    match state.journal.read_all().await {
        Ok(logs) => {
            let total_lines = logs.len();
            // Journaled after the snapshot so the listing stays exact
            state
                .journal
                .record(&format!("Returning {} journal lines", total_lines))
                .await;
            Json(LogsResponse {
                status: "success",
                logs,
                total_lines,
            })
        }
        Err(e) => {
            debug!("journal read failed: {}", e);
            Json(LogsResponse {
                status: "error",
                logs: Vec::new(),
                total_lines: 0,
            })
        }
    }
}

/// CORS preflight handler
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

/// Deployment trigger handler: manual trigger (`repo` parameter) or GitHub
/// push webhook payload.
pub async fn trigger_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    // Body parse is tolerant: a missing or malformed JSON body downgrades the
    // request to query-parameter-only operation.
    let payload: Option<Value> = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                state
                    .journal
                    .record(&format!("Error parsing JSON body: {}", e))
                    .await;
                None
            }
        }
    };

    // Secret check gates everything else, whatever the payload shape.
    let supplied = request_field(&params, payload.as_ref(), "secret");
    if supplied.as_deref() != Some(state.secret.as_str()) {
        state
            .journal
            .record("Rejected trigger request with invalid deployment secret")
            .await;
        return reply(
            StatusCode::FORBIDDEN,
            StatusResponse::error("Invalid deployment secret"),
        );
    }

    if let Some(repo) = request_field(&params, payload.as_ref(), "repo") {
        manual_trigger(&state, &repo, &params, payload.as_ref()).await
    } else {
        webhook_trigger(&state, payload.as_ref()).await
    }
}

/// Manual trigger: `repo` names the configuration key directly. The branch is
/// informational only here; unlike the webhook path it never gates execution.
async fn manual_trigger(
    state: &ServerState,
    repo: &str,
    params: &HashMap<String, String>,
    payload: Option<&Value>,
) -> Response {
    let Some(config) = state.repos.get(repo) else {
        state
            .journal
            .record(&format!("No configuration found for repository: {}", repo))
            .await;
        return reply(
            StatusCode::NOT_FOUND,
            StatusResponse::error(format!("No configuration found for repository: {}", repo))
                .with_available_repos(state.repo_keys()),
        );
    };

    let branch = request_field(params, payload, "branch")
        .or_else(|| request_field(params, payload, "ref"))
        .unwrap_or_else(|| config.branch.clone());

    state
        .journal
        .record(&format!("Manual deployment trigger for {} (branch {})", repo, branch))
        .await;

    let result = state.deployer.deploy(repo, config).await;
    let (status, mut response) = if result.success {
        (StatusCode::OK, StatusResponse::success(result.message))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, StatusResponse::error(result.message))
    };
    response.repo = Some(repo.to_string());
    response.branch = Some(branch);
    reply(status, response)
}

/// Webhook trigger: GitHub push-event shape `{repository: {name}, ref}`.
/// Deploys only when the pushed ref matches the configured branch.
async fn webhook_trigger(state: &ServerState, payload: Option<&Value>) -> Response {
    let repo_name = payload
        .and_then(|p| p.pointer("/repository/name"))
        .and_then(Value::as_str);

    let Some(repo_name) = repo_name else {
        state.journal.record("No repository name found in payload").await;
        return reply(
            StatusCode::BAD_REQUEST,
            StatusResponse::error("No repository name found")
                .with_available_repos(state.repo_keys()),
        );
    };

    let Some(config) = state.repos.get(repo_name) else {
        state
            .journal
            .record(&format!("No configuration found for repository: {}", repo_name))
            .await;
        return reply(
            StatusCode::NOT_FOUND,
            StatusResponse::error(format!(
                "No configuration found for repository: {}",
                repo_name
            ))
            .with_available_repos(state.repo_keys()),
        );
    };

    let push_ref = payload
        .and_then(|p| p.get("ref"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let expected = format!("refs/heads/{}", config.branch);

    // A push to any other branch is a normal occurrence, not an error.
    if push_ref != expected {
        state
            .journal
            .record(&format!(
                "Push to {}, expected {}. Skipping deployment.",
                push_ref, expected
            ))
            .await;
        return reply(
            StatusCode::OK,
            StatusResponse::ignored(format!(
                "Push to {}, expected {} branch",
                push_ref, config.branch
            )),
        );
    }

    state
        .journal
        .record(&format!(
            "Received webhook for {} on branch {}",
            repo_name, config.branch
        ))
        .await;

    let result = state.deployer.deploy(repo_name, config).await;
    if result.success {
        reply(StatusCode::OK, StatusResponse::success(result.message))
    } else {
        reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusResponse::error(result.message),
        )
    }
}

/// Fallback for unrouted requests: 200 for preflights, 404 with the endpoint
/// directory for unknown paths, 405 otherwise. Also attached per-route so an
/// unsupported method on a known path stays on this surface.
pub async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
) -> Response {
    match method {
        Method::OPTIONS => StatusCode::OK.into_response(),
        Method::GET | Method::POST => {
            state
                .journal
                .record(&format!("Unknown endpoint requested: {} {}", method, uri.path()))
                .await;
            reply(
                StatusCode::NOT_FOUND,
                StatusResponse::error(format!("Unknown endpoint: {}", uri.path()))
                    .with_endpoints(),
            )
        }
        _ => {
            state
                .journal
                .record(&format!("Rejected {} {}: method not allowed", method, uri.path()))
                .await;
            reply(
                StatusCode::METHOD_NOT_ALLOWED,
                StatusResponse::error("Method not allowed"),
            )
        }
    }
}

/// Resolve a request field from the query string first, then from a top-level
/// body field.
fn request_field(
    params: &HashMap<String, String>,
    payload: Option<&Value>,
    key: &str,
) -> Option<String> {
    if let Some(value) = params.get(key) {
        return Some(value.clone());
    }
    payload
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}
