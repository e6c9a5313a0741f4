//! Health check handlers

use std::path::Path;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub exports: CheckResult,
    pub uploads: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Plain-text banner at the root
pub async fn banner() -> &'static str {
    "Academic Incentive System API is running"
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: incentive_common::VERSION.to_string(),
    })
}

async fn check_dir(path: &Path) -> CheckResult {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => CheckResult {
            status: "up".to_string(),
            error: None,
        },
        Ok(_) => CheckResult {
            status: "down".to_string(),
            error: Some(format!("{} is not a directory", path.display())),
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            error: Some(e.to_string()),
        },
    }
}

/// Readiness probe - export and upload directories must be reachable
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let exports = check_dir(state.exports.export_dir()).await;
    let uploads = check_dir(&state.uploads.root).await;

    let all_healthy = exports.is_up() && uploads.is_up();

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks { exports, uploads },
    })
}
