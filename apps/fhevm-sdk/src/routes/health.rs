//! Liveness and build metadata, served by both binaries without auth.

use axum::Json;
use serde::Serialize;

const SERVICE: &str = "fhevm-sdk";

#[derive(Serialize)]
pub struct HealthResponse {
    success: bool,
    status: &'static str,
    service: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfoResponse {
    success: bool,
    service: &'static str,
    version: &'static str,
    git_sha: &'static str,
    build_time: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "ok",
        service: SERVICE,
    })
}

pub async fn build_info() -> Json<BuildInfoResponse> {
    Json(BuildInfoResponse {
        success: true,
        service: SERVICE,
        version: env!("CARGO_PKG_VERSION"),
        git_sha: env!("GIT_SHA"),
        build_time: env!("BUILD_TIME"),
    })
}
