//! HTTP test utilities for the API service and development gateway.
//!
//! Routers mirror the production setup while allowing configurable auth,
//! upstream URLs and key material.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

use fhevm_sdk::{
    app::{build_api_router, build_gateway_router},
    crypto::KeyStore,
    settings::Settings,
    storage::Storage,
    FhevmClient,
};

/// Port 9 (discard) refuses connections on test hosts.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// Builder for creating test routers with configurable settings.
pub struct TestAppBuilder {
    settings: Settings,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings::for_tests()
                .with_gateway_url(Some(UNREACHABLE_URL.to_string()))
                .with_rpc_url(Some(UNREACHABLE_URL.to_string())),
        }
    }

    /// Configure authentication token requirement.
    pub fn with_auth(mut self, token: &str) -> Self {
        self.settings = self.settings.with_internal_token(Some(token.to_string()));
        self
    }

    pub fn with_gateway_url(mut self, url: String) -> Self {
        self.settings = self.settings.with_gateway_url(Some(url));
        self
    }

    pub fn with_rpc_url(mut self, url: String) -> Self {
        self.settings = self.settings.with_rpc_url(Some(url));
        self
    }

    pub fn with_signer(mut self, signer: &str) -> Self {
        self.settings = self.settings.with_signer_address(Some(signer.to_string()));
        self
    }

    pub fn with_body_limit_bytes(mut self, bytes: usize) -> Self {
        self.settings = self.settings.with_body_limit_bytes(bytes);
        self
    }

    /// Build the `fhevm-api` router.
    pub fn build_api(self) -> Router {
        let config = self.settings.fhevm_config().unwrap();
        let client = Arc::new(FhevmClient::new(config).unwrap());
        build_api_router(&self.settings, client)
    }

    /// Build the `fhevm-gateway` router over in-memory storage.
    pub fn build_gateway(self, keys: Arc<KeyStore>) -> Router {
        let chain_id = self.settings.gateway_chain_id().unwrap();
        build_gateway_router(&self.settings, keys, Storage::open_memory().unwrap(), chain_id)
    }
}

/// API router without authentication.
pub fn api_app() -> Router {
    TestAppBuilder::new().build_api()
}

/// API router with authentication required.
pub fn api_app_with_auth(token: &str) -> Router {
    TestAppBuilder::new().with_auth(token).build_api()
}

/// Serve `router` on an ephemeral local port.
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_json_body(response: Response) -> Value {
    use http_body_util::BodyExt;

    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Helper to get response status and body as string (for debugging).
pub async fn response_debug(response: Response) -> (StatusCode, String) {
    use http_body_util::BodyExt;

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&body).to_string();
    (status, text)
}
