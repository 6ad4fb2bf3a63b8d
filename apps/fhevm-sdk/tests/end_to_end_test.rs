//! Client and API service against a live development gateway.
//!
//! The gateway is served on an ephemeral port; the client fetches its public
//! key, uploads each ciphertext after encryption and decrypts through it.

mod common;
mod http;

use std::net::SocketAddr;

use axum::http::StatusCode;
use num_bigint::BigUint;
use serde_json::json;
use tower::ServiceExt;

use fhevm_sdk::bindings::FhevmBinding;
use fhevm_sdk::types::{ClearValue, FheType};
use fhevm_sdk::{FhevmClient, FhevmConfig, FhevmError};

async fn spawn_gateway() -> SocketAddr {
    let router = http::TestAppBuilder::new().build_gateway(common::shared_keystore());
    http::spawn(router).await
}

fn client_for(gateway: SocketAddr, signer: &str) -> FhevmClient {
    FhevmClient::new(FhevmConfig {
        gateway_url: Some(format!("http://{gateway}")),
        rpc_url: Some(http::UNREACHABLE_URL.to_string()),
        contract_address: Some(common::CONTRACT.to_string()),
        signer: Some(signer.to_string()),
        submit_inputs: true,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn initialize_fetches_gateway_key() {
    let gateway = spawn_gateway().await;
    let client = client_for(gateway, common::USER);
    assert!(!client.is_ready());

    client.initialize().await.unwrap();
    client.initialize().await.unwrap();

    assert!(client.is_ready());
    assert_eq!(
        client.public_key_base64().as_deref(),
        Some(common::shared_keystore().public_key_b64())
    );
}

#[tokio::test]
async fn encrypt_then_decrypt_round_trips() {
    let gateway = spawn_gateway().await;
    let client = client_for(gateway, common::USER);
    client.initialize().await.unwrap();

    let small = client.encrypt(&json!(42), FheType::Euint8).await.unwrap();
    assert_eq!(FheType::from_handle(&small.handle).unwrap(), FheType::Euint8);
    let clear = client
        .decrypt(&small.handle.to_hex(), FheType::Euint8)
        .await
        .unwrap();
    assert_eq!(clear, ClearValue::Number(42));

    let flag = client.encrypt(&json!(true), FheType::Ebool).await.unwrap();
    let clear = client
        .decrypt(&flag.handle.to_hex(), FheType::Ebool)
        .await
        .unwrap();
    assert_eq!(clear, ClearValue::Bool(true));

    let wide = client
        .encrypt(&json!("18446744073709551615"), FheType::Euint64)
        .await
        .unwrap();
    let clear = client
        .decrypt(&wide.handle.to_hex(), FheType::Euint64)
        .await
        .unwrap();
    assert_eq!(clear, ClearValue::BigInt(BigUint::from(u64::MAX)));
}

#[tokio::test]
async fn address_round_trips() {
    let gateway = spawn_gateway().await;
    let client = client_for(gateway, common::USER);
    client.initialize().await.unwrap();

    let encrypted = client
        .encrypt(&json!(common::CONTRACT), FheType::Eaddress)
        .await
        .unwrap();
    let clear = client
        .decrypt(&encrypted.handle.to_hex(), FheType::Eaddress)
        .await
        .unwrap();

    assert_eq!(clear, ClearValue::Address(common::CONTRACT.to_string()));
}

#[tokio::test]
async fn other_user_cannot_decrypt() {
    let gateway = spawn_gateway().await;
    let owner = client_for(gateway, common::USER);
    owner.initialize().await.unwrap();
    let encrypted = owner.encrypt(&json!(9), FheType::Euint16).await.unwrap();

    let stranger = client_for(gateway, common::OTHER_USER);
    stranger.initialize().await.unwrap();
    let err = stranger
        .decrypt(&encrypted.handle.to_hex(), FheType::Euint16)
        .await
        .unwrap_err();

    assert!(matches!(err, FhevmError::Unauthorized(_)), "{err}");
}

#[tokio::test]
async fn declared_type_must_match_handle() {
    let gateway = spawn_gateway().await;
    let client = client_for(gateway, common::USER);
    client.initialize().await.unwrap();
    let encrypted = client.encrypt(&json!(9), FheType::Euint16).await.unwrap();

    let err = client
        .decrypt(&encrypted.handle.to_hex(), FheType::Euint32)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("holds euint16, not euint32"), "{err}");
}

#[tokio::test]
async fn out_of_range_value_is_rejected_before_encryption() {
    let gateway = spawn_gateway().await;
    let client = client_for(gateway, common::USER);
    client.initialize().await.unwrap();

    let err = client.encrypt(&json!(256), FheType::Euint8).await.unwrap_err();

    assert!(matches!(err, FhevmError::InvalidInput(_)), "{err}");
}

#[tokio::test]
async fn api_routes_round_trip_through_gateway() {
    let gateway = spawn_gateway().await;
    let app = http::TestAppBuilder::new()
        .with_gateway_url(format!("http://{gateway}"))
        .with_signer(common::USER)
        .build_api();

    let response = app
        .clone()
        .oneshot(http::json_request(
            "POST",
            "/api/fhe/encrypt",
            json!({ "value": 1234, "type": "euint32" }),
        ))
        .await
        .unwrap();
    let (status, body) = http::response_debug(response).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let encrypted: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(encrypted["success"], true);
    assert_eq!(encrypted["encrypted"]["type"], "euint32");
    assert_eq!(encrypted["metadata"]["originalType"], "euint32");
    let handle = encrypted["encrypted"]["handle"].as_str().unwrap().to_string();
    let proof = encrypted["encrypted"]["data"].as_str().unwrap();
    assert!(proof.starts_with(&format!("0x01{}", &handle[2..])));

    let response = app
        .clone()
        .oneshot(http::json_request(
            "POST",
            "/api/fhe/decrypt",
            json!({
                "handle": handle,
                "type": "euint32",
                "contractAddress": common::CONTRACT,
            }),
        ))
        .await
        .unwrap();
    let (status, body) = http::response_debug(response).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let decrypted: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(decrypted["decrypted"]["value"], 1234);
    assert_eq!(decrypted["decrypted"]["handle"], handle);

    let status = app.oneshot(http::get_request("/api/fhe")).await.unwrap();
    let status = http::parse_json_body(status).await;
    assert_eq!(status["status"]["ready"], true);
}

#[tokio::test]
async fn api_decrypt_reports_gateway_refusal_in_plain_words() {
    let gateway = spawn_gateway().await;
    let owner = client_for(gateway, common::USER);
    owner.initialize().await.unwrap();
    let encrypted = owner.encrypt(&json!(7), FheType::Euint8).await.unwrap();

    let app = http::TestAppBuilder::new()
        .with_gateway_url(format!("http://{gateway}"))
        .build_api();
    let response = app
        .oneshot(http::json_request(
            "POST",
            "/api/fhe/decrypt",
            json!({
                "handle": encrypted.handle.to_hex(),
                "type": "euint8",
                "contractAddress": common::CONTRACT,
                "userAddress": common::OTHER_USER,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = http::parse_json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "User is not authorized to decrypt this value");
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn decryption_binding_publishes_plain_refusal() {
    let gateway = spawn_gateway().await;
    let owner = client_for(gateway, common::USER);
    owner.initialize().await.unwrap();
    let encrypted = owner.encrypt(&json!(9), FheType::Euint8).await.unwrap();

    let binding = FhevmBinding::connect(FhevmConfig {
        gateway_url: Some(format!("http://{gateway}")),
        rpc_url: Some(http::UNREACHABLE_URL.to_string()),
        contract_address: Some(common::CONTRACT.to_string()),
        signer: Some(common::OTHER_USER.to_string()),
        ..Default::default()
    })
    .unwrap();
    binding.wait_ready().await.unwrap();

    let decryption = binding.decryption();
    let err = decryption
        .decrypt(&encrypted.handle.to_hex(), FheType::Euint8)
        .await
        .unwrap_err();

    assert!(matches!(err, FhevmError::Unauthorized(_)), "{err}");
    let status = decryption.status();
    assert!(!status.in_flight);
    assert_eq!(
        status.error.as_deref(),
        Some("User is not authorized to decrypt this value")
    );
}
