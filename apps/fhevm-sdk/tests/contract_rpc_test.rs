//! Contract calls over JSON-RPC against a mock node.
//!
//! The mock answers the handful of `eth_*` methods the SDK uses and records
//! every transaction it is asked to send.

mod http;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use num_bigint::BigUint;
use serde_json::{json, Value};
use tower::ServiceExt;

use fhevm_sdk::abi::{Abi, AbiValue};
use fhevm_sdk::contract::Contract;
use fhevm_sdk::rpc::RpcClient;
use fhevm_sdk::types::ContractCallOptions;
use fhevm_sdk::FhevmError;

const USER: &str = "0x5986ff19b524534f159af67f421ca081c6f5acff";
const CONTRACT: &str = "0x87288e6cee215e01d2704c0d4d01eaf1d192659d";
const TX_HASH: &str = "0xabababababababababababababababababababababababababababababababab";

#[derive(Clone, Default)]
struct MockNode {
    sent: Arc<Mutex<Vec<Value>>>,
    revert: bool,
}

impl MockNode {
    fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }
}

fn word(value: &str) -> String {
    format!("0x{:0>64}", value.trim_start_matches("0x"))
}

fn transfer_log() -> Value {
    let abi = token_abi();
    json!({
        "address": CONTRACT,
        "topics": [
            abi.event("Transfer").unwrap().topic_hex(),
            word(USER),
            word(CONTRACT),
        ],
        "data": format!("0x{:064x}", 5),
        "blockNumber": "0x10",
        "transactionHash": TX_HASH,
    })
}

async fn rpc(State(node): State<MockNode>, Json(request): Json<Value>) -> Json<Value> {
    let params = request["params"].clone();
    let status = if node.revert { "0x0" } else { "0x1" };
    let result = match request["method"].as_str().unwrap_or_default() {
        "eth_chainId" => json!("0x7a69"),
        "eth_blockNumber" => json!("0x10"),
        "eth_call" => json!(format!("0x{:064x}", 42)),
        "eth_sendTransaction" => {
            node.sent.lock().unwrap().push(params[0].clone());
            json!(TX_HASH)
        }
        "eth_getTransactionReceipt" => json!({
            "transactionHash": TX_HASH,
            "blockNumber": "0x10",
            "status": status,
            "gasUsed": "0x5208",
            "logs": [],
        }),
        "eth_getLogs" => json!([transfer_log()]),
        other => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": { "code": -32601, "message": format!("method {other} not found") },
            }))
        }
    };
    Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }))
}

async fn spawn_node(node: MockNode) -> String {
    let router = Router::new().route("/", post(rpc)).with_state(node);
    format!("http://{}", http::spawn(router).await)
}

fn token_abi() -> Abi {
    Abi::parse_human_readable(&[
        "function balanceOf(address owner) view returns (uint256)",
        "function transfer(address to, uint256 amount) returns (bool)",
        "event Transfer(address indexed from, address indexed to, uint256 value)",
    ])
    .unwrap()
}

fn address_bytes(address: &str) -> [u8; 20] {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hex::decode(&address[2..]).unwrap());
    bytes
}

// ============================================================================
// RpcClient
// ============================================================================

#[tokio::test]
async fn rpc_reads_chain_and_block() {
    let url = spawn_node(MockNode::default()).await;
    let rpc = RpcClient::new(&url).unwrap();

    assert_eq!(rpc.chain_id().await.unwrap(), 31337);
    assert_eq!(rpc.block_number().await.unwrap(), 16);
}

#[tokio::test]
async fn unreachable_node_is_an_rpc_error() {
    let rpc = RpcClient::new(http::UNREACHABLE_URL).unwrap();

    let err = rpc.chain_id().await.unwrap_err();

    assert!(matches!(err, FhevmError::Rpc(_)), "{err}");
}

// ============================================================================
// Contract
// ============================================================================

#[tokio::test]
async fn read_decodes_return_data() {
    let url = spawn_node(MockNode::default()).await;
    let contract = Contract::new(CONTRACT, token_abi(), RpcClient::new(&url).unwrap(), None).unwrap();

    let values = contract.read("balanceOf", &[json!(USER)]).await.unwrap();

    assert_eq!(values, vec![AbiValue::Uint(BigUint::from(42u32))]);
}

#[tokio::test]
async fn write_sends_from_signer_and_waits_for_receipt() {
    let node = MockNode::default();
    let url = spawn_node(node.clone()).await;
    let contract = Contract::new(
        CONTRACT,
        token_abi(),
        RpcClient::new(&url).unwrap(),
        Some(USER.to_string()),
    )
    .unwrap();

    let options = ContractCallOptions {
        gas_limit: Some(100_000),
        ..Default::default()
    };
    let receipt = contract
        .write("transfer", &[json!(CONTRACT), json!("1000")], &options)
        .await
        .unwrap();

    assert_eq!(receipt.hash, TX_HASH);
    assert_eq!(receipt.block_number, 16);
    assert_eq!(receipt.gas_used, 21_000);

    let sent = node.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["from"], USER);
    assert_eq!(sent[0]["to"], CONTRACT);
    assert_eq!(sent[0]["gas"], "0x186a0");
    assert!(sent[0]["data"].as_str().unwrap().starts_with("0xa9059cbb"));
}

#[tokio::test]
async fn write_without_signer_is_rejected() {
    let node = MockNode::default();
    let url = spawn_node(node.clone()).await;
    let contract = Contract::new(CONTRACT, token_abi(), RpcClient::new(&url).unwrap(), None).unwrap();

    let err = contract
        .write("transfer", &[json!(CONTRACT), json!(1)], &ContractCallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FhevmError::InvalidInput(_)), "{err}");
    assert!(node.sent().is_empty());
}

#[tokio::test]
async fn reverted_transaction_is_an_error() {
    let url = spawn_node(MockNode {
        revert: true,
        ..Default::default()
    })
    .await;
    let contract = Contract::new(
        CONTRACT,
        token_abi(),
        RpcClient::new(&url).unwrap(),
        Some(USER.to_string()),
    )
    .unwrap();

    let err = contract
        .write("transfer", &[json!(CONTRACT), json!(1)], &ContractCallOptions::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("reverted"), "{err}");
}

#[tokio::test]
async fn event_subscription_decodes_logs() {
    let url = spawn_node(MockNode::default()).await;
    let contract = Contract::new(CONTRACT, token_abi(), RpcClient::new(&url).unwrap(), None)
        .unwrap()
        .with_poll_interval(Duration::from_millis(20));

    let mut subscription = contract.on("Transfer").await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(5), subscription.next())
        .await
        .unwrap()
        .unwrap();
    subscription.off();

    assert_eq!(event.name, "Transfer");
    assert_eq!(event.get("from"), Some(&AbiValue::Address(address_bytes(USER))));
    assert_eq!(event.get("to"), Some(&AbiValue::Address(address_bytes(CONTRACT))));
    assert_eq!(event.get("value"), Some(&AbiValue::Uint(BigUint::from(5u32))));
    assert_eq!(event.log.block_number, Some(16));
}

#[tokio::test]
async fn unknown_function_is_an_abi_error() {
    let contract = Contract::new(
        CONTRACT,
        token_abi(),
        RpcClient::new(http::UNREACHABLE_URL).unwrap(),
        None,
    )
    .unwrap();

    let err = contract.read("mint", &[]).await.unwrap_err();

    assert!(matches!(err, FhevmError::Abi(_)), "{err}");
}

// ============================================================================
// /api/fhe/compute
// ============================================================================

#[tokio::test]
async fn compute_route_submits_transaction() {
    let node = MockNode::default();
    let url = spawn_node(node.clone()).await;
    let app = http::TestAppBuilder::new()
        .with_rpc_url(url)
        .with_signer(USER)
        .build_api();
    let lhs = format!("0x{}", "11".repeat(32));
    let rhs = format!("0x{}", "22".repeat(32));

    let response = app
        .oneshot(http::json_request(
            "POST",
            "/api/fhe/compute",
            json!({
                "operation": "add",
                "operands": [lhs, rhs],
                "contractAddress": CONTRACT,
                "abi": ["function add(bytes32 lhs, bytes32 rhs) returns (bytes32)"],
            }),
        ))
        .await
        .unwrap();

    let (status, body) = http::response_debug(response).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["result"]["operation"], "add");
    assert_eq!(json["result"]["transactionHash"], TX_HASH);
    assert_eq!(json["result"]["blockNumber"], 16);

    let sent = node.sent();
    assert_eq!(sent.len(), 1);
    let data = sent[0]["data"].as_str().unwrap();
    assert_eq!(data.len(), 2 + 8 + 128);
    assert!(data.ends_with(&"22".repeat(32)));
}

#[tokio::test]
async fn compute_route_without_signer_is_rejected() {
    let node = MockNode::default();
    let url = spawn_node(node.clone()).await;
    let app = http::TestAppBuilder::new().with_rpc_url(url).build_api();

    let response = app
        .oneshot(http::json_request(
            "POST",
            "/api/fhe/compute",
            json!({
                "operation": "add",
                "operands": [format!("0x{}", "11".repeat(32)), format!("0x{}", "22".repeat(32))],
                "contractAddress": CONTRACT,
                "abi": ["function add(bytes32 lhs, bytes32 rhs) returns (bytes32)"],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(node.sent().is_empty());
}
