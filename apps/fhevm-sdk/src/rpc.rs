//! Ethereum JSON-RPC client

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::FhevmError;
use crate::types::{ContractCallOptions, Log, TransactionReceipt};

const RPC_REQUEST_TIMEOUT_SECS: u64 = 30;

fn rpc_error(message: impl Into<String>) -> FhevmError {
    FhevmError::Rpc(message.into())
}

/// Parse a `0x` hex quantity.
pub fn parse_quantity(value: &str) -> Result<u64, FhevmError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| rpc_error(format!("invalid quantity: {value}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|_| rpc_error(format!("invalid quantity: {value}")))
}

pub fn to_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

#[derive(Clone, Debug)]
pub struct RpcClient {
    url: String,
    client: Client,
}

/// Log filter for `eth_getLogs`.
#[derive(Clone, Debug, Default)]
pub struct LogFilter {
    pub address: String,
    pub topic0: Option<String>,
    pub from_block: u64,
    pub to_block: Option<u64>,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self, FhevmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(RPC_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| rpc_error(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, FhevmError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| rpc_error(format!("{method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rpc_error(format!("{method}: HTTP {status}")));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| rpc_error(format!("{method}: {e}")))?;

        if let Some(error) = body.error {
            return Err(rpc_error(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        // A null result is meaningful for some methods (pending receipts).
        Ok(body.result.unwrap_or(Value::Null))
    }

    async fn call_quantity(&self, method: &str) -> Result<u64, FhevmError> {
        let result = self.call(method, vec![]).await?;
        let text = result
            .as_str()
            .ok_or_else(|| rpc_error(format!("{method}: expected hex quantity, got {result}")))?;
        parse_quantity(text)
    }

    pub async fn chain_id(&self) -> Result<u64, FhevmError> {
        self.call_quantity("eth_chainId").await
    }

    pub async fn block_number(&self) -> Result<u64, FhevmError> {
        self.call_quantity("eth_blockNumber").await
    }

    /// `eth_call` against the latest block; returns raw return data.
    pub async fn call_contract(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, FhevmError> {
        let result = self
            .call(
                "eth_call",
                vec![
                    json!({ "to": to, "data": format!("0x{}", hex::encode(data)) }),
                    json!("latest"),
                ],
            )
            .await?;
        let text = result
            .as_str()
            .ok_or_else(|| rpc_error(format!("eth_call: expected hex data, got {result}")))?;
        let digits = text.strip_prefix("0x").unwrap_or(text);
        hex::decode(digits).map_err(|e| rpc_error(format!("eth_call: invalid hex: {e}")))
    }

    /// `eth_sendTransaction` from a node-managed account; returns the hash.
    pub async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        data: &[u8],
        options: &ContractCallOptions,
    ) -> Result<String, FhevmError> {
        let mut tx = json!({
            "from": from,
            "to": to,
            "data": format!("0x{}", hex::encode(data)),
        });
        if let Some(gas) = options.gas_limit {
            tx["gas"] = json!(to_quantity(gas.into()));
        }
        if let Some(gas_price) = options.gas_price {
            tx["gasPrice"] = json!(to_quantity(gas_price));
        }
        if let Some(value) = options.value {
            tx["value"] = json!(to_quantity(value));
        }
        if let Some(nonce) = options.nonce {
            tx["nonce"] = json!(to_quantity(nonce.into()));
        }

        let result = self.call("eth_sendTransaction", vec![tx]).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| rpc_error(format!("eth_sendTransaction: unexpected result {result}")))
    }

    /// `None` while the transaction is pending.
    pub async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, FhevmError> {
        let result = self
            .call("eth_getTransactionReceipt", vec![json!(hash)])
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = serde_json::from_value(result)
            .map_err(|e| rpc_error(format!("eth_getTransactionReceipt: {e}")))?;
        raw.into_receipt().map(Some)
    }

    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, FhevmError> {
        let mut params = json!({
            "address": filter.address,
            "fromBlock": to_quantity(filter.from_block.into()),
            "toBlock": filter
                .to_block
                .map(|block| to_quantity(block.into()))
                .unwrap_or_else(|| "latest".to_string()),
        });
        if let Some(topic) = filter.topic0.as_ref() {
            params["topics"] = json!([topic]);
        }

        let result = self.call("eth_getLogs", vec![params]).await?;
        let raw: Vec<RawLog> = serde_json::from_value(result)
            .map_err(|e| rpc_error(format!("eth_getLogs: {e}")))?;
        raw.into_iter().map(RawLog::into_log).collect()
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: Option<String>,
    transaction_hash: Option<String>,
}

impl RawLog {
    fn into_log(self) -> Result<Log, FhevmError> {
        Ok(Log {
            address: self.address,
            topics: self.topics,
            data: self.data,
            block_number: self.block_number.as_deref().map(parse_quantity).transpose()?,
            transaction_hash: self.transaction_hash,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: String,
    status: Option<String>,
    gas_used: String,
    #[serde(default)]
    logs: Vec<RawLog>,
}

impl RawReceipt {
    fn into_receipt(self) -> Result<TransactionReceipt, FhevmError> {
        Ok(TransactionReceipt {
            hash: self.transaction_hash,
            block_number: parse_quantity(&self.block_number)?,
            status: self.status.as_deref().map(parse_quantity).transpose()?.unwrap_or(1),
            gas_used: parse_quantity(&self.gas_used)?,
            logs: self
                .logs
                .into_iter()
                .map(RawLog::into_log)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x7a69").unwrap(), 31337);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("7a69").is_err());
        assert_eq!(to_quantity(255), "0xff");
    }

    #[test]
    fn receipt_conversion() {
        let raw: RawReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x1",
            "gasUsed": "0x5208",
            "logs": [{
                "address": "0x87288e6cee215e01d2704c0d4d01eaf1d192659d",
                "topics": [],
                "data": "0x",
                "blockNumber": "0x10"
            }]
        }))
        .unwrap();
        let receipt = raw.into_receipt().unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(receipt.status, 1);
        assert_eq!(receipt.logs[0].block_number, Some(16));
    }
}
