//! Contract handle: ABI-driven reads, writes and event subscriptions.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::abi::{Abi, AbiValue};
use crate::error::FhevmError;
use crate::rpc::{LogFilter, RpcClient};
use crate::types::{ContractCallOptions, Log, TransactionReceipt};
use crate::validation::is_valid_address;

const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct Contract {
    address: String,
    abi: Arc<Abi>,
    rpc: RpcClient,
    signer: Option<String>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

/// A log decoded against the contract ABI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: String,
    pub values: Vec<(String, AbiValue)>,
    pub log: Log,
}

impl DecodedEvent {
    pub fn get(&self, name: &str) -> Option<&AbiValue> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }
}

/// Live event feed. Dropping it stops the background poller.
pub struct EventSubscription {
    receiver: mpsc::Receiver<DecodedEvent>,
    poller: JoinHandle<()>,
}

impl EventSubscription {
    pub async fn next(&mut self) -> Option<DecodedEvent> {
        self.receiver.recv().await
    }

    pub fn off(self) {}
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

impl Contract {
    pub fn new(
        address: &str,
        abi: Abi,
        rpc: RpcClient,
        signer: Option<String>,
    ) -> Result<Self, FhevmError> {
        if !is_valid_address(address) {
            return Err(FhevmError::InvalidInput(format!(
                "Invalid contract address: {address}"
            )));
        }
        Ok(Self {
            address: address.to_string(),
            abi: Arc::new(abi),
            rpc,
            signer,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_signer(mut self, signer: Option<String>) -> Self {
        self.signer = signer;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Call a view/pure function through `eth_call`.
    #[tracing::instrument(skip(self, args), fields(contract = %self.address))]
    pub async fn read(&self, function: &str, args: &[Value]) -> Result<Vec<AbiValue>, FhevmError> {
        let function = self.abi.function(function)?;
        let calldata = function.encode_json_call(args)?;
        let output = self.rpc.call_contract(&self.address, &calldata).await?;
        function.decode_output(&output)
    }

    /// Send a state-changing call and wait for it to be mined.
    #[tracing::instrument(skip(self, args, options), fields(contract = %self.address))]
    pub async fn write(
        &self,
        function: &str,
        args: &[Value],
        options: &ContractCallOptions,
    ) -> Result<TransactionReceipt, FhevmError> {
        let signer = self.signer.as_deref().ok_or_else(|| {
            FhevmError::InvalidInput("A signer is required for state-changing calls".to_string())
        })?;
        let function = self.abi.function(function)?;
        let calldata = function.encode_json_call(args)?;

        let hash = self
            .rpc
            .send_transaction(signer, &self.address, &calldata, options)
            .await?;
        debug!(%hash, function = %function.name, "transaction sent");

        let receipt = self.wait_for_receipt(&hash).await?;
        if receipt.status == 0 {
            return Err(FhevmError::Rpc(format!("transaction {hash} reverted")));
        }
        Ok(receipt)
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<TransactionReceipt, FhevmError> {
        let poll = async {
            loop {
                if let Some(receipt) = self.rpc.transaction_receipt(hash).await? {
                    return Ok::<_, FhevmError>(receipt);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };
        tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| {
                FhevmError::Rpc(format!(
                    "transaction {hash} not mined within {}s",
                    self.confirmation_timeout.as_secs()
                ))
            })?
    }

    /// Subscribe to `event` from the current block onward.
    pub async fn on(&self, event: &str) -> Result<EventSubscription, FhevmError> {
        let event = self.abi.event(event)?.clone();
        let start = self.rpc.block_number().await?;
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let rpc = self.rpc.clone();
        let interval = self.poll_interval;
        let mut filter = LogFilter {
            address: self.address.clone(),
            topic0: (!event.anonymous).then(|| event.topic_hex()),
            from_block: start,
            to_block: None,
        };

        let poller = tokio::spawn(async move {
            loop {
                let latest = match rpc.block_number().await {
                    Ok(latest) => latest,
                    Err(error) => {
                        warn!(event = %event.name, "block number poll failed: {error}");
                        tokio::time::sleep(interval).await;
                        continue;
                    }
                };

                if latest >= filter.from_block {
                    filter.to_block = Some(latest);
                    match rpc.get_logs(&filter).await {
                        Ok(logs) => {
                            for log in logs {
                                let values = match event.decode_log(&log) {
                                    Ok(values) => values,
                                    Err(error) => {
                                        debug!(event = %event.name, "skipping log: {error}");
                                        continue;
                                    }
                                };
                                let decoded = DecodedEvent {
                                    name: event.name.clone(),
                                    values,
                                    log,
                                };
                                if sender.send(decoded).await.is_err() {
                                    return;
                                }
                            }
                            filter.from_block = latest + 1;
                        }
                        Err(error) => {
                            warn!(event = %event.name, "log poll failed: {error}");
                        }
                    }
                }

                if sender.is_closed() {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        });

        Ok(EventSubscription { receiver, poller })
    }
}
