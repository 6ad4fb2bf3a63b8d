//! Observable wrappers around [`FhevmClient`] for long-lived callers (UIs,
//! bots, background workers).
//!
//! Each binding publishes its state through a `tokio::sync::watch` channel so
//! observers can react to readiness, in-flight operations and failures
//! without polling.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use crate::abi::{Abi, AbiValue};
use crate::client::{FhevmClient, FhevmConfig};
use crate::contract::{Contract, EventSubscription};
use crate::decryption::decryption_error_message;
use crate::error::FhevmError;
use crate::types::{ClearValue, ContractCallOptions, EncryptedValue, FheType, NetworkInfo, TransactionReceipt};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindingState {
    pub ready: bool,
    pub error: Option<String>,
    pub network: Option<NetworkInfo>,
}

/// Shared client plus its initialization state.
#[derive(Clone)]
pub struct FhevmBinding {
    client: Arc<FhevmClient>,
    state: watch::Receiver<BindingState>,
}

impl FhevmBinding {
    /// Build the client and start initializing it in the background.
    pub fn connect(config: FhevmConfig) -> Result<Self, FhevmError> {
        Ok(Self::from_client(Arc::new(FhevmClient::new(config)?)))
    }

    pub fn from_client(client: Arc<FhevmClient>) -> Self {
        let (sender, state) = watch::channel(BindingState::default());
        let task_client = Arc::clone(&client);
        tokio::spawn(async move {
            let next = match task_client.initialize().await {
                Ok(()) => BindingState {
                    ready: true,
                    error: None,
                    network: Some(task_client.get_network()),
                },
                Err(error) => {
                    warn!("FHEVM initialization failed: {error}");
                    BindingState {
                        ready: false,
                        error: Some(error.to_string()),
                        network: None,
                    }
                }
            };
            let _ = sender.send(next);
        });
        Self { client, state }
    }

    /// The client once it is ready.
    pub fn instance(&self) -> Option<Arc<FhevmClient>> {
        self.is_ready().then(|| Arc::clone(&self.client))
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn network(&self) -> Option<NetworkInfo> {
        self.state.borrow().network.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BindingState> {
        self.state.clone()
    }

    /// Wait until initialization settles either way.
    pub async fn wait_ready(&self) -> Result<Arc<FhevmClient>, FhevmError> {
        let mut state = self.state.clone();
        let settled = state
            .wait_for(|state| state.ready || state.error.is_some())
            .await
            .map_err(|_| FhevmError::NotReady)?
            .clone();
        match settled.error {
            Some(error) => Err(FhevmError::Gateway(error)),
            None => Ok(Arc::clone(&self.client)),
        }
    }

    fn ready_client(&self) -> Result<Arc<FhevmClient>, FhevmError> {
        self.instance().ok_or(FhevmError::NotReady)
    }

    pub fn encryption(&self) -> Encryption {
        Encryption {
            binding: self.clone(),
            tracker: OperationTracker::new(),
        }
    }

    pub fn decryption(&self) -> Decryption {
        Decryption {
            binding: self.clone(),
            tracker: OperationTracker::new(),
        }
    }

    pub fn contract(&self, address: &str, abi: Abi) -> ContractBinding {
        ContractBinding {
            binding: self.clone(),
            address: address.to_string(),
            abi,
            tracker: OperationTracker::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationStatus {
    pub in_flight: bool,
    pub error: Option<String>,
}

struct OperationTracker {
    sender: watch::Sender<OperationStatus>,
}

impl OperationTracker {
    fn new() -> Self {
        let (sender, _) = watch::channel(OperationStatus::default());
        Self { sender }
    }

    fn status(&self) -> OperationStatus {
        self.sender.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.sender.subscribe()
    }

    async fn track<T, F>(&self, operation: F) -> Result<T, FhevmError>
    where
        F: Future<Output = Result<T, FhevmError>>,
    {
        self.track_with(operation, ToString::to_string).await
    }

    /// Like `track`, publishing `describe(error)` as the status message.
    async fn track_with<T, F>(
        &self,
        operation: F,
        describe: fn(&FhevmError) -> String,
    ) -> Result<T, FhevmError>
    where
        F: Future<Output = Result<T, FhevmError>>,
    {
        self.sender.send_replace(OperationStatus {
            in_flight: true,
            error: None,
        });
        let result = operation.await;
        self.sender.send_replace(OperationStatus {
            in_flight: false,
            error: result.as_ref().err().map(describe),
        });
        result
    }
}

pub struct Encryption {
    binding: FhevmBinding,
    tracker: OperationTracker,
}

impl Encryption {
    pub async fn encrypt(&self, value: &Value, fhe_type: FheType) -> Result<EncryptedValue, FhevmError> {
        let client = self.binding.ready_client()?;
        self.tracker.track(client.encrypt(value, fhe_type)).await
    }

    pub fn status(&self) -> OperationStatus {
        self.tracker.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.tracker.subscribe()
    }
}

pub struct Decryption {
    binding: FhevmBinding,
    tracker: OperationTracker,
}

impl Decryption {
    pub async fn decrypt(&self, handle: &str, fhe_type: FheType) -> Result<ClearValue, FhevmError> {
        let client = self.binding.ready_client()?;
        self.tracker
            .track_with(client.decrypt(handle, fhe_type), decryption_error_message)
            .await
    }

    pub fn status(&self) -> OperationStatus {
        self.tracker.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.tracker.subscribe()
    }
}

pub struct ContractBinding {
    binding: FhevmBinding,
    address: String,
    abi: Abi,
    tracker: OperationTracker,
}

impl ContractBinding {
    fn contract(&self) -> Result<Contract, FhevmError> {
        self.binding
            .ready_client()?
            .get_contract(&self.address, self.abi.clone())
    }

    pub async fn read(&self, function: &str, args: &[Value]) -> Result<Vec<AbiValue>, FhevmError> {
        let contract = self.contract()?;
        self.tracker.track(contract.read(function, args)).await
    }

    pub async fn write(
        &self,
        function: &str,
        args: &[Value],
        options: &ContractCallOptions,
    ) -> Result<TransactionReceipt, FhevmError> {
        let contract = self.contract()?;
        self.tracker
            .track(contract.write(function, args, options))
            .await
    }

    /// Subscribe to `event`; drop the subscription to stop watching.
    pub async fn watch_event(&self, event: &str) -> Result<EventSubscription, FhevmError> {
        self.contract()?.on(event).await
    }

    pub fn status(&self) -> OperationStatus {
        self.tracker.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.tracker.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> FhevmConfig {
        FhevmConfig {
            gateway_url: Some("http://127.0.0.1:9".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn failed_initialization_is_published() {
        let binding = FhevmBinding::connect(unreachable_config()).unwrap();
        let result = binding.wait_ready().await;
        assert!(result.is_err());
        assert!(!binding.is_ready());
        assert!(binding.error().is_some());
        assert!(binding.instance().is_none());
        assert!(binding.network().is_none());
    }

    #[tokio::test]
    async fn operations_refuse_before_ready() {
        let binding = FhevmBinding::connect(unreachable_config()).unwrap();
        let _ = binding.wait_ready().await;

        let encryption = binding.encryption();
        let err = encryption
            .encrypt(&serde_json::json!(1), FheType::Euint8)
            .await
            .unwrap_err();
        assert!(matches!(err, FhevmError::NotReady));
        assert_eq!(encryption.status(), OperationStatus::default());
    }

    #[tokio::test]
    async fn tracker_records_failures() {
        let tracker = OperationTracker::new();
        let mut updates = tracker.subscribe();
        let result: Result<(), FhevmError> = tracker
            .track(async { Err(FhevmError::Gateway("down".into())) })
            .await;
        assert!(result.is_err());
        updates.changed().await.unwrap();
        let status = updates.borrow().clone();
        assert!(!status.in_flight);
        assert_eq!(status.error.as_deref(), Some("gateway error: down"));
    }

    #[tokio::test]
    async fn tracker_publishes_described_errors() {
        let tracker = OperationTracker::new();
        let result: Result<(), FhevmError> = tracker
            .track_with(
                async { Err(FhevmError::Unauthorized("caller may not decrypt".into())) },
                decryption_error_message,
            )
            .await;
        assert!(matches!(result, Err(FhevmError::Unauthorized(_))));
        assert_eq!(
            tracker.status().error.as_deref(),
            Some("User is not authorized to decrypt this value")
        );
    }
}
