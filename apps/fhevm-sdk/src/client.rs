//! FHEVM client: network resolution, key bootstrap, typed encrypt/decrypt.
//!
//! The client is cheap to share behind an `Arc`. Initialization fetches the
//! network public key from the gateway exactly once; concurrent callers of
//! [`FhevmClient::initialize`] wait on the same fetch.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tfhe::CompressedPublicKey;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};

use crate::abi::Abi;
use crate::contract::Contract;
use crate::crypto::{decode_compressed_public_key, derive_handle, encrypt_clear_value, run_cpu_bound};
use crate::decryption::parse_decryption_result;
use crate::error::FhevmError;
use crate::gateway::{DecryptRequest, GatewayClient};
use crate::rpc::RpcClient;
use crate::types::{ClearValue, EncryptedValue, FheType, Network, NetworkInfo};
use crate::validation::{is_valid_address, parse_clear_value, validate_decryption_request};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080";
pub const DEFAULT_CHAIN_ID: u64 = 31337;

struct NetworkPreset {
    chain_id: u64,
    rpc_url: Option<&'static str>,
    gateway_url: Option<&'static str>,
}

fn preset(network: Network) -> Option<NetworkPreset> {
    match network {
        Network::Sepolia => Some(NetworkPreset {
            chain_id: 11_155_111,
            rpc_url: Some("https://rpc.sepolia.org"),
            gateway_url: Some("https://gateway.sepolia.zama.ai"),
        }),
        Network::Localhost => Some(NetworkPreset {
            chain_id: DEFAULT_CHAIN_ID,
            rpc_url: Some(DEFAULT_RPC_URL),
            gateway_url: Some(DEFAULT_GATEWAY_URL),
        }),
        Network::Zama => Some(NetworkPreset {
            chain_id: 8009,
            rpc_url: Some("https://devnet.zama.ai/"),
            gateway_url: Some("https://gateway.zama.ai"),
        }),
        Network::Mainnet => None,
    }
}

#[derive(Clone, Debug, Default)]
pub struct FhevmConfig {
    pub network: Option<Network>,
    pub rpc_url: Option<String>,
    pub gateway_url: Option<String>,
    pub chain_id: Option<u64>,
    /// Default contract for decryption requests.
    pub contract_address: Option<String>,
    /// Node-managed account used for transactions and as the decrypting user.
    pub signer: Option<String>,
    pub debug: bool,
    /// Base64 public key used when the gateway cannot be reached.
    pub public_key: Option<String>,
    /// Upload ciphertexts to the gateway after encryption.
    pub submit_inputs: bool,
    pub gateway_token: Option<String>,
}

/// Connection parameters after applying presets and defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedNetwork {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub gateway_url: String,
}

impl FhevmConfig {
    /// Explicit value, then network preset, then localhost defaults.
    pub fn resolve(&self) -> ResolvedNetwork {
        let preset = self.network.and_then(preset);
        let chain_id = self
            .chain_id
            .or(preset.as_ref().map(|preset| preset.chain_id))
            .unwrap_or(DEFAULT_CHAIN_ID);
        let rpc_url = self
            .rpc_url
            .clone()
            .or_else(|| preset.as_ref().and_then(|p| p.rpc_url).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let gateway_url = self
            .gateway_url
            .clone()
            .or_else(|| preset.as_ref().and_then(|p| p.gateway_url).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        let name = match self.network {
            Some(network) => network.to_string(),
            None if chain_id == DEFAULT_CHAIN_ID => Network::Localhost.to_string(),
            None => "unknown".to_string(),
        };

        ResolvedNetwork {
            name,
            chain_id,
            rpc_url,
            gateway_url,
        }
    }
}

struct PublicKeyMaterial {
    key: Arc<CompressedPublicKey>,
    base64: String,
}

pub struct FhevmClient {
    config: FhevmConfig,
    network: ResolvedNetwork,
    gateway: GatewayClient,
    rpc: RpcClient,
    public_key: OnceCell<PublicKeyMaterial>,
    signer: RwLock<Option<String>>,
    cpu_permits: Option<Arc<Semaphore>>,
}

impl FhevmClient {
    pub fn new(config: FhevmConfig) -> Result<Self, FhevmError> {
        if let Some(address) = config.contract_address.as_deref() {
            if !is_valid_address(address) {
                return Err(FhevmError::InvalidInput(format!(
                    "Invalid contract address: {address}"
                )));
            }
        }
        let network = config.resolve();
        let gateway =
            GatewayClient::new(&network.gateway_url)?.with_token(config.gateway_token.clone());
        let rpc = RpcClient::new(&network.rpc_url)?;
        let signer = RwLock::new(config.signer.clone());

        Ok(Self {
            config,
            network,
            gateway,
            rpc,
            public_key: OnceCell::new(),
            signer,
            cpu_permits: None,
        })
    }

    /// Bound concurrent FHE work with a shared semaphore.
    pub fn with_cpu_limit(mut self, permits: Arc<Semaphore>) -> Self {
        self.cpu_permits = Some(permits);
        self
    }

    pub fn config(&self) -> &FhevmConfig {
        &self.config
    }

    pub fn resolved_network(&self) -> &ResolvedNetwork {
        &self.network
    }

    pub fn chain_id(&self) -> u64 {
        self.network.chain_id
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    /// Fetch the network public key once; later calls return immediately.
    pub async fn initialize(&self) -> Result<(), FhevmError> {
        self.public_key
            .get_or_try_init(|| self.load_public_key())
            .await?;
        Ok(())
    }

    async fn load_public_key(&self) -> Result<PublicKeyMaterial, FhevmError> {
        let base64 = match self.gateway.public_key().await {
            Ok(base64) => base64,
            Err(error) => match self.config.public_key.clone() {
                Some(fallback) => {
                    warn!("Gateway public key fetch failed, using configured key: {error}");
                    fallback
                }
                None => return Err(error),
            },
        };

        let encoded = base64.clone();
        let key = run_cpu_bound(self.cpu_permits.as_deref(), move || {
            decode_compressed_public_key(&encoded)
        })
        .await?;

        info!(
            network = %self.network.name,
            chain_id = self.network.chain_id,
            "FHEVM client initialized"
        );
        Ok(PublicKeyMaterial {
            key: Arc::new(key),
            base64,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.public_key.initialized()
    }

    fn ready_key(&self) -> Result<&PublicKeyMaterial, FhevmError> {
        self.public_key.get().ok_or(FhevmError::NotReady)
    }

    pub fn public_key_base64(&self) -> Option<String> {
        self.public_key.get().map(|material| material.base64.clone())
    }

    pub fn get_network(&self) -> NetworkInfo {
        NetworkInfo {
            chain_id: self.network.chain_id,
            name: self.network.name.clone(),
        }
    }

    pub fn signer(&self) -> Option<String> {
        self.signer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_signer(&self, signer: Option<String>) {
        *self
            .signer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = signer;
    }

    pub fn get_contract(&self, address: &str, abi: Abi) -> Result<Contract, FhevmError> {
        Contract::new(address, abi, self.rpc.clone(), self.signer())
    }

    /// Validate `value` for `fhe_type`, encrypt it and derive its handle.
    #[tracing::instrument(skip(self, value))]
    pub async fn encrypt(&self, value: &Value, fhe_type: FheType) -> Result<EncryptedValue, FhevmError> {
        let clear = parse_clear_value(value, fhe_type)?;
        self.encrypt_clear(clear, fhe_type).await
    }

    pub async fn encrypt_clear(
        &self,
        clear: ClearValue,
        fhe_type: FheType,
    ) -> Result<EncryptedValue, FhevmError> {
        let key = Arc::clone(&self.ready_key()?.key);
        let ciphertext = run_cpu_bound(self.cpu_permits.as_deref(), move || {
            encrypt_clear_value(&clear, fhe_type, &key)
        })
        .await?;

        let handle = derive_handle(&ciphertext, fhe_type, self.network.chain_id);
        let encrypted = EncryptedValue {
            handle,
            fhe_type,
            ciphertext,
        };
        if self.config.debug {
            debug!(?encrypted, "value encrypted");
        }

        if self.config.submit_inputs {
            let signer = self.signer();
            self.gateway
                .submit_input(&encrypted, signer.as_deref(), self.network.chain_id)
                .await?;
        }
        Ok(encrypted)
    }

    /// Decrypt `handle` through the gateway using the configured contract and
    /// signer.
    pub async fn decrypt(&self, handle: &str, fhe_type: FheType) -> Result<ClearValue, FhevmError> {
        let signer = self.signer();
        self.decrypt_as(
            handle,
            fhe_type,
            self.config.contract_address.as_deref(),
            signer.as_deref(),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn decrypt_as(
        &self,
        handle: &str,
        fhe_type: FheType,
        contract_address: Option<&str>,
        user_address: Option<&str>,
    ) -> Result<ClearValue, FhevmError> {
        self.ready_key()?;
        let (handle, fhe_type) =
            validate_decryption_request(Some(handle), Some(fhe_type.as_str()), contract_address)?;
        let embedded = FheType::from_handle(&handle)?;
        if embedded != fhe_type {
            return Err(FhevmError::InvalidInput(format!(
                "invalid handle: {handle} holds {embedded}, not {fhe_type}"
            )));
        }
        if let Some(user) = user_address {
            if !is_valid_address(user) {
                return Err(FhevmError::InvalidInput(format!("Invalid user address: {user}")));
            }
        }

        let request = DecryptRequest {
            handle: handle.to_hex(),
            fhe_type: fhe_type.to_string(),
            contract_address: contract_address.map(str::to_string),
            user_address: user_address.map(str::to_string),
        };
        let value = self.gateway.decrypt(&request).await?;
        if self.config.debug {
            debug!(%handle, %value, "gateway returned plaintext");
        }
        parse_decryption_result(&value, fhe_type)
    }
}
