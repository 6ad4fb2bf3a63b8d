//! Service configuration derived from environment variables.

use std::env;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::client::FhevmConfig;
use crate::types::Network;
use crate::validation::is_valid_address;

const DEFAULT_API_PORT: u16 = 5001;
const DEFAULT_GATEWAY_PORT: u16 = 8080;
const DEFAULT_BODY_LIMIT_MB: usize = 64;
const DEFAULT_CONCURRENCY_LIMIT: usize = 4;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_TEST_TIMEOUT_MS: u64 = 180_000;
const DEFAULT_KEYS_DIR: &str = "./data/keys";
const DEFAULT_DB_PATH: &str = "./data/gateway.redb";

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env_opt(name).and_then(|value| value.parse().ok())
}

fn env_flag(name: &str) -> bool {
    env_opt(name).is_some_and(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
}

fn env_is_production(name: &str) -> bool {
    env_opt(name).is_some_and(|value| value.eq_ignore_ascii_case("production"))
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_opt(name).unwrap_or_else(|| default.to_string()))
}

/// Which binary is reading the environment; only the default port differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    Api,
    Gateway,
}

impl Service {
    fn default_port(self) -> u16 {
        match self {
            Service::Api => DEFAULT_API_PORT,
            Service::Gateway => DEFAULT_GATEWAY_PORT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    port: u16,
    host: IpAddr,
    body_limit_bytes: usize,
    internal_token: Option<String>,
    internal_token_required: bool,
    concurrency_limit: usize,
    cpu_concurrency_limit: usize,
    request_timeout_ms: u64,
    network: Option<String>,
    rpc_url: Option<String>,
    gateway_url: Option<String>,
    chain_id: Option<String>,
    signer_address: Option<String>,
    public_key: Option<String>,
    debug: bool,
    keys_dir: Option<PathBuf>,
    db_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env(service: Service) -> Self {
        let is_production = env_is_production("APP_ENV") || env_is_production("RUST_ENV");
        let concurrency_limit = env_parse::<usize>("FHEVM_CONCURRENCY_LIMIT")
            .filter(|limit| *limit > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(DEFAULT_CONCURRENCY_LIMIT);
        let body_limit_mb = env_parse::<usize>("FHEVM_BODY_LIMIT_MB").unwrap_or(DEFAULT_BODY_LIMIT_MB);

        Self {
            port: env_parse("PORT").unwrap_or(service.default_port()),
            host: env_parse("HOST").unwrap_or(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
            body_limit_bytes: body_limit_mb.saturating_mul(1024 * 1024),
            internal_token: env_opt("INTERNAL_SERVICE_TOKEN"),
            internal_token_required: is_production || env_flag("INTERNAL_SERVICE_TOKEN_REQUIRED"),
            concurrency_limit,
            cpu_concurrency_limit: env_parse::<usize>("FHEVM_CPU_CONCURRENCY_LIMIT")
                .filter(|limit| *limit > 0)
                .unwrap_or(concurrency_limit),
            request_timeout_ms: env_parse("FHEVM_REQUEST_TIMEOUT_MS")
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            network: env_opt("FHEVM_NETWORK"),
            rpc_url: env_opt("FHEVM_RPC_URL"),
            gateway_url: env_opt("FHEVM_GATEWAY_URL"),
            chain_id: env_opt("FHEVM_CHAIN_ID"),
            signer_address: env_opt("FHEVM_SIGNER_ADDRESS"),
            public_key: env_opt("FHEVM_PUBLIC_KEY"),
            debug: env_flag("FHEVM_DEBUG"),
            keys_dir: Some(env_path("FHEVM_KEYS_DIR", DEFAULT_KEYS_DIR)),
            db_path: Some(env_path("FHEVM_DB_PATH", DEFAULT_DB_PATH)),
        }
    }

    pub fn for_tests() -> Self {
        Self {
            port: 0,
            host: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            body_limit_bytes: DEFAULT_BODY_LIMIT_MB.saturating_mul(1024 * 1024),
            internal_token: None,
            internal_token_required: false,
            concurrency_limit: 32,
            cpu_concurrency_limit: 32,
            request_timeout_ms: DEFAULT_TEST_TIMEOUT_MS,
            network: None,
            rpc_url: None,
            gateway_url: None,
            chain_id: None,
            signer_address: None,
            public_key: None,
            debug: false,
            keys_dir: None,
            db_path: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.internal_token_required && self.internal_token.is_none() {
            return Err(
                "INTERNAL_SERVICE_TOKEN must be set when APP_ENV/RUST_ENV is production \
or INTERNAL_SERVICE_TOKEN_REQUIRED is on"
                    .to_string(),
            );
        }
        self.fhevm_config().map(|_| ())
    }

    /// Client configuration for the API service.
    pub fn fhevm_config(&self) -> Result<FhevmConfig, String> {
        let network = self
            .network
            .as_deref()
            .map(str::parse::<Network>)
            .transpose()
            .map_err(|err| format!("FHEVM_NETWORK: {err}"))?;
        let chain_id = self
            .chain_id
            .as_deref()
            .map(str::parse::<u64>)
            .transpose()
            .map_err(|err| format!("FHEVM_CHAIN_ID: {err}"))?;
        if let Some(signer) = self.signer_address.as_deref() {
            if !is_valid_address(signer) {
                return Err(format!("FHEVM_SIGNER_ADDRESS is not an address: {signer}"));
            }
        }

        Ok(FhevmConfig {
            network,
            rpc_url: self.rpc_url.clone(),
            gateway_url: self.gateway_url.clone(),
            chain_id,
            contract_address: None,
            signer: self.signer_address.clone(),
            debug: self.debug,
            public_key: self.public_key.clone(),
            submit_inputs: true,
            gateway_token: self.internal_token.clone(),
        })
    }

    /// Chain id the gateway binds handles to.
    pub fn gateway_chain_id(&self) -> Result<u64, String> {
        self.fhevm_config().map(|config| config.resolve().chain_id)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn internal_token(&self) -> Option<String> {
        self.internal_token.clone()
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_bytes
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn cpu_concurrency_limit(&self) -> usize {
        self.cpu_concurrency_limit
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn keys_dir(&self) -> Option<PathBuf> {
        self.keys_dir.clone()
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.db_path.clone()
    }

    pub fn with_internal_token(mut self, token: Option<String>) -> Self {
        self.internal_token = token;
        self
    }

    pub fn with_body_limit_bytes(mut self, bytes: usize) -> Self {
        self.body_limit_bytes = bytes;
        self
    }

    pub fn with_network(mut self, network: Option<&str>) -> Self {
        self.network = network.map(str::to_string);
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id.to_string());
        self
    }

    pub fn with_gateway_url(mut self, url: Option<String>) -> Self {
        self.gateway_url = url;
        self
    }

    pub fn with_rpc_url(mut self, url: Option<String>) -> Self {
        self.rpc_url = url;
        self
    }

    pub fn with_signer_address(mut self, signer: Option<String>) -> Self {
        self.signer_address = signer;
        self
    }

    pub fn with_public_key(mut self, public_key: Option<String>) -> Self {
        self.public_key = public_key;
        self
    }

    pub fn with_keys_dir(mut self, keys_dir: Option<PathBuf>) -> Self {
        self.keys_dir = keys_dir;
        self
    }

    pub fn with_db_path(mut self, db_path: Option<PathBuf>) -> Self {
        self.db_path = db_path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_produce_local_client_config() {
        let config = Settings::for_tests().fhevm_config().unwrap();
        let resolved = config.resolve();
        assert_eq!(resolved.chain_id, 31337);
        assert!(config.submit_inputs);
    }

    #[test]
    fn invalid_network_fails_validation() {
        let settings = Settings::for_tests().with_network(Some("moon"));
        assert!(settings.validate().unwrap_err().contains("FHEVM_NETWORK"));
    }

    #[test]
    fn required_token_is_enforced() {
        let mut settings = Settings::for_tests();
        settings.internal_token_required = true;
        assert!(settings.validate().is_err());
        assert!(settings
            .with_internal_token(Some("secret".into()))
            .validate()
            .is_ok());
    }

    #[test]
    fn signer_must_be_an_address() {
        let settings = Settings::for_tests().with_signer_address(Some("alice".into()));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn gateway_chain_follows_network() {
        let settings = Settings::for_tests().with_network(Some("sepolia"));
        assert_eq!(settings.gateway_chain_id().unwrap(), 11_155_111);
    }
}
