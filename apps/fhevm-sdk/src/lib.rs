//! FHEVM SDK
//!
//! Typed FHE encryption and gateway decryption for FHEVM contracts, contract
//! call marshaling over Ethereum JSON-RPC, and two HTTP services built on
//! them: the `fhevm-api` envelope routes and a development `fhevm-gateway`.

pub mod abi;
pub mod app;
pub mod auth;
pub mod bindings;
pub mod client;
pub mod contract;
pub mod crypto;
pub mod decryption;
pub mod eip712;
pub mod error;
pub mod gateway;
pub mod keccak;
pub mod routes;
pub mod rpc;
pub mod settings;
pub mod storage;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod validation;

pub use client::{FhevmClient, FhevmConfig};
pub use error::{FhevmError, FhevmResult};
pub use types::{ClearValue, EncryptedHandle, EncryptedValue, FheType, Handle, Network};
