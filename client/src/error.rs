use crate::rpc::RpcError;
use shared::{Address, CodecError};
use thiserror::Error;

/// Failures of the transport underneath a contract
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Account {0} is not active")]
    AccountNotActive(Address),
    #[error("No executor registered for code hash {0}")]
    UnknownCode(String),
    #[error("Insufficient funds on {address}: {needed} needed, {available} available")]
    InsufficientFunds {
        address: Address,
        needed: String,
        available: String,
    },
    #[error("Wallet error: {0}")]
    Wallet(String),
    #[error("Contract {address} was not deployed after {attempts} attempts")]
    DeployTimeout { address: Address, attempts: u32 },
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Failures surfaced by the typed contract operations
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Get-method {method} failed with exit code {exit_code}")]
    GetMethodFailed { method: String, exit_code: i32 },
    #[error("Unexpected return shape from {method} at index {index}: expected {expected}, found {found}")]
    UnexpectedReturnShape {
        method: String,
        index: usize,
        expected: &'static str,
        found: String,
    },
}
