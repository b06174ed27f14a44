use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network the contract is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Whether user-friendly addresses should carry the test-only flag
    pub fn is_test_only(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            _ => Err(format!(
                "Invalid network: {}. Allowed values: mainnet, testnet",
                s
            )),
        }
    }
}

/// Initial storage of the counter contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    pub counter: u32,
    pub recent_sender: Address,
    pub owner_address: Address,
}

/// Message body understood by the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Increment { amount: u32 },
    Deposit,
    Withdraw { amount: crate::coins::Coins },
}

impl Operation {
    pub fn op_code(&self) -> u32 {
        match self {
            Operation::Increment { .. } => crate::codec::OP_INCREMENT,
            Operation::Deposit => crate::codec::OP_DEPOSIT,
            Operation::Withdraw { .. } => crate::codec::OP_WITHDRAW,
        }
    }
}
