/// Monitor configuration module
/// Reads the network, endpoint, watched contract and polling settings from
/// environment variables
use client::rpc::default_endpoint;
use shared::{Address, Network};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_GET_METHOD: &str = "get_contract_data";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Which contract to watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractTarget {
    Address(Address),
    /// Address derived from compiled code and an owner, with a zero counter
    Derived { code_path: PathBuf, owner: Address },
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub network: Network,
    pub endpoint: String,
    pub target: ContractTarget,
    pub get_method: String,
    pub poll_interval: Duration,
}

impl MonitorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = match lookup("TESTNET") {
            Some(flag) if !flag.trim().is_empty() => Network::Testnet,
            _ => Network::Mainnet,
        };

        let endpoint = match network {
            Network::Mainnet => lookup("TON_V4_ENDPOINT_MAINNET"),
            Network::Testnet => lookup("TON_V4_ENDPOINT_TESTNET"),
        }
        .unwrap_or_else(|| default_endpoint(network).to_string());

        let target = match lookup("CONTRACT_ADDRESS") {
            Some(raw) => ContractTarget::Address(parse_address("CONTRACT_ADDRESS", &raw)?),
            None => {
                let code_path = lookup("CONTRACT_CODE_PATH").ok_or_else(|| {
                    ConfigError::MissingEnv("CONTRACT_ADDRESS or CONTRACT_CODE_PATH".to_string())
                })?;
                let owner = lookup("OWNER_ADDRESS")
                    .ok_or_else(|| ConfigError::MissingEnv("OWNER_ADDRESS".to_string()))?;
                ContractTarget::Derived {
                    code_path: PathBuf::from(code_path),
                    owner: parse_address("OWNER_ADDRESS", &owner)?,
                }
            }
        };

        let get_method = lookup("MONITOR_GET_METHOD")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GET_METHOD.to_string());

        let poll_interval_ms = match lookup("MONITOR_POLL_INTERVAL_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidConfig(format!("Invalid poll interval: {} ({})", raw, e))
            })?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };

        // 100 ms to 10 minutes
        if !(100..=600_000).contains(&poll_interval_ms) {
            return Err(ConfigError::InvalidConfig(
                "Poll interval must be between 100 and 600000 milliseconds".to_string(),
            ));
        }

        info!(
            "Monitor configuration loaded: network={}, endpoint={}, get_method={}, poll_interval={}ms",
            network, endpoint, get_method, poll_interval_ms
        );

        Ok(MonitorConfig {
            network,
            endpoint,
            target,
            get_method,
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }
}

fn parse_address(key: &str, raw: &str) -> Result<Address, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::InvalidConfig(format!("Invalid {}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const OWNER: &str = "0QD9jGNwJs3Sv5y1OWNIq_jXxWqrGi8q10zLIB3SZwdak7Nt";

    fn load(vars: &[(&str, &str)]) -> Result<MonitorConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("CONTRACT_ADDRESS", OWNER)]).unwrap();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.endpoint, "https://mainnet-v4.tonhubapi.com");
        assert_eq!(config.get_method, "get_contract_data");
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert!(matches!(config.target, ContractTarget::Address(_)));
    }

    #[test]
    fn test_testnet_flag_and_endpoint_override() {
        let config = load(&[
            ("TESTNET", "1"),
            ("TON_V4_ENDPOINT_TESTNET", "http://localhost:8081"),
            ("CONTRACT_ADDRESS", OWNER),
        ])
        .unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.endpoint, "http://localhost:8081");
    }

    #[test]
    fn test_empty_testnet_flag_means_mainnet() {
        let config = load(&[("TESTNET", ""), ("CONTRACT_ADDRESS", OWNER)]).unwrap();
        assert_eq!(config.network, Network::Mainnet);
    }

    #[test]
    fn test_derived_target() {
        let config = load(&[
            ("CONTRACT_CODE_PATH", "build/main.compiled.json"),
            ("OWNER_ADDRESS", OWNER),
        ])
        .unwrap();
        match config.target {
            ContractTarget::Derived { code_path, owner } => {
                assert_eq!(code_path, PathBuf::from("build/main.compiled.json"));
                assert_eq!(owner, OWNER.parse().unwrap());
            }
            other => panic!("unexpected target: {:?}", other),
        }
    }

    #[test]
    fn test_missing_target() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnv(_))));
        assert!(matches!(
            load(&[("CONTRACT_CODE_PATH", "main.boc")]),
            Err(ConfigError::MissingEnv(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("CONTRACT_ADDRESS", "not-an-address")]),
            Err(ConfigError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[("CONTRACT_ADDRESS", OWNER), ("MONITOR_POLL_INTERVAL_MS", "fast")]),
            Err(ConfigError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[("CONTRACT_ADDRESS", OWNER), ("MONITOR_POLL_INTERVAL_MS", "10")]),
            Err(ConfigError::InvalidConfig(_))
        ));
    }
}
