use anyhow::{anyhow, Context, Result};
use client::rpc::default_endpoint;
use serde::Deserialize;
use shared::Network;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".main-contract.toml";

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    network: Option<String>,
    endpoint: Option<String>,
}

/// Where the network choice and endpoint override come from
pub struct ConfigSources {
    pub config_file: Option<PathBuf>,
    pub testnet_flag: Option<String>,
}

impl ConfigSources {
    pub fn from_env() -> Self {
        ConfigSources {
            config_file: config_file_path(),
            testnet_flag: std::env::var("TESTNET").ok(),
        }
    }
}

pub fn parse_network(raw: &str) -> Result<Network> {
    raw.parse::<Network>().map_err(|e| anyhow!(e))
}

pub fn resolve_network(cli_flag: Option<String>, sources: &ConfigSources) -> Result<Network> {
    // 1. CLI Flag
    if let Some(net_str) = cli_flag {
        return parse_network(&net_str);
    }

    // 2. Config File
    if let Some(net_str) = read_config(sources.config_file.as_deref())?.network {
        return parse_network(&net_str);
    }

    // 3. TESTNET environment flag
    if let Some(flag) = &sources.testnet_flag {
        if !flag.trim().is_empty() {
            return Ok(Network::Testnet);
        }
    }

    // 4. Default
    Ok(Network::Testnet)
}

/// Endpoint from the flag, then the config file, then the per-network env override
pub fn resolve_endpoint(
    cli_flag: Option<String>,
    network: Network,
    sources: &ConfigSources,
) -> Result<String> {
    if let Some(endpoint) = cli_flag {
        return Ok(endpoint);
    }
    if let Some(endpoint) = read_config(sources.config_file.as_deref())?.endpoint {
        return Ok(endpoint);
    }
    let key = match network {
        Network::Mainnet => "TON_V4_ENDPOINT_MAINNET",
        Network::Testnet => "TON_V4_ENDPOINT_TESTNET",
    };
    Ok(std::env::var(key).unwrap_or_else(|_| default_endpoint(network).to_string()))
}

fn read_config(path: Option<&Path>) -> Result<ConfigFile> {
    let Some(config_path) = path else {
        return Ok(ConfigFile::default());
    };
    if !config_path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file at {:?}", config_path))?;
    toml::from_str(&content).with_context(|| "Failed to parse config file")
}

fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(CONFIG_FILE_NAME);
        p
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sources(file: Option<&NamedTempFile>, testnet: Option<&str>) -> ConfigSources {
        ConfigSources {
            config_file: file.map(|f| f.path().to_path_buf()),
            testnet_flag: testnet.map(str::to_string),
        }
    }

    fn config_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!(parse_network("mainnet").unwrap(), Network::Mainnet);
        assert_eq!(parse_network("Testnet").unwrap(), Network::Testnet);
        let err = parse_network("futurenet").unwrap_err();
        assert!(err.to_string().contains("Invalid network"));
    }

    #[test]
    fn test_flag_wins_over_config_file() {
        let file = config_with("network = \"testnet\"\n");
        let network =
            resolve_network(Some("mainnet".to_string()), &sources(Some(&file), None)).unwrap();
        assert_eq!(network, Network::Mainnet);
    }

    #[test]
    fn test_config_file_wins_over_env_flag() {
        let file = config_with("network = \"mainnet\"\n");
        let network = resolve_network(None, &sources(Some(&file), Some("1"))).unwrap();
        assert_eq!(network, Network::Mainnet);
    }

    #[test]
    fn test_defaults_to_testnet() {
        assert_eq!(
            resolve_network(None, &sources(None, None)).unwrap(),
            Network::Testnet
        );
        assert_eq!(
            resolve_network(None, &sources(None, Some(""))).unwrap(),
            Network::Testnet
        );
    }

    #[test]
    fn test_missing_config_file_is_ignored() {
        let sources = ConfigSources {
            config_file: Some(PathBuf::from("/nonexistent/.main-contract.toml")),
            testnet_flag: None,
        };
        assert_eq!(resolve_network(None, &sources).unwrap(), Network::Testnet);
    }

    #[test]
    fn test_malformed_config_file() {
        let file = config_with("network = [");
        assert!(resolve_network(None, &sources(Some(&file), None)).is_err());
    }

    #[test]
    fn test_endpoint_resolution() {
        let file = config_with("endpoint = \"http://localhost:8081\"\n");
        let endpoint = resolve_endpoint(
            Some("http://localhost:9000".to_string()),
            Network::Testnet,
            &sources(Some(&file), None),
        )
        .unwrap();
        assert_eq!(endpoint, "http://localhost:9000");

        let endpoint =
            resolve_endpoint(None, Network::Testnet, &sources(Some(&file), None)).unwrap();
        assert_eq!(endpoint, "http://localhost:8081");
    }
}
