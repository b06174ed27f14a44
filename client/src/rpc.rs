/// HTTP client for the TON v4 block API
/// Fetches the latest block, account states and get-method results and
/// submits external messages
use crate::provider::{AccountStatus, ContractState, GetMethodResult, TupleItem};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::{boc, Address, Cell, Coins, Network};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

pub const MAINNET_V4_ENDPOINT: &str = "https://mainnet-v4.tonhubapi.com";
pub const TESTNET_V4_ENDPOINT: &str = "https://testnet-v4.tonhubapi.com";

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("RPC returned error: {0}")]
    RpcError(String),
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
    #[error("Network timeout")]
    Timeout,
}

/// Default v4 endpoint for a network
pub fn default_endpoint(network: Network) -> &'static str {
    match network {
        Network::Mainnet => MAINNET_V4_ENDPOINT,
        Network::Testnet => TESTNET_V4_ENDPOINT,
    }
}

/// Latest masterchain block reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub seqno: u32,
}

#[derive(Debug, Deserialize)]
struct LatestBlockResponse {
    last: LastBlock,
}

#[derive(Debug, Deserialize)]
struct LastBlock {
    seqno: u32,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: RawAccount,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    state: RawAccountState,
    balance: RawBalance,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    coins: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawAccountState {
    Uninit,
    Active {
        code: Option<String>,
        data: Option<String>,
    },
    Frozen,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunMethodResponse {
    exit_code: i32,
    #[serde(default)]
    result: Option<Vec<RawStackItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawStackItem {
    Null,
    Nan,
    Int { value: String },
    Cell { cell: String },
    Slice { cell: String },
    Builder { cell: String },
    Tuple { items: Vec<RawStackItem> },
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    status: i32,
}

/// TON v4 API client
pub struct TonClient4 {
    endpoint: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl TonClient4 {
    /// Create new v4 client
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, Duration::from_secs(30))
    }

    pub fn with_timeout(endpoint: impl Into<String>, request_timeout: Duration) -> Self {
        let client = reqwest::ClientBuilder::new()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        TonClient4 {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
            request_timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, RpcError> {
        debug!("Fetching {} from {}", what, url);

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::RpcError(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        response.json().await.map_err(|e| {
            error!("Failed to parse {} response: {}", what, e);
            RpcError::InvalidResponse(format!("Failed to parse {} response: {}", what, e))
        })
    }

    /// Fetch the latest masterchain block
    pub async fn get_last_block(&self) -> Result<BlockRef, RpcError> {
        let url = format!("{}/block/latest", self.endpoint);
        let data: LatestBlockResponse = self.get_json(&url, "latest block").await?;
        Ok(BlockRef {
            seqno: data.last.seqno,
        })
    }

    /// Fetch an account's balance and state at a block
    pub async fn get_account(&self, seqno: u32, address: &Address) -> Result<ContractState, RpcError> {
        let url = format!("{}/block/{}/{}", self.endpoint, seqno, address);
        let data: AccountResponse = self.get_json(&url, "account").await?;

        let balance = data
            .account
            .balance
            .coins
            .parse::<u128>()
            .map(Coins::from_nano)
            .map_err(|e| RpcError::InvalidResponse(format!("Invalid balance: {}", e)))?;

        let status = match data.account.state {
            RawAccountState::Uninit => AccountStatus::Uninit,
            RawAccountState::Frozen => AccountStatus::Frozen,
            RawAccountState::Active { code, data } => AccountStatus::Active {
                code: code.as_deref().map(decode_cell).transpose()?,
                data: data.as_deref().map(decode_cell).transpose()?,
            },
        };

        Ok(ContractState { balance, status })
    }

    /// Run an argument-less get-method against an account at a block
    pub async fn run_method(
        &self,
        seqno: u32,
        address: &Address,
        method: &str,
    ) -> Result<GetMethodResult, RpcError> {
        let url = format!("{}/block/{}/{}/run/{}", self.endpoint, seqno, address, method);
        let data: RunMethodResponse = self.get_json(&url, "get-method").await?;

        let stack = data
            .result
            .unwrap_or_default()
            .into_iter()
            .map(convert_stack_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GetMethodResult {
            exit_code: data.exit_code,
            stack,
        })
    }

    /// Submit a serialized external message
    pub async fn send_message(&self, message: &[u8]) -> Result<(), RpcError> {
        let url = format!("{}/send", self.endpoint);
        debug!("Sending {} byte message to {}", message.len(), url);

        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&serde_json::json!({ "boc": STANDARD.encode(message) }))
            .send()
            .await
            .map_err(|e| {
                warn!("Message submission failed: {}", e);
                map_request_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::RpcError(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let data: SendResponse = response.json().await.map_err(|e| {
            RpcError::InvalidResponse(format!("Failed to parse send response: {}", e))
        })?;
        if data.status != 1 {
            return Err(RpcError::RpcError(format!(
                "Message rejected with status {}",
                data.status
            )));
        }
        Ok(())
    }
}

fn map_request_error(e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        RpcError::Timeout
    } else {
        RpcError::RequestFailed(e.to_string())
    }
}

fn decode_cell(encoded: &str) -> Result<Cell, RpcError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| RpcError::InvalidResponse(format!("Invalid base64 cell: {}", e)))?;
    boc::deserialize_single(&bytes)
        .map_err(|e| RpcError::InvalidResponse(format!("Invalid cell: {}", e)))
}

fn convert_stack_item(item: RawStackItem) -> Result<TupleItem, RpcError> {
    Ok(match item {
        RawStackItem::Null => TupleItem::Null,
        RawStackItem::Nan => TupleItem::Nan,
        RawStackItem::Int { value } => TupleItem::Int(
            value
                .parse()
                .map_err(|e| RpcError::InvalidResponse(format!("Invalid int {}: {}", value, e)))?,
        ),
        RawStackItem::Cell { cell } => TupleItem::Cell(decode_cell(&cell)?),
        RawStackItem::Slice { cell } => TupleItem::Slice(decode_cell(&cell)?),
        RawStackItem::Builder { cell } => TupleItem::Builder(decode_cell(&cell)?),
        RawStackItem::Tuple { items } => TupleItem::Tuple(
            items
                .into_iter()
                .map(convert_stack_item)
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use shared::CellBuilder;

    fn owner() -> Address {
        "0:fd8c637026cdd2bf9cb5396348abf8d7c56aab1a2f2ad74ccb201dd267075a93"
            .parse()
            .unwrap()
    }

    fn address_boc(address: &Address) -> String {
        let mut b = CellBuilder::new();
        b.store_address(address).unwrap();
        STANDARD.encode(boc::serialize(&b.build()))
    }

    #[test]
    fn test_client_creation() {
        let client = TonClient4::new("https://testnet-v4.tonhubapi.com/");
        assert_eq!(client.endpoint(), TESTNET_V4_ENDPOINT);
        assert_eq!(default_endpoint(Network::Mainnet), MAINNET_V4_ENDPOINT);
    }

    #[tokio::test]
    async fn test_get_last_block() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/block/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"last":{"seqno":1234,"workchain":-1,"shard":"-9223372036854775808"},"now":1700000000}"#)
            .create_async()
            .await;

        let client = TonClient4::new(server.url());
        let block = client.get_last_block().await.unwrap();
        assert_eq!(block.seqno, 1234);
    }

    #[tokio::test]
    async fn test_get_account_active() {
        let mut server = Server::new_async().await;
        let code = STANDARD.encode(boc::serialize(&Cell::empty()));
        let body = format!(
            r#"{{"account":{{"state":{{"type":"active","code":"{code}","data":null}},"balance":{{"coins":"50000000"}}}}}}"#
        );
        let path = format!("/block/7/{}", owner());
        let _m = server
            .mock("GET", path.as_str())
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = TonClient4::new(server.url());
        let state = client.get_account(7, &owner()).await.unwrap();
        assert!(state.is_active());
        assert_eq!(state.balance, Coins::from_nano(50_000_000));
        assert_eq!(
            state.status,
            AccountStatus::Active {
                code: Some(Cell::empty()),
                data: None
            }
        );
    }

    #[tokio::test]
    async fn test_get_account_uninit() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", Matcher::Regex(r"^/block/7/.+$".to_string()))
            .with_status(200)
            .with_body(r#"{"account":{"state":{"type":"uninit"},"balance":{"coins":"0"}}}"#)
            .create_async()
            .await;

        let client = TonClient4::new(server.url());
        let state = client.get_account(7, &owner()).await.unwrap();
        assert!(!state.is_active());
        assert_eq!(state.status, AccountStatus::Uninit);
    }

    #[tokio::test]
    async fn test_run_method_parses_stack() {
        let mut server = Server::new_async().await;
        let body = format!(
            r#"{{"exitCode":0,"result":[{{"type":"slice","cell":"{}"}},{{"type":"int","value":"15"}}]}}"#,
            address_boc(&owner())
        );
        let path = format!("/block/7/{}/run/get_contract_data", owner());
        let _m = server
            .mock("GET", path.as_str())
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = TonClient4::new(server.url());
        let result = client
            .run_method(7, &owner(), "get_contract_data")
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        let mut reader = result.reader("get_contract_data").unwrap();
        assert_eq!(reader.read_address().unwrap(), owner());
        assert_eq!(reader.read_int().unwrap(), 15);
    }

    #[tokio::test]
    async fn test_run_method_keeps_exit_code() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"exitCode":11,"result":null}"#)
            .create_async()
            .await;

        let client = TonClient4::new(server.url());
        let result = client.run_method(7, &owner(), "missing").await.unwrap();
        assert_eq!(result.exit_code, 11);
        assert!(result.stack.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/block/latest")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = TonClient4::new(server.url());
        match client.get_last_block().await {
            Err(RpcError::RpcError(msg)) => assert!(msg.contains("502")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/block/latest")
            .with_status(200)
            .with_body(r#"{"unexpected":true}"#)
            .create_async()
            .await;

        let client = TonClient4::new(server.url());
        assert!(matches!(
            client.get_last_block().await,
            Err(RpcError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_send_message_posts_base64_boc() {
        let mut server = Server::new_async().await;
        let payload = boc::serialize(&Cell::empty());
        let _m = server
            .mock("POST", "/send")
            .match_body(Matcher::Json(
                serde_json::json!({ "boc": STANDARD.encode(&payload) }),
            ))
            .with_status(200)
            .with_body(r#"{"status":1}"#)
            .expect(1)
            .create_async()
            .await;

        let client = TonClient4::new(server.url());
        client.send_message(&payload).await.unwrap();
        _m.assert_async().await;
    }
}
