use crate::error::ProviderError;
use crate::provider::{
    ContractProvider, ContractState, GetMethodResult, InternalMessage, Sender, SenderArguments,
    TupleItem,
};
use crate::rpc::{RpcError, TonClient4};
use async_trait::async_trait;
use shared::{Address, StateInit};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Contract provider backed by the live network
pub struct NetworkProvider {
    client: Arc<TonClient4>,
    address: Address,
    init: Option<StateInit>,
}

impl NetworkProvider {
    pub fn new(client: Arc<TonClient4>, address: Address, init: Option<StateInit>) -> Self {
        NetworkProvider {
            client,
            address,
            init,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl ContractProvider for NetworkProvider {
    type SendOutcome = ();

    async fn get_state(&self) -> Result<ContractState, ProviderError> {
        let block = self.client.get_last_block().await?;
        Ok(self.client.get_account(block.seqno, &self.address).await?)
    }

    async fn get(&self, method: &str, args: Vec<TupleItem>) -> Result<GetMethodResult, ProviderError> {
        if !args.is_empty() {
            return Err(ProviderError::Unsupported(format!(
                "get-method {} called with {} arguments",
                method,
                args.len()
            )));
        }
        let block = self.client.get_last_block().await?;
        debug!("Running {} on {} at block {}", method, self.address, block.seqno);
        Ok(self.client.run_method(block.seqno, &self.address, method).await?)
    }

    async fn internal(
        &self,
        via: &dyn Sender,
        message: InternalMessage,
    ) -> Result<(), ProviderError> {
        // the state init only travels until the account is active
        let init = match &self.init {
            Some(init) if !self.get_state().await?.is_active() => Some(init.clone()),
            _ => None,
        };

        via.send(SenderArguments {
            to: self.address,
            value: message.value,
            bounce: message.bounce,
            send_mode: message.send_mode,
            init,
            body: message.body,
        })
        .await
    }
}

/// Poll until the account at `address` is active.
///
/// Transient transport failures are logged and retried; running out of
/// attempts is a `DeployTimeout`.
pub async fn wait_for_deploy<P: ContractProvider>(
    provider: &P,
    address: Address,
    attempts: u32,
    interval: Duration,
) -> Result<(), ProviderError> {
    for attempt in 1..=attempts {
        match provider.get_state().await {
            Ok(state) if state.is_active() => {
                info!("Contract deployed at address {}", address);
                return Ok(());
            }
            Ok(_) => debug!("Awaiting deployment of {} ({}/{})", address, attempt, attempts),
            Err(ProviderError::Rpc(e)) if is_transient(&e) => {
                warn!("Deployment check {}/{} failed: {}", attempt, attempts, e);
            }
            Err(e) => return Err(e),
        }
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(ProviderError::DeployTimeout { address, attempts })
}

/// Whether an RPC failure is worth another attempt
pub fn is_transient(error: &RpcError) -> bool {
    matches!(error, RpcError::Timeout | RpcError::RequestFailed(_))
}
