use async_trait::async_trait;
use client::{ContractState, GetMethodResult, RpcError, TonClient4};
use shared::Address;

/// Read access to chain state needed by the monitor
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn latest_seqno(&self) -> Result<u32, RpcError>;

    async fn account_state(&self, seqno: u32, address: &Address) -> Result<ContractState, RpcError>;

    async fn run_get_method(
        &self,
        seqno: u32,
        address: &Address,
        method: &str,
    ) -> Result<GetMethodResult, RpcError>;
}

#[async_trait]
impl StateSource for TonClient4 {
    async fn latest_seqno(&self) -> Result<u32, RpcError> {
        Ok(self.get_last_block().await?.seqno)
    }

    async fn account_state(&self, seqno: u32, address: &Address) -> Result<ContractState, RpcError> {
        self.get_account(seqno, address).await
    }

    async fn run_get_method(
        &self,
        seqno: u32,
        address: &Address,
        method: &str,
    ) -> Result<GetMethodResult, RpcError> {
        self.run_method(seqno, address, method).await
    }
}
