//! Typed wrapper around the counter contract.
//!
//! Sends are thin: they encode a body and hand it to the provider. Whether the
//! contract accepts the message is only visible in what the provider reports
//! back, so no business rules are checked here.

use crate::error::ClientError;
use crate::provider::{Contract, ContractProvider, InternalMessage, SendMode, Sender};
use shared::{
    contract_address, encode_config, encode_operation, encode_raw_op, Address, Cell, Coins,
    ContractConfig, Operation, StateInit,
};

/// Op code the contract does not understand
pub const WRONG_OP_CODE: u32 = 333;

pub const GET_CONTRACT_DATA: &str = "get_contract_storage_data";
pub const GET_BALANCE: &str = "balance";

/// Result of `get_contract_storage_data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractData {
    pub counter: u32,
    pub recent_sender: Address,
    pub owner_address: Address,
}

/// Result of the `balance` get-method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub amount: Coins,
}

#[derive(Debug, Clone)]
pub struct MainContract {
    address: Address,
    init: Option<StateInit>,
}

impl MainContract {
    /// Handle to an already deployed instance
    pub fn create_from_address(address: Address) -> Self {
        MainContract {
            address,
            init: None,
        }
    }

    /// New instance whose address is derived from its code and initial data
    pub fn create_from_config(
        config: &ContractConfig,
        code: Cell,
        workchain: i8,
    ) -> Result<Self, ClientError> {
        let data = encode_config(config)?;
        let init = StateInit { code, data };
        let address = contract_address(workchain, &init)?;
        Ok(MainContract {
            address,
            init: Some(init),
        })
    }

    fn message(value: Coins, body: Cell) -> InternalMessage {
        InternalMessage {
            value,
            bounce: true,
            send_mode: SendMode::PAY_GAS_SEPARATELY,
            body,
        }
    }

    pub async fn send_deploy<P: ContractProvider>(
        &self,
        provider: &P,
        via: &dyn Sender,
        value: Coins,
    ) -> Result<P::SendOutcome, ClientError> {
        Ok(provider
            .internal(via, Self::message(value, Cell::empty()))
            .await?)
    }

    pub async fn send_increment<P: ContractProvider>(
        &self,
        provider: &P,
        via: &dyn Sender,
        value: Coins,
        increment_by: u32,
    ) -> Result<P::SendOutcome, ClientError> {
        let body = encode_operation(&Operation::Increment {
            amount: increment_by,
        })?;
        Ok(provider.internal(via, Self::message(value, body)).await?)
    }

    pub async fn send_deposit<P: ContractProvider>(
        &self,
        provider: &P,
        via: &dyn Sender,
        value: Coins,
    ) -> Result<P::SendOutcome, ClientError> {
        let body = encode_operation(&Operation::Deposit)?;
        Ok(provider.internal(via, Self::message(value, body)).await?)
    }

    /// Value transfer with an empty body
    pub async fn send_deposit_without_op<P: ContractProvider>(
        &self,
        provider: &P,
        via: &dyn Sender,
        value: Coins,
    ) -> Result<P::SendOutcome, ClientError> {
        Ok(provider
            .internal(via, Self::message(value, Cell::empty()))
            .await?)
    }

    pub async fn send_deposit_with_wrong_op<P: ContractProvider>(
        &self,
        provider: &P,
        via: &dyn Sender,
        value: Coins,
    ) -> Result<P::SendOutcome, ClientError> {
        let body = encode_raw_op(WRONG_OP_CODE)?;
        Ok(provider.internal(via, Self::message(value, body)).await?)
    }

    pub async fn send_withdrawal_request<P: ContractProvider>(
        &self,
        provider: &P,
        via: &dyn Sender,
        value: Coins,
        amount: Coins,
    ) -> Result<P::SendOutcome, ClientError> {
        let body = encode_operation(&Operation::Withdraw { amount })?;
        Ok(provider.internal(via, Self::message(value, body)).await?)
    }

    pub async fn get_contract_data<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<ContractData, ClientError> {
        let result = provider.get(GET_CONTRACT_DATA, Vec::new()).await?;
        let mut reader = result.reader(GET_CONTRACT_DATA)?;

        let counter = reader.read_int()?;
        let counter = u32::try_from(counter).map_err(|_| ClientError::UnexpectedReturnShape {
            method: GET_CONTRACT_DATA.to_string(),
            index: 0,
            expected: "uint32",
            found: counter.to_string(),
        })?;
        let recent_sender = reader.read_address()?;
        let owner_address = reader.read_address()?;
        reader.finish()?;

        Ok(ContractData {
            counter,
            recent_sender,
            owner_address,
        })
    }

    pub async fn get_balance<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<Balance, ClientError> {
        let result = provider.get(GET_BALANCE, Vec::new()).await?;
        let mut reader = result.reader(GET_BALANCE)?;

        let amount = reader.read_int()?;
        let amount = u128::try_from(amount).map_err(|_| ClientError::UnexpectedReturnShape {
            method: GET_BALANCE.to_string(),
            index: 0,
            expected: "non-negative int",
            found: amount.to_string(),
        })?;
        reader.finish()?;

        Ok(Balance {
            amount: Coins::from_nano(amount),
        })
    }
}

impl Contract for MainContract {
    fn address(&self) -> Address {
        self.address
    }

    fn init(&self) -> Option<&StateInit> {
        self.init.as_ref()
    }
}
