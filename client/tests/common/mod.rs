//! Stand-in for the on-chain counter contract, run by the sandbox.

use anyhow::Result;
use client::{GetMethodResult, MainContract, SendMode, TupleItem};
use sandbox::executor::{EXIT_CELL_UNDERFLOW, EXIT_METHOD_NOT_FOUND};
use sandbox::{
    Blockchain, ContractExecutor, ExecutionContext, ExecutionResult, GetMethodContext,
    OutMessage, SandboxProvider, TreasurySender,
};
use shared::{
    decode_config, decode_operation, encode_config, Address, Cell, CellBuilder, CodecError,
    Coins, ContractConfig, Operation,
};
use std::sync::Arc;

pub const EXIT_MISSING_OP: i32 = 35;
pub const EXIT_UNAUTHORIZED: i32 = 103;
pub const EXIT_INSUFFICIENT_BALANCE: i32 = 104;
pub const EXIT_UNKNOWN_OP: i32 = 777;

/// Kept on the contract after any withdrawal
pub const MIN_TONS_FOR_STORAGE: Coins = Coins::from_nano(10_000_000);

pub struct CounterContractModel;

impl CounterContractModel {
    fn handle(ctx: &ExecutionContext, data: &Cell, body: &Cell) -> Result<ExecutionResult, i32> {
        let mut config = decode_config(data).map_err(|_| EXIT_CELL_UNDERFLOW)?;
        let op = decode_operation(body).map_err(|e| match e {
            CodecError::MissingOpCode => EXIT_MISSING_OP,
            CodecError::UnknownOpCode(_) => EXIT_UNKNOWN_OP,
            _ => EXIT_CELL_UNDERFLOW,
        })?;

        match op {
            Operation::Increment { amount } => {
                config.counter = config.counter.wrapping_add(amount);
                config.recent_sender = ctx.sender;
                let data = encode_config(&config).map_err(|_| EXIT_CELL_UNDERFLOW)?;
                Ok(ExecutionResult::success(Some(data), Vec::new()))
            }
            Operation::Deposit => Ok(ExecutionResult::success(None, Vec::new())),
            Operation::Withdraw { amount } => {
                if ctx.sender != config.owner_address {
                    return Err(EXIT_UNAUTHORIZED);
                }
                if ctx.balance < amount {
                    return Err(EXIT_INSUFFICIENT_BALANCE);
                }
                let value = amount.min(ctx.balance.saturating_sub(MIN_TONS_FOR_STORAGE));
                Ok(ExecutionResult::success(
                    None,
                    vec![OutMessage {
                        to: ctx.sender,
                        value,
                        mode: SendMode::PAY_GAS_SEPARATELY,
                        bounce: false,
                        body: Cell::empty(),
                    }],
                ))
            }
        }
    }
}

fn address_slice(address: &Address) -> TupleItem {
    let mut b = CellBuilder::new();
    b.store_address(address).unwrap();
    TupleItem::Slice(b.build())
}

impl ContractExecutor for CounterContractModel {
    fn on_internal(&self, ctx: &ExecutionContext, data: &Cell, body: &Cell) -> ExecutionResult {
        if ctx.bounced {
            return ExecutionResult::success(None, Vec::new());
        }
        Self::handle(ctx, data, body).unwrap_or_else(ExecutionResult::failure)
    }

    fn run_get_method(
        &self,
        ctx: &GetMethodContext,
        data: &Cell,
        method: &str,
        _: &[TupleItem],
    ) -> GetMethodResult {
        let Ok(config) = decode_config(data) else {
            return GetMethodResult {
                exit_code: EXIT_CELL_UNDERFLOW,
                stack: Vec::new(),
            };
        };
        let stack = match method {
            "get_contract_storage_data" => vec![
                TupleItem::Int(config.counter as i128),
                address_slice(&config.recent_sender),
                address_slice(&config.owner_address),
            ],
            "get_contract_data" => vec![
                address_slice(&config.recent_sender),
                TupleItem::Int(config.counter as i128),
            ],
            "balance" => vec![TupleItem::Int(ctx.balance.as_nano() as i128)],
            _ => {
                return GetMethodResult {
                    exit_code: EXIT_METHOD_NOT_FOUND,
                    stack: Vec::new(),
                }
            }
        };
        GetMethodResult {
            exit_code: 0,
            stack,
        }
    }
}

/// Code cell the stand-in executor is registered under
pub fn counter_code() -> Cell {
    let mut b = CellBuilder::new();
    b.store_bytes(b"counter-contract").unwrap();
    b.build()
}

pub struct TestEnv {
    pub blockchain: Blockchain,
    pub owner: TreasurySender,
    pub sender: TreasurySender,
    pub contract: MainContract,
    pub provider: SandboxProvider,
}

/// Fresh chain with owner and sender treasuries and an undeployed contract
pub async fn setup() -> Result<TestEnv> {
    let blockchain = Blockchain::create();
    let owner = blockchain.treasury("contract owner").await?;
    let sender = blockchain.treasury("sender").await?;

    let code = counter_code();
    blockchain
        .register_code(&code, Arc::new(CounterContractModel))
        .await;

    let contract = MainContract::create_from_config(
        &ContractConfig {
            counter: 0,
            recent_sender: owner.address(),
            owner_address: owner.address(),
        },
        code,
        0,
    )?;
    let provider = blockchain.open_contract(&contract);

    Ok(TestEnv {
        blockchain,
        owner,
        sender,
        contract,
        provider,
    })
}
