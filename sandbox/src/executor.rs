//! Contract behaviour plugged into the emulator, keyed by code hash.

use client::{GetMethodResult, SendMode, TupleItem};
use shared::{Address, Cell, Coins};

/// Compute-phase exit code for a cell underflow
pub const EXIT_CELL_UNDERFLOW: i32 = 9;

/// Exit code returned when a get-method does not exist
pub const EXIT_METHOD_NOT_FOUND: i32 = 11;

/// What an executor sees while handling one inbound internal message
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub myself: Address,
    pub sender: Address,
    pub value: Coins,
    /// Account balance with the inbound value already credited
    pub balance: Coins,
    pub bounced: bool,
    pub now: u32,
    pub lt: u64,
}

#[derive(Debug, Clone)]
pub struct GetMethodContext {
    pub myself: Address,
    pub balance: Coins,
    pub now: u32,
}

/// Message the contract asks to send when it finishes successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutMessage {
    pub to: Address,
    pub value: Coins,
    pub mode: SendMode,
    pub bounce: bool,
    pub body: Cell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// New persistent data; `None` keeps the current data
    pub data: Option<Cell>,
    pub out_messages: Vec<OutMessage>,
}

impl ExecutionResult {
    pub fn success(data: Option<Cell>, out_messages: Vec<OutMessage>) -> Self {
        ExecutionResult {
            exit_code: 0,
            data,
            out_messages,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        ExecutionResult {
            exit_code,
            data: None,
            out_messages: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0 || self.exit_code == 1
    }
}

/// Behaviour of a contract's code inside the emulator
pub trait ContractExecutor: Send + Sync {
    fn on_internal(&self, ctx: &ExecutionContext, data: &Cell, body: &Cell) -> ExecutionResult;

    fn run_get_method(
        &self,
        ctx: &GetMethodContext,
        data: &Cell,
        method: &str,
        args: &[TupleItem],
    ) -> GetMethodResult;
}

/// Wallet behaviour of treasury accounts: accepts every message
pub(crate) struct AcceptingWallet;

impl ContractExecutor for AcceptingWallet {
    fn on_internal(&self, _: &ExecutionContext, _: &Cell, _: &Cell) -> ExecutionResult {
        ExecutionResult::success(None, Vec::new())
    }

    fn run_get_method(
        &self,
        _: &GetMethodContext,
        _: &Cell,
        method: &str,
        _: &[TupleItem],
    ) -> GetMethodResult {
        match method {
            "seqno" => GetMethodResult {
                exit_code: 0,
                stack: vec![TupleItem::Int(0)],
            },
            _ => GetMethodResult {
                exit_code: EXIT_METHOD_NOT_FOUND,
                stack: Vec::new(),
            },
        }
    }
}
