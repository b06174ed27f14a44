//! Capabilities a contract wrapper is driven through: a `Sender` that can
//! submit value-bearing messages and a `ContractProvider` bound to one
//! contract address.

use crate::error::{ClientError, ProviderError};
use async_trait::async_trait;
use shared::{Address, Cell, Coins, StateInit};
use std::ops::BitOr;

/// Outbound message mode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendMode(pub u8);

impl SendMode {
    pub const NONE: SendMode = SendMode(0);
    pub const PAY_GAS_SEPARATELY: SendMode = SendMode(1);
    pub const IGNORE_ERRORS: SendMode = SendMode(2);
    pub const CARRY_ALL_REMAINING_INCOMING_VALUE: SendMode = SendMode(64);
    pub const CARRY_ALL_REMAINING_BALANCE: SendMode = SendMode(128);

    pub fn contains(&self, flag: SendMode) -> bool {
        self.0 & flag.0 == flag.0
    }
}

impl BitOr for SendMode {
    type Output = SendMode;

    fn bitor(self, rhs: SendMode) -> SendMode {
        SendMode(self.0 | rhs.0)
    }
}

/// Everything a sender needs to deliver one internal message
#[derive(Debug, Clone)]
pub struct SenderArguments {
    pub to: Address,
    pub value: Coins,
    pub bounce: bool,
    pub send_mode: SendMode,
    pub init: Option<StateInit>,
    pub body: Cell,
}

/// An account able to submit value-bearing messages
#[async_trait]
pub trait Sender: Send + Sync {
    fn address(&self) -> Option<Address>;

    async fn send(&self, args: SenderArguments) -> Result<(), ProviderError>;
}

/// Message a provider forwards to its contract through a sender
#[derive(Debug, Clone)]
pub struct InternalMessage {
    pub value: Coins,
    pub bounce: bool,
    pub send_mode: SendMode,
    pub body: Cell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountStatus {
    Uninit,
    Active {
        code: Option<Cell>,
        data: Option<Cell>,
    },
    Frozen,
}

/// Snapshot of an account as seen by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractState {
    pub balance: Coins,
    pub status: AccountStatus,
}

impl ContractState {
    pub fn is_active(&self) -> bool {
        matches!(self.status, AccountStatus::Active { .. })
    }
}

/// TVM stack entry returned by get-methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleItem {
    Null,
    Nan,
    Int(i128),
    Cell(Cell),
    Slice(Cell),
    Builder(Cell),
    Tuple(Vec<TupleItem>),
}

impl TupleItem {
    pub fn kind(&self) -> &'static str {
        match self {
            TupleItem::Null => "null",
            TupleItem::Nan => "nan",
            TupleItem::Int(_) => "int",
            TupleItem::Cell(_) => "cell",
            TupleItem::Slice(_) => "slice",
            TupleItem::Builder(_) => "builder",
            TupleItem::Tuple(_) => "tuple",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMethodResult {
    pub exit_code: i32,
    pub stack: Vec<TupleItem>,
}

impl GetMethodResult {
    /// Positional reader over the stack; a non-zero exit code is an error
    pub fn reader(self, method: &str) -> Result<TupleReader, ClientError> {
        if self.exit_code != 0 {
            return Err(ClientError::GetMethodFailed {
                method: method.to_string(),
                exit_code: self.exit_code,
            });
        }
        Ok(TupleReader::new(method, self.stack))
    }
}

/// Reads get-method results in order, checking each entry's tag
#[derive(Debug)]
pub struct TupleReader {
    method: String,
    items: std::vec::IntoIter<TupleItem>,
    index: usize,
}

impl TupleReader {
    pub fn new(method: &str, items: Vec<TupleItem>) -> Self {
        TupleReader {
            method: method.to_string(),
            items: items.into_iter(),
            index: 0,
        }
    }

    fn mismatch(&self, expected: &'static str, found: Option<&TupleItem>) -> ClientError {
        ClientError::UnexpectedReturnShape {
            method: self.method.clone(),
            index: self.index,
            expected,
            found: found.map(|i| i.kind()).unwrap_or("nothing").to_string(),
        }
    }

    pub fn read_int(&mut self) -> Result<i128, ClientError> {
        match self.items.next() {
            Some(TupleItem::Int(v)) => {
                self.index += 1;
                Ok(v)
            }
            other => Err(self.mismatch("int", other.as_ref())),
        }
    }

    pub fn read_cell(&mut self) -> Result<Cell, ClientError> {
        match self.items.next() {
            Some(TupleItem::Cell(c)) | Some(TupleItem::Slice(c)) | Some(TupleItem::Builder(c)) => {
                self.index += 1;
                Ok(c)
            }
            other => Err(self.mismatch("cell", other.as_ref())),
        }
    }

    /// Read a slice holding a standard address
    pub fn read_address(&mut self) -> Result<Address, ClientError> {
        let cell = match self.items.next() {
            Some(TupleItem::Slice(c)) | Some(TupleItem::Cell(c)) => c,
            other => return Err(self.mismatch("address", other.as_ref())),
        };
        let address = cell
            .begin_parse()
            .load_address()
            .map_err(|_| self.mismatch("address", Some(&TupleItem::Slice(cell.clone()))))?;
        self.index += 1;
        Ok(address)
    }

    /// Fail if entries are left over
    pub fn finish(mut self) -> Result<(), ClientError> {
        match self.items.next() {
            None => Ok(()),
            Some(extra) => Err(ClientError::UnexpectedReturnShape {
                method: self.method.clone(),
                index: self.index,
                expected: "end of stack",
                found: extra.kind().to_string(),
            }),
        }
    }
}

/// Transport bound to a single contract address
#[async_trait]
pub trait ContractProvider: Send + Sync {
    /// What a send reports back: nothing on a live network, the produced
    /// transactions in an emulator
    type SendOutcome: Send;

    async fn get_state(&self) -> Result<ContractState, ProviderError>;

    async fn get(&self, method: &str, args: Vec<TupleItem>) -> Result<GetMethodResult, ProviderError>;

    async fn internal(
        &self,
        via: &dyn Sender,
        message: InternalMessage,
    ) -> Result<Self::SendOutcome, ProviderError>;
}

/// A deployable or deployed contract instance
pub trait Contract {
    fn address(&self) -> Address;

    fn init(&self) -> Option<&StateInit>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::CellBuilder;

    fn address_slice(address: &Address) -> TupleItem {
        let mut b = CellBuilder::new();
        b.store_address(address).unwrap();
        TupleItem::Slice(b.build())
    }

    #[test]
    fn test_reader_reads_in_order() {
        let addr = Address::new(0, [7; 32]);
        let mut reader = TupleReader::new(
            "get_contract_storage_data",
            vec![TupleItem::Int(3), address_slice(&addr)],
        );
        assert_eq!(reader.read_int().unwrap(), 3);
        assert_eq!(reader.read_address().unwrap(), addr);
        reader.finish().unwrap();
    }

    #[test]
    fn test_reader_reports_tag_mismatch() {
        let mut reader = TupleReader::new("balance", vec![TupleItem::Null]);
        match reader.read_int() {
            Err(ClientError::UnexpectedReturnShape {
                method,
                index,
                expected,
                found,
            }) => {
                assert_eq!(method, "balance");
                assert_eq!(index, 0);
                assert_eq!(expected, "int");
                assert_eq!(found, "null");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reader_reports_missing_entry() {
        let mut reader = TupleReader::new("balance", vec![]);
        assert!(matches!(
            reader.read_int(),
            Err(ClientError::UnexpectedReturnShape { found, .. }) if found == "nothing"
        ));
    }

    #[test]
    fn test_reader_rejects_extra_entries() {
        let reader = TupleReader::new("balance", vec![TupleItem::Int(1)]);
        assert!(reader.finish().is_err());
    }

    #[test]
    fn test_non_zero_exit_code_is_error() {
        let result = GetMethodResult {
            exit_code: 11,
            stack: vec![],
        };
        assert!(matches!(
            result.reader("balance"),
            Err(ClientError::GetMethodFailed { exit_code: 11, .. })
        ));
    }

    #[test]
    fn test_send_mode_flags() {
        let mode = SendMode::PAY_GAS_SEPARATELY | SendMode::IGNORE_ERRORS;
        assert_eq!(mode.0, 3);
        assert!(mode.contains(SendMode::IGNORE_ERRORS));
        assert!(!mode.contains(SendMode::CARRY_ALL_REMAINING_BALANCE));
    }
}
