//! Binary layouts of the contract's storage and operation messages

use crate::address::Address;
use crate::boc;
use crate::cell::{Cell, CellBuilder};
use crate::error::CodecError;
use crate::models::{ContractConfig, Operation};
use serde::Deserialize;
use std::path::Path;

pub const OP_INCREMENT: u32 = 1;
pub const OP_DEPOSIT: u32 = 2;
pub const OP_WITHDRAW: u32 = 3;

/// `counter:uint32 recent_sender:MsgAddressInt owner_address:MsgAddressInt`
pub fn encode_config(config: &ContractConfig) -> Result<Cell, CodecError> {
    let mut b = CellBuilder::new();
    b.store_uint(config.counter as u128, 32)?
        .store_address(&config.recent_sender)?
        .store_address(&config.owner_address)?;
    Ok(b.build())
}

pub fn decode_config(cell: &Cell) -> Result<ContractConfig, CodecError> {
    let mut s = cell.begin_parse();
    let counter = s.load_uint(32)? as u32;
    let recent_sender = s.load_address()?;
    let owner_address = s.load_address()?;
    s.end_parse()?;
    Ok(ContractConfig {
        counter,
        recent_sender,
        owner_address,
    })
}

pub fn encode_operation(op: &Operation) -> Result<Cell, CodecError> {
    let mut b = CellBuilder::new();
    b.store_uint(op.op_code() as u128, 32)?;
    match op {
        Operation::Increment { amount } => {
            b.store_uint(*amount as u128, 32)?;
        }
        Operation::Deposit => {}
        Operation::Withdraw { amount } => {
            b.store_coins(*amount)?;
        }
    }
    Ok(b.build())
}

/// Body consisting of a bare op code, with no payload
pub fn encode_raw_op(op_code: u32) -> Result<Cell, CodecError> {
    let mut b = CellBuilder::new();
    b.store_uint(op_code as u128, 32)?;
    Ok(b.build())
}

pub fn decode_operation(cell: &Cell) -> Result<Operation, CodecError> {
    let mut s = cell.begin_parse();
    if s.remaining_bits() < 32 {
        return Err(CodecError::MissingOpCode);
    }
    let op_code = s.load_uint(32)? as u32;
    let op = match op_code {
        OP_INCREMENT => Operation::Increment {
            amount: s.load_uint(32)? as u32,
        },
        OP_DEPOSIT => Operation::Deposit,
        OP_WITHDRAW => Operation::Withdraw {
            amount: s.load_coins()?,
        },
        other => return Err(CodecError::UnknownOpCode(other)),
    };
    Ok(op)
}

/// Code and initial data of a contract instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    pub code: Cell,
    pub data: Cell,
}

impl StateInit {
    /// `split_depth:nothing special:nothing code:^Cell data:^Cell library:empty`
    pub fn to_cell(&self) -> Result<Cell, CodecError> {
        let mut b = CellBuilder::new();
        b.store_bit(false)?
            .store_bit(false)?
            .store_bit(true)?
            .store_ref(self.code.clone())?
            .store_bit(true)?
            .store_ref(self.data.clone())?
            .store_bit(false)?;
        Ok(b.build())
    }
}

/// Address a contract with this state init will be deployed at
pub fn contract_address(workchain: i8, init: &StateInit) -> Result<Address, CodecError> {
    Ok(Address::new(workchain, init.to_cell()?.hash()))
}

#[derive(Deserialize)]
struct CompiledArtifact {
    hex: String,
}

/// Load contract code from a compiler artifact: either a JSON file with a
/// `hex` field holding the BOC, or a raw `.boc` file
pub fn load_compiled_code(path: &Path) -> Result<Cell, CodecError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CodecError::CompiledCode(format!("{}: {}", path.display(), e)))?;

    let boc_bytes = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        let artifact: CompiledArtifact = serde_json::from_slice(&bytes)
            .map_err(|e| CodecError::CompiledCode(format!("{}: {}", path.display(), e)))?;
        hex::decode(artifact.hex.trim())
            .map_err(|e| CodecError::CompiledCode(format!("{}: {}", path.display(), e)))?
    } else {
        bytes
    };

    Ok(boc::deserialize_single(&boc_bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins::{to_nano, Coins};

    fn owner() -> Address {
        "0QD9jGNwJs3Sv5y1OWNIq_jXxWqrGi8q10zLIB3SZwdak7Nt"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_config_layout() {
        let config = ContractConfig {
            counter: 7,
            recent_sender: owner(),
            owner_address: owner(),
        };
        let cell = encode_config(&config).unwrap();
        assert_eq!(cell.bit_len(), 32 + 267 * 2);
        assert!(cell.references().is_empty());

        let mut s = cell.begin_parse();
        assert_eq!(s.load_uint(32).unwrap(), 7);
        assert_eq!(s.load_uint(2).unwrap(), 0b10);
    }

    #[test]
    fn test_config_round_trip() {
        let config = ContractConfig {
            counter: u32::MAX,
            recent_sender: Address::new(0, [0xAA; 32]),
            owner_address: owner(),
        };
        let cell = encode_config(&config).unwrap();
        assert_eq!(decode_config(&cell).unwrap(), config);
    }

    #[test]
    fn test_increment_layout() {
        let cell = encode_operation(&Operation::Increment { amount: 5 }).unwrap();
        assert_eq!(cell.bit_len(), 64);
        assert_eq!(hex::encode(cell.data()), "0000000100000005");
    }

    #[test]
    fn test_deposit_layout() {
        let cell = encode_operation(&Operation::Deposit).unwrap();
        assert_eq!(hex::encode(cell.data()), "00000002");
    }

    #[test]
    fn test_withdraw_layout() {
        let cell = encode_operation(&Operation::Withdraw {
            amount: to_nano("1").unwrap(),
        })
        .unwrap();
        // op, then 4-bit length 4 and 0x3b9aca00
        assert_eq!(cell.bit_len(), 32 + 4 + 32);
        let mut s = cell.begin_parse();
        assert_eq!(s.load_uint(32).unwrap(), 3);
        assert_eq!(s.load_uint(4).unwrap(), 4);
        assert_eq!(s.load_uint(32).unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_decode_operation_errors() {
        assert!(matches!(
            decode_operation(&Cell::empty()),
            Err(CodecError::MissingOpCode)
        ));
        assert!(matches!(
            decode_operation(&encode_raw_op(333).unwrap()),
            Err(CodecError::UnknownOpCode(333))
        ));
        // op 1 without its payload
        assert!(matches!(
            decode_operation(&encode_raw_op(1).unwrap()),
            Err(CodecError::Cell(_))
        ));
    }

    #[test]
    fn test_decode_operation_round_trip() {
        for op in [
            Operation::Increment { amount: 42 },
            Operation::Deposit,
            Operation::Withdraw {
                amount: Coins::from_nano(12_345),
            },
        ] {
            assert_eq!(decode_operation(&encode_operation(&op).unwrap()).unwrap(), op);
        }
    }

    #[test]
    fn test_contract_address_depends_on_data() {
        let code = encode_raw_op(0xC0DE).unwrap();
        let a = StateInit {
            code: code.clone(),
            data: encode_raw_op(0).unwrap(),
        };
        let b = StateInit {
            code,
            data: encode_raw_op(1).unwrap(),
        };
        let addr_a = contract_address(0, &a).unwrap();
        assert_eq!(addr_a.workchain, 0);
        assert_eq!(addr_a.hash, a.to_cell().unwrap().hash());
        assert_ne!(addr_a, contract_address(0, &b).unwrap());
    }
}
