/// Error types shared by the codec modules
use thiserror::Error;

/// Failures while building or reading cells
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("Cell overflow: {requested} bits requested, {available} available")]
    BitOverflow { requested: usize, available: usize },
    #[error("Cell overflow: more than {0} references")]
    RefOverflow(usize),
    #[error("Value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: String, bits: usize },
    #[error("Slice underflow: {requested} bits requested, {available} left")]
    BitUnderflow { requested: usize, available: usize },
    #[error("Slice underflow: no references left")]
    RefUnderflow,
    #[error("Slice not fully consumed: {bits} bits and {refs} references left")]
    NotFullyConsumed { bits: usize, refs: usize },
    #[error("Unsupported address encoding: {0}")]
    UnsupportedAddress(String),
}

/// Failures while parsing account addresses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid raw address: {0}")]
    InvalidRaw(String),
    #[error("Invalid friendly address: {0}")]
    InvalidFriendly(String),
    #[error("Address checksum mismatch")]
    ChecksumMismatch,
}

/// Failures while parsing coin amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinsError {
    #[error("Invalid coin amount: {0}")]
    InvalidAmount(String),
    #[error("Coin amount has more than 9 fractional digits: {0}")]
    TooPrecise(String),
    #[error("Coin amount overflow: {0}")]
    Overflow(String),
}

/// Failures while reading or writing bags of cells
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BocError {
    #[error("Unexpected end of BOC data")]
    UnexpectedEof,
    #[error("Unknown BOC magic: {0}")]
    UnknownMagic(String),
    #[error("BOC checksum mismatch")]
    ChecksumMismatch,
    #[error("BOC has no root cells")]
    NoRoots,
    #[error("Invalid BOC header: {0}")]
    InvalidHeader(String),
    #[error("Invalid cell at index {index}: {reason}")]
    InvalidCell { index: usize, reason: String },
    #[error("Exotic cells are not supported (index {0})")]
    ExoticCell(usize),
    #[error(transparent)]
    Cell(#[from] CellError),
}

/// Failures in the contract message codec
#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error(transparent)]
    Boc(#[from] BocError),
    #[error("Message body has no op code")]
    MissingOpCode,
    #[error("Unknown op code: {0}")]
    UnknownOpCode(u32),
    #[error("Failed to read compiled code: {0}")]
    CompiledCode(String),
}
