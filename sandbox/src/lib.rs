pub mod blockchain;
pub mod executor;
pub mod matcher;
pub mod transaction;

pub use blockchain::{Blockchain, SandboxProvider, TreasurySender, COMPUTE_FEE, FORWARD_FEE};
pub use executor::{
    ContractExecutor, ExecutionContext, ExecutionResult, GetMethodContext, OutMessage,
};
pub use matcher::{assert_has_transaction, has_transaction, TransactionMatcher};
pub use transaction::{SendMessageResult, Transaction};
