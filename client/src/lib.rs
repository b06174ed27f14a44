pub mod contract;
pub mod error;
pub mod link;
pub mod message;
pub mod network;
pub mod provider;
pub mod rpc;
pub mod wallet;

pub use contract::{Balance, ContractData, MainContract};
pub use error::{ClientError, ProviderError};
pub use link::{funding_link, qr_code, transfer_link};
pub use network::{wait_for_deploy, NetworkProvider};
pub use provider::{
    AccountStatus, Contract, ContractProvider, ContractState, GetMethodResult, InternalMessage,
    SendMode, Sender, SenderArguments, TupleItem, TupleReader,
};
pub use rpc::{RpcError, TonClient4};
pub use wallet::WalletSender;
