pub mod address;
pub mod boc;
pub mod cell;
pub mod codec;
pub mod coins;
pub mod error;
pub mod models;

pub use address::*;
pub use cell::*;
pub use codec::*;
pub use coins::*;
pub use error::*;
pub use models::*;
