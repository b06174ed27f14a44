// Library exports for the monitor binary and its tests
pub mod config;
pub mod poller;
pub mod source;
pub mod state;

pub use config::{ConfigError, ContractTarget, MonitorConfig};
pub use poller::{resolve_address, Monitor, MonitorError, MonitorHandle, PollOutcome};
pub use source::StateSource;
pub use state::{ContractSnapshot, MonitorState};
