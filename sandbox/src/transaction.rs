use shared::{Address, Cell, Coins};
use std::fmt;

/// One processed message as recorded by the emulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub lt: u64,
    /// `None` for wallet requests arriving from outside the chain
    pub from: Option<Address>,
    pub to: Address,
    pub value: Coins,
    pub body: Cell,
    pub success: bool,
    /// `None` when the compute phase was skipped
    pub exit_code: Option<i32>,
    pub bounced: bool,
    pub out_messages: usize,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self
            .from
            .map(|a| a.to_string())
            .unwrap_or_else(|| "external".to_string());
        write!(
            f,
            "lt={} {} -> {} value={} success={} exit_code={}{}",
            self.lt,
            from,
            self.to,
            self.value,
            self.success,
            self.exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "skipped".to_string()),
            if self.bounced { " (bounced)" } else { "" }
        )
    }
}

/// Everything a single send produced, in processing order
#[derive(Debug, Clone, Default)]
pub struct SendMessageResult {
    pub transactions: Vec<Transaction>,
}
