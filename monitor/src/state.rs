/// Last-seen contract data kept by a running monitor
use chrono::{DateTime, Utc};
use shared::Address;

/// Values reported by the watched get-method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub recent_sender: Address,
    pub total: i128,
}

/// Monitor state
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub last: Option<ContractSnapshot>,
    pub last_seqno: Option<u32>,
    pub last_change_at: Option<DateTime<Utc>>,
    pub ticks: u64,
    pub consecutive_failures: u32,
}

impl MonitorState {
    /// Store a fresh snapshot; true when it differs from the previous one
    pub fn observe(&mut self, snapshot: ContractSnapshot, seqno: u32) -> bool {
        self.ticks += 1;
        self.last_seqno = Some(seqno);
        if self.last.as_ref() == Some(&snapshot) {
            return false;
        }
        self.last = Some(snapshot);
        self.last_change_at = Some(Utc::now());
        true
    }

    /// Record a failed tick
    pub fn record_failure(&mut self) {
        self.ticks += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// Clear failures on a successful tick
    pub fn clear_failures(&mut self) {
        self.consecutive_failures = 0;
    }
}
