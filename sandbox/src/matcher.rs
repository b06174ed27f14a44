use crate::transaction::{SendMessageResult, Transaction};
use shared::{Address, Coins};
use std::fmt;

/// Partial description of a transaction; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionMatcher {
    from: Option<Address>,
    to: Option<Address>,
    success: Option<bool>,
    exit_code: Option<i32>,
    value: Option<Coins>,
    bounced: Option<bool>,
}

impl TransactionMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, address: Address) -> Self {
        self.from = Some(address);
        self
    }

    pub fn to(mut self, address: Address) -> Self {
        self.to = Some(address);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    pub fn value(mut self, value: Coins) -> Self {
        self.value = Some(value);
        self
    }

    pub fn bounced(mut self, bounced: bool) -> Self {
        self.bounced = Some(bounced);
        self
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.from.map_or(true, |a| tx.from == Some(a))
            && self.to.map_or(true, |a| tx.to == a)
            && self.success.map_or(true, |s| tx.success == s)
            && self.exit_code.map_or(true, |c| tx.exit_code == Some(c))
            && self.value.map_or(true, |v| tx.value == v)
            && self.bounced.map_or(true, |b| tx.bounced == b)
    }
}

impl fmt::Display for TransactionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(a) = self.from {
            parts.push(format!("from={}", a));
        }
        if let Some(a) = self.to {
            parts.push(format!("to={}", a));
        }
        if let Some(s) = self.success {
            parts.push(format!("success={}", s));
        }
        if let Some(c) = self.exit_code {
            parts.push(format!("exit_code={}", c));
        }
        if let Some(v) = self.value {
            parts.push(format!("value={}", v));
        }
        if let Some(b) = self.bounced {
            parts.push(format!("bounced={}", b));
        }
        if parts.is_empty() {
            write!(f, "{{any}}")
        } else {
            write!(f, "{{{}}}", parts.join(", "))
        }
    }
}

pub fn has_transaction(transactions: &[Transaction], matcher: &TransactionMatcher) -> bool {
    transactions.iter().any(|tx| matcher.matches(tx))
}

#[track_caller]
pub fn assert_has_transaction(transactions: &[Transaction], matcher: &TransactionMatcher) {
    if !has_transaction(transactions, matcher) {
        let seen: Vec<String> = transactions.iter().map(|tx| format!("  {}", tx)).collect();
        panic!(
            "no transaction matching {}; got:\n{}",
            matcher,
            seen.join("\n")
        );
    }
}

impl SendMessageResult {
    pub fn has_transaction(&self, matcher: &TransactionMatcher) -> bool {
        has_transaction(&self.transactions, matcher)
    }

    #[track_caller]
    pub fn assert_transaction(&self, matcher: &TransactionMatcher) {
        assert_has_transaction(&self.transactions, matcher)
    }
}
