//! Native currency amounts, kept in nanotons

use crate::error::CoinsError;
use std::fmt;
use std::str::FromStr;

pub const NANO_PER_TON: u128 = 1_000_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coins(u128);

impl Coins {
    pub const ZERO: Coins = Coins(0);

    pub const fn from_nano(nano: u128) -> Self {
        Coins(nano)
    }

    pub const fn from_ton(ton: u64) -> Self {
        Coins(ton as u128 * NANO_PER_TON)
    }

    pub fn as_nano(&self) -> u128 {
        self.0
    }

    pub fn checked_add(self, other: Coins) -> Option<Coins> {
        self.0.checked_add(other.0).map(Coins)
    }

    pub fn checked_sub(self, other: Coins) -> Option<Coins> {
        self.0.checked_sub(other.0).map(Coins)
    }

    pub fn saturating_add(self, other: Coins) -> Coins {
        Coins(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Coins) -> Coins {
        Coins(self.0.saturating_sub(other.0))
    }
}

/// Parse a decimal TON amount such as `"0.05"` into nanotons
pub fn to_nano(amount: &str) -> Result<Coins, CoinsError> {
    let trimmed = amount.trim();
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if (whole.is_empty() && frac.is_empty())
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(CoinsError::InvalidAmount(amount.to_string()));
    }
    if frac.len() > 9 {
        return Err(CoinsError::TooPrecise(amount.to_string()));
    }

    let whole_value: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| CoinsError::Overflow(amount.to_string()))?
    };
    let frac_value: u128 = if frac.is_empty() {
        0
    } else {
        format!("{:0<9}", frac)
            .parse()
            .map_err(|_| CoinsError::InvalidAmount(amount.to_string()))?
    };

    whole_value
        .checked_mul(NANO_PER_TON)
        .and_then(|n| n.checked_add(frac_value))
        .map(Coins)
        .ok_or_else(|| CoinsError::Overflow(amount.to_string()))
}

impl FromStr for Coins {
    type Err = CoinsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_nano(s)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANO_PER_TON;
        let frac = self.0 % NANO_PER_TON;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let digits = format!("{:09}", frac);
            write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
        }
    }
}
