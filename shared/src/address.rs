//! Standard account addresses in raw (`0:<hex>`) and user-friendly forms

use crate::error::AddressError;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use std::fmt;
use std::str::FromStr;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

/// Account address: workchain plus 256-bit account id
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub workchain: i8,
    pub hash: [u8; 32],
}

/// Flags carried by the user-friendly form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriendlyFormat {
    pub url_safe: bool,
    pub bounceable: bool,
    pub test_only: bool,
}

impl Default for FriendlyFormat {
    fn default() -> Self {
        FriendlyFormat {
            url_safe: true,
            bounceable: true,
            test_only: false,
        }
    }
}

/// Result of parsing a user-friendly address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriendlyAddress {
    pub address: Address,
    pub bounceable: bool,
    pub test_only: bool,
}

impl Address {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Address { workchain, hash }
    }

    /// Parse `<workchain>:<64 hex chars>`
    pub fn parse_raw(s: &str) -> Result<Self, AddressError> {
        let (wc, hash_hex) = s
            .split_once(':')
            .ok_or_else(|| AddressError::InvalidRaw(s.to_string()))?;
        let workchain = wc
            .parse::<i8>()
            .map_err(|_| AddressError::InvalidRaw(s.to_string()))?;
        let bytes = hex::decode(hash_hex).map_err(|_| AddressError::InvalidRaw(s.to_string()))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidRaw(s.to_string()))?;
        Ok(Address { workchain, hash })
    }

    /// Parse the 48-character base64 or base64url form
    pub fn parse_friendly(s: &str) -> Result<FriendlyAddress, AddressError> {
        if s.len() != 48 {
            return Err(AddressError::InvalidFriendly(s.to_string()));
        }
        let bytes = if s.contains('-') || s.contains('_') {
            URL_SAFE.decode(s)
        } else {
            STANDARD.decode(s)
        }
        .map_err(|e| AddressError::InvalidFriendly(format!("{}: {}", s, e)))?;

        if bytes.len() != 36 {
            return Err(AddressError::InvalidFriendly(s.to_string()));
        }
        let checksum = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc16(&bytes[..34]) != checksum {
            return Err(AddressError::ChecksumMismatch);
        }

        let mut tag = bytes[0];
        let test_only = tag & TAG_TEST_ONLY != 0;
        if test_only {
            tag ^= TAG_TEST_ONLY;
        }
        let bounceable = match tag {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            other => {
                return Err(AddressError::InvalidFriendly(format!(
                    "unknown tag 0x{:02x}",
                    other
                )))
            }
        };

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);
        Ok(FriendlyAddress {
            address: Address {
                workchain: bytes[1] as i8,
                hash,
            },
            bounceable,
            test_only,
        })
    }

    pub fn to_raw_string(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    pub fn to_friendly(&self, format: FriendlyFormat) -> String {
        let mut tag = if format.bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if format.test_only {
            tag |= TAG_TEST_ONLY;
        }

        let mut bytes = Vec::with_capacity(36);
        bytes.push(tag);
        bytes.push(self.workchain as u8);
        bytes.extend_from_slice(&self.hash);
        let checksum = crc16(&bytes);
        bytes.extend_from_slice(&checksum.to_be_bytes());

        if format.url_safe {
            URL_SAFE.encode(bytes)
        } else {
            STANDARD.encode(bytes)
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            Address::parse_raw(s)
        } else {
            Address::parse_friendly(s).map(|f| f.address)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_friendly(FriendlyFormat::default()))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_raw_string())
    }
}

/// CRC16-XMODEM (poly 0x1021, init 0)
fn crc16(data: &[u8]) -> u16 {
    let mut reg: u16 = 0;
    for byte in data {
        reg ^= (*byte as u16) << 8;
        for _ in 0..8 {
            reg = if reg & 0x8000 != 0 {
                (reg << 1) ^ 0x1021
            } else {
                reg << 1
            };
        }
    }
    reg
}
