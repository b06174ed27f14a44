//! Ordinary TON cells: a bit string of up to 1023 bits plus up to four
//! references, identified by the SHA-256 of their standard representation.

use crate::address::Address;
use crate::coins::Coins;
use crate::error::CellError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

pub const MAX_BITS: usize = 1023;
pub const MAX_REFS: usize = 4;

/// Immutable cell
#[derive(Clone)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    /// The empty cell (no bits, no references)
    pub fn empty() -> Self {
        CellBuilder::new().build()
    }

    pub(crate) fn from_parts(data: Vec<u8>, bit_len: usize, refs: Vec<Arc<Cell>>) -> Self {
        let depth = refs
            .iter()
            .map(|r| r.depth + 1)
            .max()
            .unwrap_or(0);

        let mut hasher = Sha256::new();
        hasher.update(descriptors(bit_len, refs.len()));
        hasher.update(padded_data(&data, bit_len));
        for r in &refs {
            hasher.update(r.depth.to_be_bytes());
        }
        for r in &refs {
            hasher.update(r.hash);
        }

        Cell {
            data,
            bit_len,
            refs,
            hash: hasher.finalize().into(),
            depth,
        }
    }

    /// Representation hash
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Raw data bytes; bits past `bit_len` are zero
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn references(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs.is_empty()
    }

    pub fn begin_parse(&self) -> Slice<'_> {
        Slice {
            cell: self,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Descriptor bytes d1 and d2 for an ordinary level-0 cell
    pub(crate) fn descriptors(&self) -> [u8; 2] {
        descriptors(self.bit_len, self.refs.len())
    }

    /// Data bytes with the completion tag appended when the bit length is not
    /// a multiple of eight
    pub(crate) fn padded_data(&self) -> Vec<u8> {
        padded_data(&self.data, self.bit_len)
    }

    fn bit_at(&self, index: usize) -> bool {
        (self.data[index / 8] >> (7 - index % 8)) & 1 == 1
    }
}

fn descriptors(bit_len: usize, ref_count: usize) -> [u8; 2] {
    let d1 = ref_count as u8;
    let d2 = (bit_len / 8 + (bit_len + 7) / 8) as u8;
    [d1, d2]
}

fn padded_data(data: &[u8], bit_len: usize) -> Vec<u8> {
    let mut out = data[..(bit_len + 7) / 8].to_vec();
    if bit_len % 8 != 0 {
        out[bit_len / 8] |= 0x80 >> (bit_len % 8);
    }
    out
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{{{}", hex::encode_upper(&self.data[..(self.bit_len + 7) / 8]))?;
        if self.bit_len % 8 != 0 {
            write!(f, "_")?;
        }
        write!(f, "}}")?;
        if !self.refs.is_empty() {
            f.debug_list().entries(self.refs.iter()).finish()?;
        }
        Ok(())
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::empty()
    }
}

/// Incremental cell writer; every store checks capacity so `build` cannot fail
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn available_bits(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    pub fn available_refs(&self) -> usize {
        MAX_REFS - self.refs.len()
    }

    fn ensure_bits(&self, bits: usize) -> Result<(), CellError> {
        if bits > self.available_bits() {
            return Err(CellError::BitOverflow {
                requested: bits,
                available: self.available_bits(),
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.ensure_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store `value` as an unsigned big-endian integer of `bits` bits
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }
        self.ensure_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Store `value` as a two's complement integer of `bits` bits
    pub fn store_int(&mut self, value: i128, bits: usize) -> Result<&mut Self, CellError> {
        let out_of_range = || CellError::ValueOutOfRange {
            value: value.to_string(),
            bits,
        };
        if bits == 0 || bits > 128 {
            return Err(out_of_range());
        }
        if bits < 128 {
            let min = -(1i128 << (bits - 1));
            let max = (1i128 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(out_of_range());
            }
        }
        self.ensure_bits(bits)?;
        let raw = value as u128;
        for i in (0..bits).rev() {
            self.push_bit((raw >> i) & 1 == 1);
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.ensure_bits(bytes.len() * 8)?;
        for byte in bytes {
            for i in (0..8).rev() {
                self.push_bit((byte >> i) & 1 == 1);
            }
        }
        Ok(self)
    }

    /// Store a `VarUInteger 16` amount: 4-bit byte length, then the bytes
    pub fn store_coins(&mut self, coins: Coins) -> Result<&mut Self, CellError> {
        let value = coins.as_nano();
        let len = ((128 - value.leading_zeros() as usize) + 7) / 8;
        if len > 15 {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits: 120,
            });
        }
        self.ensure_bits(4 + len * 8)?;
        self.store_uint(len as u128, 4)?;
        self.store_uint(value, len * 8)
    }

    /// Store `addr_std$10 anycast:nothing workchain:int8 hash:bits256`
    pub fn store_address(&mut self, address: &Address) -> Result<&mut Self, CellError> {
        self.ensure_bits(267)?;
        self.store_uint(0b10, 2)?;
        self.store_bit(false)?;
        self.store_int(address.workchain as i128, 8)?;
        self.store_bytes(&address.hash)
    }

    /// Store `addr_none$00`
    pub fn store_address_none(&mut self) -> Result<&mut Self, CellError> {
        self.store_uint(0, 2)
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self, CellError> {
        self.store_ref_arc(Arc::new(cell))
    }

    pub fn store_ref_arc(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::RefOverflow(MAX_REFS));
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// Append the unread remainder of a slice (bits and references)
    pub fn store_slice(&mut self, slice: &Slice<'_>) -> Result<&mut Self, CellError> {
        self.ensure_bits(slice.remaining_bits())?;
        if slice.remaining_refs() > self.available_refs() {
            return Err(CellError::RefOverflow(MAX_REFS));
        }
        for i in slice.bit_pos..slice.cell.bit_len {
            self.push_bit(slice.cell.bit_at(i));
        }
        for r in &slice.cell.refs[slice.ref_pos..] {
            self.refs.push(r.clone());
        }
        Ok(self)
    }

    pub fn build(self) -> Cell {
        Cell::from_parts(self.data, self.bit_len, self.refs)
    }
}

/// Read cursor over a cell
#[derive(Debug, Clone)]
pub struct Slice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> Slice<'a> {
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs.len() - self.ref_pos
    }

    fn ensure_bits(&self, bits: usize) -> Result<(), CellError> {
        if bits > self.remaining_bits() {
            return Err(CellError::BitUnderflow {
                requested: bits,
                available: self.remaining_bits(),
            });
        }
        Ok(())
    }

    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        self.ensure_bits(1)?;
        let bit = self.cell.bit_at(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u128, CellError> {
        if bits > 128 {
            return Err(CellError::ValueOutOfRange {
                value: "uint".to_string(),
                bits,
            });
        }
        self.ensure_bits(bits)?;
        let mut value = 0u128;
        for _ in 0..bits {
            value = (value << 1) | self.cell.bit_at(self.bit_pos) as u128;
            self.bit_pos += 1;
        }
        Ok(value)
    }

    pub fn load_int(&mut self, bits: usize) -> Result<i128, CellError> {
        let raw = self.load_uint(bits)?;
        if bits == 0 || bits == 128 {
            return Ok(raw as i128);
        }
        let sign = 1u128 << (bits - 1);
        Ok(if raw & sign != 0 {
            (raw as i128) - (1i128 << bits)
        } else {
            raw as i128
        })
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, CellError> {
        self.ensure_bits(len * 8)?;
        (0..len).map(|_| self.load_uint(8).map(|b| b as u8)).collect()
    }

    pub fn load_coins(&mut self) -> Result<Coins, CellError> {
        let len = self.load_uint(4)? as usize;
        Ok(Coins::from_nano(self.load_uint(len * 8)?))
    }

    /// Load an `addr_std`; `addr_none` and external addresses are rejected
    pub fn load_address(&mut self) -> Result<Address, CellError> {
        self.load_maybe_address()?
            .ok_or_else(|| CellError::UnsupportedAddress("addr_none".to_string()))
    }

    /// Load `addr_none` as `None` or an `addr_std` as `Some`
    pub fn load_maybe_address(&mut self) -> Result<Option<Address>, CellError> {
        match self.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(CellError::UnsupportedAddress("anycast".to_string()));
                }
                let workchain = self.load_int(8)? as i8;
                let bytes = self.load_bytes(32)?;
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&bytes);
                Ok(Some(Address::new(workchain, hash)))
            }
            0b01 => Err(CellError::UnsupportedAddress("addr_extern".to_string())),
            _ => Err(CellError::UnsupportedAddress("addr_var".to_string())),
        }
    }

    pub fn load_ref(&mut self) -> Result<&'a Arc<Cell>, CellError> {
        let cell: &'a Cell = self.cell;
        let r = cell.refs.get(self.ref_pos).ok_or(CellError::RefUnderflow)?;
        self.ref_pos += 1;
        Ok(r)
    }

    /// Fail unless every bit and reference has been read
    pub fn end_parse(&self) -> Result<(), CellError> {
        if self.remaining_bits() != 0 || self.remaining_refs() != 0 {
            return Err(CellError::NotFullyConsumed {
                bits: self.remaining_bits(),
                refs: self.remaining_refs(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_hash() {
        assert_eq!(
            hex::encode(Cell::empty().hash()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
    }

    #[test]
    fn test_uint32_cell_hash() {
        let mut b = CellBuilder::new();
        b.store_uint(0, 32).unwrap();
        assert_eq!(
            hex::encode(b.build().hash()),
            "3fe93897158698e4d473b74414d7493716b0fc3a70310934873f0019daaccab4"
        );
    }

    #[test]
    fn test_store_uint_rejects_oversized_value() {
        let mut b = CellBuilder::new();
        assert!(matches!(
            b.store_uint(256, 8),
            Err(CellError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_bit_overflow() {
        let mut b = CellBuilder::new();
        b.store_bytes(&[0u8; 127]).unwrap();
        b.store_uint(0, 7).unwrap();
        assert_eq!(b.available_bits(), 0);
        assert!(matches!(
            b.store_bit(true),
            Err(CellError::BitOverflow { .. })
        ));
    }

    #[test]
    fn test_ref_overflow() {
        let mut b = CellBuilder::new();
        for _ in 0..4 {
            b.store_ref(Cell::empty()).unwrap();
        }
        assert_eq!(b.store_ref(Cell::empty()).unwrap_err(), CellError::RefOverflow(4));
    }

    #[test]
    fn test_load_values_in_order() {
        let mut b = CellBuilder::new();
        b.store_bit(true)
            .unwrap()
            .store_uint(333, 32)
            .unwrap()
            .store_int(-1, 8)
            .unwrap()
            .store_coins(Coins::from_nano(1_000_000_000))
            .unwrap();
        let cell = b.build();

        let mut s = cell.begin_parse();
        assert!(s.load_bit().unwrap());
        assert_eq!(s.load_uint(32).unwrap(), 333);
        assert_eq!(s.load_int(8).unwrap(), -1);
        assert_eq!(s.load_coins().unwrap(), Coins::from_nano(1_000_000_000));
        s.end_parse().unwrap();
    }

    #[test]
    fn test_zero_coins_take_four_bits() {
        let mut b = CellBuilder::new();
        b.store_coins(Coins::ZERO).unwrap();
        assert_eq!(b.bit_len(), 4);
    }

    #[test]
    fn test_underflow_on_short_slice() {
        let cell = Cell::empty();
        let mut s = cell.begin_parse();
        assert!(matches!(
            s.load_uint(32),
            Err(CellError::BitUnderflow { requested: 32, available: 0 })
        ));
    }

    #[test]
    fn test_depth_and_ref_hash_change() {
        let mut inner = CellBuilder::new();
        inner.store_uint(7, 3).unwrap();
        let inner = inner.build();

        let mut outer = CellBuilder::new();
        outer.store_ref(inner.clone()).unwrap();
        let outer = outer.build();

        assert_eq!(inner.depth(), 0);
        assert_eq!(outer.depth(), 1);
        assert_ne!(outer.hash(), Cell::empty().hash());
        assert_eq!(&**outer.begin_parse().load_ref().unwrap(), &inner);
    }

    #[test]
    fn test_store_slice_copies_remainder() {
        let mut b = CellBuilder::new();
        b.store_uint(0xAB, 8).unwrap().store_uint(0b101, 3).unwrap();
        b.store_ref(Cell::empty()).unwrap();
        let source = b.build();

        let mut s = source.begin_parse();
        s.load_uint(8).unwrap();

        let mut copy = CellBuilder::new();
        copy.store_slice(&s).unwrap();
        let copy = copy.build();
        assert_eq!(copy.bit_len(), 3);
        assert_eq!(copy.references().len(), 1);
        assert_eq!(copy.begin_parse().load_uint(3).unwrap(), 0b101);
    }
}
