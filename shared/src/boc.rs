//! Bag-of-cells container (`b5ee9c72`)

use crate::cell::Cell;
use crate::error::BocError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], BocError> {
        let end = self.pos.checked_add(len).ok_or(BocError::UnexpectedEof)?;
        let out = self.data.get(self.pos..end).ok_or(BocError::UnexpectedEof)?;
        self.pos = end;
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, BocError> {
        Ok(self.take(1)?[0])
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn uint(&mut self, len: usize) -> Result<usize, BocError> {
        Ok(self
            .take(len)?
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize))
    }
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

/// Parse a BOC and return its root cells
pub fn deserialize(bytes: &[u8]) -> Result<Vec<Cell>, BocError> {
    let mut r = Reader { data: bytes, pos: 0 };

    let magic = r.take(4)?;
    if magic != BOC_MAGIC {
        return Err(BocError::UnknownMagic(hex::encode(magic)));
    }

    let flags = r.byte()?;
    let has_idx = flags & 0x80 != 0;
    let has_crc = flags & 0x40 != 0;
    let size = (flags & 0x07) as usize;
    let off_bytes = r.byte()? as usize;
    if size == 0 || off_bytes == 0 || off_bytes > 8 {
        return Err(BocError::InvalidHeader(format!(
            "field sizes {} and {}",
            size, off_bytes
        )));
    }

    let cell_count = r.uint(size)?;
    let root_count = r.uint(size)?;
    let _absent = r.uint(size)?;
    let _total_size = r.uint(off_bytes)?;

    if root_count == 0 {
        return Err(BocError::NoRoots);
    }
    // Each cell needs at least its two descriptor bytes
    if root_count > cell_count || cell_count > r.remaining() / 2 {
        return Err(BocError::InvalidHeader(format!(
            "{} cells and {} roots in {} bytes",
            cell_count,
            root_count,
            bytes.len()
        )));
    }
    let roots = (0..root_count)
        .map(|_| r.uint(size))
        .collect::<Result<Vec<_>, _>>()?;
    if has_idx {
        let index_len = cell_count
            .checked_mul(off_bytes)
            .ok_or(BocError::UnexpectedEof)?;
        r.take(index_len)?;
    }

    let mut raw = Vec::with_capacity(cell_count);
    for index in 0..cell_count {
        let d1 = r.byte()?;
        let d2 = r.byte()? as usize;
        if d1 & 0x08 != 0 {
            return Err(BocError::ExoticCell(index));
        }
        if d1 & 0xf0 != 0 {
            return Err(BocError::InvalidCell {
                index,
                reason: format!("unsupported level or stored hashes in descriptor {:#04x}", d1),
            });
        }
        let ref_count = (d1 & 0x07) as usize;
        if ref_count > 4 {
            return Err(BocError::InvalidCell {
                index,
                reason: format!("{} references", ref_count),
            });
        }

        let byte_len = (d2 + 1) / 2;
        let mut data = r.take(byte_len)?.to_vec();
        let bit_len = if d2 % 2 == 1 {
            let last = *data.last().ok_or(BocError::InvalidCell {
                index,
                reason: "empty padded data".to_string(),
            })?;
            if last == 0 {
                return Err(BocError::InvalidCell {
                    index,
                    reason: "missing completion tag".to_string(),
                });
            }
            let tag_pos = last.trailing_zeros() as usize;
            let last_idx = data.len() - 1;
            data[last_idx] &= !(1u8 << tag_pos);
            byte_len * 8 - tag_pos - 1
        } else {
            byte_len * 8
        };

        let refs = (0..ref_count)
            .map(|_| r.uint(size))
            .collect::<Result<Vec<_>, _>>()?;
        raw.push(RawCell {
            data,
            bit_len,
            refs,
        });
    }

    if has_crc {
        let body_end = r.pos;
        let stored = r.take(4)?;
        let expected = crc32c(&bytes[..body_end]).to_le_bytes();
        if stored != expected {
            return Err(BocError::ChecksumMismatch);
        }
    }

    // References always point forward, so build from the back
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for index in (0..cell_count).rev() {
        let cell = &raw[index];
        let mut refs = Vec::with_capacity(cell.refs.len());
        for &child in &cell.refs {
            if child <= index {
                return Err(BocError::InvalidCell {
                    index,
                    reason: format!("reference {} is not topologically ordered", child),
                });
            }
            let child_cell = built
                .get(child)
                .and_then(|c| c.clone())
                .ok_or_else(|| BocError::InvalidCell {
                    index,
                    reason: format!("dangling reference {}", child),
                })?;
            refs.push(child_cell);
        }
        built[index] = Some(Arc::new(Cell::from_parts(
            cell.data.clone(),
            cell.bit_len,
            refs,
        )));
    }

    roots
        .into_iter()
        .map(|i| {
            built
                .get(i)
                .and_then(|c| c.as_deref().cloned())
                .ok_or(BocError::InvalidCell {
                    index: i,
                    reason: "root out of range".to_string(),
                })
        })
        .collect()
}

/// Parse a BOC that must contain exactly one root
pub fn deserialize_single(bytes: &[u8]) -> Result<Cell, BocError> {
    deserialize(bytes)?
        .into_iter()
        .next()
        .ok_or(BocError::NoRoots)
}

/// Serialize one root with a CRC32C trailer and no index
pub fn serialize(root: &Cell) -> Vec<u8> {
    let mut order: Vec<&Cell> = Vec::new();
    let mut seen = HashSet::new();
    visit(root, &mut seen, &mut order);
    order.reverse();

    let index: HashMap<[u8; 32], usize> = order
        .iter()
        .enumerate()
        .map(|(i, c)| (c.hash(), i))
        .collect();

    let size = bytes_needed(order.len());
    let mut cells_data = Vec::new();
    for cell in &order {
        cells_data.extend_from_slice(&cell.descriptors());
        cells_data.extend_from_slice(&cell.padded_data());
        for r in cell.references() {
            write_uint(&mut cells_data, index[&r.hash()], size);
        }
    }
    let off_bytes = bytes_needed(cells_data.len());

    let mut out = Vec::with_capacity(cells_data.len() + 32);
    out.extend_from_slice(&BOC_MAGIC);
    out.push(0x40 | size as u8);
    out.push(off_bytes as u8);
    write_uint(&mut out, order.len(), size);
    write_uint(&mut out, 1, size);
    write_uint(&mut out, 0, size);
    write_uint(&mut out, cells_data.len(), off_bytes);
    write_uint(&mut out, 0, size);
    out.extend_from_slice(&cells_data);
    let crc = crc32c(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

fn visit<'a>(cell: &'a Cell, seen: &mut HashSet<[u8; 32]>, order: &mut Vec<&'a Cell>) {
    if !seen.insert(cell.hash()) {
        return;
    }
    for r in cell.references() {
        visit(r, seen, order);
    }
    order.push(cell);
}

fn bytes_needed(value: usize) -> usize {
    let mut n = 1;
    while n < 8 && value >> (8 * n) != 0 {
        n += 1;
    }
    n
}

fn write_uint(out: &mut Vec<u8>, value: usize, len: usize) {
    for i in (0..len).rev() {
        out.push((value >> (8 * i)) as u8);
    }
}

/// CRC-32C (Castagnoli), reflected
fn crc32c(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for byte in data {
        crc ^= *byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0x82f6_3b78
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    #[test]
    fn test_crc32c_check_value() {
        assert_eq!(crc32c(b"123456789"), 0xe306_9283);
    }

    #[test]
    fn test_empty_cell_boc() {
        let bytes = serialize(&Cell::empty());
        assert_eq!(hex::encode(&bytes), "b5ee9c724101010100020000004cacb9cd");
        assert_eq!(deserialize_single(&bytes).unwrap(), Cell::empty());
    }

    #[test]
    fn test_shared_reference_written_once() {
        let mut leaf = CellBuilder::new();
        leaf.store_uint(42, 7).unwrap();
        let leaf = leaf.build();

        let mut root = CellBuilder::new();
        root.store_ref(leaf.clone()).unwrap();
        root.store_ref(leaf).unwrap();
        let root = root.build();

        let bytes = serialize(&root);
        // header(4+1+1) + counts(3) + size(1) + root(1), two cells, crc(4)
        assert_eq!(bytes[6], 2);
        let parsed = deserialize_single(&bytes).unwrap();
        assert_eq!(parsed.hash(), root.hash());
        assert_eq!(parsed.references().len(), 2);
    }

    #[test]
    fn test_rejects_bad_magic() {
        assert!(matches!(
            deserialize(&[0, 1, 2, 3, 4]),
            Err(BocError::UnknownMagic(_))
        ));
    }

    #[test]
    fn test_rejects_corrupted_checksum() {
        let mut bytes = serialize(&Cell::empty());
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert_eq!(deserialize(&bytes).unwrap_err(), BocError::ChecksumMismatch);
    }

    #[test]
    fn test_rejects_oversized_cell_count() {
        let mut bytes = vec![0xb5, 0xee, 0x9c, 0x72, 0x07, 0x01];
        bytes.extend_from_slice(&[0x00, 0x80, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 1]);
        bytes.extend_from_slice(&[0; 7]);
        bytes.push(0);
        bytes.extend_from_slice(&[0; 7]);
        assert!(matches!(
            deserialize(&bytes),
            Err(BocError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_rejects_more_roots_than_cells() {
        // one cell, two roots
        let bytes = [
            0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x01, 0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
        ];
        assert!(matches!(
            deserialize(&bytes),
            Err(BocError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_rejects_stored_hashes_and_levels() {
        let mut bytes = serialize(&Cell::empty());
        // descriptor d1 follows the 11 header bytes
        bytes[11] = 0x10;
        let body_end = bytes.len() - 4;
        let crc = crc32c(&bytes[..body_end]).to_le_bytes();
        bytes[body_end..].copy_from_slice(&crc);
        assert!(matches!(
            deserialize(&bytes),
            Err(BocError::InvalidCell { index: 0, .. })
        ));
    }

    #[test]
    fn test_largest_descriptor_is_a_full_cell() {
        // d2 = 255: 128 bytes, the last one holding the completion tag
        let mut bytes = vec![0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x01, 0x01, 0x00, 0x82, 0x00];
        bytes.extend_from_slice(&[0x00, 0xff]);
        bytes.extend_from_slice(&[0xff; 128]);
        let parsed = deserialize_single(&bytes).unwrap();
        assert_eq!(parsed.bit_len(), crate::cell::MAX_BITS);

        let mut full = CellBuilder::new();
        for _ in 0..crate::cell::MAX_BITS {
            full.store_bit(true).unwrap();
        }
        assert_eq!(parsed, full.build());
    }

    #[test]
    fn test_truncated_input() {
        let bytes = serialize(&Cell::empty());
        assert_eq!(
            deserialize(&bytes[..8]).unwrap_err(),
            BocError::UnexpectedEof
        );
    }
}
