//! Compact bit-level serialization of the prefix tree.
//!
//! # Format
//!
//! Preorder walk, one tag bit per node:
//!
//! ```text
//! internal := 0 <left> [<right>]
//! leaf     := 1 <symbol: 8 bits, MSB first>
//! ```
//!
//! followed by zero bits up to the next byte boundary. The number of leaves
//! is stored separately in the container header; the reader uses it to know
//! when to stop, which is also how a one-symbol root (no right child) is
//! recognised.

use std::io::Read;

use crate::bitio::{BitReader, BitWriter};
use crate::code_table::MAX_CODE_LENGTH;
use crate::error::{BitIoError, Error, HeaderError, Result};
use crate::tree::{PrefixTree, PrefixTreeNode};

/// A serialized tree, already padded to whole bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedTree {
    pub bytes: Vec<u8>,
    /// Meaningful bits before padding.
    pub bit_len: u64,
}

/// Serialize `tree` in preorder and pad to a byte boundary.
pub fn serialize(tree: &PrefixTree) -> SerializedTree {
    let mut writer = BitWriter::with_capacity(serialized_byte_len(tree) as usize);
    write_node(tree.root(), &mut writer);
    let bit_len = writer.bit_len();
    SerializedTree {
        bytes: writer.finish(),
        bit_len,
    }
}

/// Unpadded length in bits, without serializing.
///
/// One tag bit per node plus eight symbol bits per leaf.
pub fn serialized_bit_len(tree: &PrefixTree) -> u64 {
    fn count(node: &PrefixTreeNode) -> u64 {
        match node {
            PrefixTreeNode::Leaf { .. } => 9,
            PrefixTreeNode::Internal { left, right } => {
                1 + count(left) + right.as_deref().map_or(0, count)
            }
        }
    }
    count(tree.root())
}

/// Padded length in bytes.
pub fn serialized_byte_len(tree: &PrefixTree) -> u64 {
    serialized_bit_len(tree).div_ceil(8)
}

fn write_node(node: &PrefixTreeNode, writer: &mut BitWriter) {
    match node {
        PrefixTreeNode::Leaf { symbol } => {
            writer.write_bit(true);
            for shift in (0..8).rev() {
                writer.write_bit((symbol >> shift) & 1 == 1);
            }
        }
        PrefixTreeNode::Internal { left, right } => {
            writer.write_bit(false);
            write_node(left, writer);
            if let Some(right) = right {
                write_node(right, writer);
            }
        }
    }
}

/// Rebuild a tree of `leaf_count` leaves from `bits`.
///
/// The reader is left just after the last meaningful tree bit; the caller
/// aligns it to skip the padding.
///
/// # Errors
/// - `HeaderError::RootIsLeaf` if the first tag bit is a leaf tag
/// - `HeaderError::TruncatedTree` if the stream ends first
/// - `HeaderError::TreeTooDeep` if nesting exceeds what 256 leaves allow
pub fn deserialize<R: Read>(leaf_count: usize, bits: &mut BitReader<R>) -> Result<PrefixTree> {
    let mut reader = TreeReader {
        bits,
        remaining: leaf_count,
    };

    if reader.read_tag()? {
        return Err(HeaderError::RootIsLeaf.into());
    }
    let root = reader.read_internal(0)?;

    PrefixTree::from_root(root).ok_or_else(|| HeaderError::RootIsLeaf.into())
}

/// Cursor state for one reconstruction: the bit source plus the number of
/// leaves still to come.
struct TreeReader<'a, R> {
    bits: &'a mut BitReader<R>,
    remaining: usize,
}

impl<R: Read> TreeReader<'_, R> {
    fn read_internal(&mut self, depth: usize) -> Result<PrefixTreeNode> {
        if depth >= MAX_CODE_LENGTH {
            return Err(HeaderError::TreeTooDeep {
                max: MAX_CODE_LENGTH,
            }
            .into());
        }

        let left = self.read_child(depth + 1)?;
        let right = if self.remaining > 0 {
            Some(self.read_child(depth + 1)?)
        } else {
            None
        };

        Ok(PrefixTreeNode::internal(left, right))
    }

    fn read_child(&mut self, depth: usize) -> Result<PrefixTreeNode> {
        if self.read_tag()? {
            let symbol = self.bits.read_bits(8).map_err(|e| self.truncated(e))? as u8;
            self.remaining -= 1;
            Ok(PrefixTreeNode::Leaf { symbol })
        } else {
            self.read_internal(depth)
        }
    }

    fn read_tag(&mut self) -> Result<bool> {
        self.bits.read_bit().map_err(|e| self.truncated(e))
    }

    fn truncated(&self, err: Error) -> Error {
        match err {
            Error::BitIo(BitIoError::UnexpectedEof) => HeaderError::TruncatedTree {
                remaining: self.remaining,
            }
            .into(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::ByteFrequencyTable;

    fn tree_for(data: &[u8]) -> PrefixTree {
        PrefixTree::from_frequencies(&ByteFrequencyTable::from_bytes(data)).unwrap()
    }

    #[test]
    fn test_single_leaf_layout() {
        // 0 (root) 1 01000001 ('A') -> 10 bits, padded with 6 zeros
        let serialized = serialize(&tree_for(b"AAAA"));
        assert_eq!(serialized.bit_len, 10);
        assert_eq!(serialized.bytes, vec![0b0101_0000, 0b0100_0000]);
    }

    #[test]
    fn test_two_leaf_layout() {
        // 0 1 'B' 1 'A' -> 19 bits
        let tree = tree_for(b"AAAB");
        let serialized = serialize(&tree);
        assert_eq!(serialized.bit_len, 19);
        assert_eq!(serialized_bit_len(&tree), 19);
        assert_eq!(serialized_byte_len(&tree), 3);
        assert_eq!(
            serialized.bytes,
            vec![0b0101_0000, 0b1010_1000, 0b0010_0000]
        );
    }

    #[test]
    fn test_round_trip_shapes() {
        for data in [
            &b"x"[..],
            b"xy",
            b"AAAB",
            b"abracadabra",
            b"the quick brown fox jumps over the lazy dog",
        ] {
            let tree = tree_for(data);
            let serialized = serialize(&tree);
            let mut bits = BitReader::new(&serialized.bytes[..]);
            let decoded = deserialize(tree.leaf_count(), &mut bits).unwrap();
            assert_eq!(decoded, tree);
            assert_eq!(bits.position(), serialized.bit_len);
        }
    }

    #[test]
    fn test_full_alphabet_round_trip() {
        let data: Vec<u8> = (0..=255).rev().chain(0..=127).collect();
        let tree = tree_for(&data);
        let serialized = serialize(&tree);
        assert_eq!(serialized.bit_len, 255 + 256 * 9);

        let mut bits = BitReader::new(&serialized.bytes[..]);
        assert_eq!(deserialize(256, &mut bits).unwrap(), tree);
    }

    #[test]
    fn test_truncated_tree() {
        let serialized = serialize(&tree_for(b"abracadabra"));
        let cut = &serialized.bytes[..serialized.bytes.len() / 2];
        let mut bits = BitReader::new(cut);
        let result = deserialize(5, &mut bits);
        assert!(matches!(
            result,
            Err(Error::BadHeader(HeaderError::TruncatedTree { .. }))
        ));
    }

    #[test]
    fn test_root_leaf_rejected() {
        let mut bits = BitReader::new(&[0b1000_0000, 0x00][..]);
        assert!(matches!(
            deserialize(1, &mut bits),
            Err(Error::BadHeader(HeaderError::RootIsLeaf))
        ));
    }

    #[test]
    fn test_deep_nesting_rejected() {
        // All-zero bits describe an endless chain of internal nodes.
        let zeros = vec![0u8; 64];
        let mut bits = BitReader::new(&zeros[..]);
        assert!(matches!(
            deserialize(3, &mut bits),
            Err(Error::BadHeader(HeaderError::TreeTooDeep { .. }))
        ));
    }
}
