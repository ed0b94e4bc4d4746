//! Per-symbol code derivation.

use std::fmt;

use crate::bitio::BitWriter;
use crate::frequency::{ByteFrequencyTable, ALPHABET_SIZE};
use crate::tree::{PrefixTree, PrefixTreeNode};

/// Longest code a 256-leaf tree can produce.
pub const MAX_CODE_LENGTH: usize = ALPHABET_SIZE - 1;

const WORDS: usize = ALPHABET_SIZE / 64;

/// A variable-length code, stored MSB-first in 64-bit words.
///
/// Bit `0` means "go left", bit `1` means "go right".
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Code {
    words: [u64; WORDS],
    len: u16,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append one bit. Codes longer than `MAX_CODE_LENGTH` cannot occur.
    pub fn push(&mut self, bit: bool) {
        let len = self.len as usize;
        debug_assert!(len < WORDS * 64);
        let word = &mut self.words[len / 64];
        let mask = 1u64 << (63 - len % 64);
        if bit {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        self.len += 1;
    }

    /// Remove the last bit.
    pub fn pop(&mut self) -> Option<bool> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let bit = self.bit(self.len as usize);
        let len = self.len as usize;
        self.words[len / 64] &= !(1u64 << (63 - len % 64));
        Some(bit)
    }

    /// Bit at `index` (0 = first bit on the path from the root).
    pub fn bit(&self, index: usize) -> bool {
        (self.words[index / 64] >> (63 - index % 64)) & 1 == 1
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(|i| self.bit(i))
    }

    /// True if `self` is a proper or equal prefix of `other`.
    pub fn is_prefix_of(&self, other: &Code) -> bool {
        self.len <= other.len && (0..self.len()).all(|i| self.bit(i) == other.bit(i))
    }

    /// Append this code to `writer`, up to 64 bits at a time.
    #[inline]
    pub fn write_to(&self, writer: &mut BitWriter) -> crate::Result<()> {
        let mut remaining = self.len();
        for &word in &self.words {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(64);
            writer.write_bits(word >> (64 - take), take)?;
            remaining -= take;
        }
        Ok(())
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code({})", self)
    }
}

/// Symbol-indexed code table derived from a [`PrefixTree`].
///
/// Symbols absent from the tree map to the empty code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: Vec<Code>,
}

impl CodeTable {
    /// Derive codes by depth-first traversal, `0` for left and `1` for right.
    pub fn from_tree(tree: &PrefixTree) -> Self {
        let mut codes = vec![Code::new(); ALPHABET_SIZE];
        let mut path = Code::new();
        assign(tree.root(), &mut path, &mut codes);
        Self { codes }
    }

    /// Table with every code empty (the table of an empty input).
    pub fn empty() -> Self {
        Self {
            codes: vec![Code::new(); ALPHABET_SIZE],
        }
    }

    #[inline]
    pub fn get(&self, symbol: u8) -> &Code {
        &self.codes[symbol as usize]
    }

    /// Symbols that have a code, in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Code)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter(|(_, code)| !code.is_empty())
            .map(|(symbol, code)| (symbol as u8, code))
    }

    /// Σ count[s] × len(code[s]).
    pub fn payload_bits(&self, frequencies: &ByteFrequencyTable) -> u64 {
        frequencies
            .iter()
            .map(|(symbol, count)| count * self.get(symbol).len() as u64)
            .sum()
    }

    /// Longest code in the table.
    pub fn max_len(&self) -> usize {
        self.codes.iter().map(Code::len).max().unwrap_or(0)
    }
}

fn assign(node: &PrefixTreeNode, path: &mut Code, codes: &mut [Code]) {
    match node {
        PrefixTreeNode::Leaf { symbol } => {
            codes[*symbol as usize] = path.clone();
        }
        PrefixTreeNode::Internal { left, right } => {
            path.push(false);
            assign(left, path, codes);
            path.pop();

            if let Some(right) = right {
                path.push(true);
                assign(right, path, codes);
                path.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_for(data: &[u8]) -> (ByteFrequencyTable, CodeTable) {
        let freqs = ByteFrequencyTable::from_bytes(data);
        let tree = PrefixTree::from_frequencies(&freqs).unwrap();
        (freqs, CodeTable::from_tree(&tree))
    }

    #[test]
    fn test_code_push_pop() {
        let mut code = Code::new();
        code.push(true);
        code.push(false);
        code.push(true);
        assert_eq!(code.to_string(), "101");
        assert_eq!(code.pop(), Some(true));
        assert_eq!(code.to_string(), "10");
        code.push(false);
        assert_eq!(code.to_string(), "100");
    }

    #[test]
    fn test_long_code_crosses_words() {
        let mut code = Code::new();
        for i in 0..130 {
            code.push(i % 3 == 0);
        }
        assert_eq!(code.len(), 130);
        assert!(code.bit(129));
        assert!(!code.bit(128));

        let mut writer = BitWriter::new();
        code.write_to(&mut writer).unwrap();
        assert_eq!(writer.bit_len(), 130);

        let bytes = writer.finish();
        let mut reader = crate::bitio::BitReader::new(&bytes[..]);
        for i in 0..130 {
            assert_eq!(reader.read_bit().unwrap(), i % 3 == 0);
        }
    }

    #[test]
    fn test_aaab_codes() {
        let (freqs, table) = table_for(b"AAAB");
        assert_eq!(table.get(b'B').to_string(), "0");
        assert_eq!(table.get(b'A').to_string(), "1");
        assert!(table.get(b'C').is_empty());
        assert_eq!(table.payload_bits(&freqs), 4);
    }

    #[test]
    fn test_single_symbol_gets_one_bit() {
        let (freqs, table) = table_for(&[9u8; 100]);
        assert_eq!(table.get(9).to_string(), "0");
        assert_eq!(table.payload_bits(&freqs), 100);
        assert_eq!(table.iter().count(), 1);
    }

    #[test]
    fn test_prefix_free() {
        let (_, table) = table_for(b"abracadabra alakazam, sim sala bim!");
        let codes: Vec<_> = table.iter().collect();
        for (i, (_, a)) in codes.iter().enumerate() {
            for (j, (_, b)) in codes.iter().enumerate() {
                if i != j {
                    assert!(!a.is_prefix_of(b), "{} is a prefix of {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let freqs = ByteFrequencyTable::from_bytes(b"mississippi river");
        let tree = PrefixTree::from_frequencies(&freqs).unwrap();
        assert_eq!(CodeTable::from_tree(&tree), CodeTable::from_tree(&tree));
    }

    #[test]
    fn test_full_alphabet_lengths() {
        let data: Vec<u8> = (0..=255).collect();
        let (_, table) = table_for(&data);
        assert_eq!(table.iter().count(), 256);
        assert!(table.iter().all(|(_, code)| code.len() == 8));
        assert_eq!(table.max_len(), 8);
    }

    #[test]
    fn test_empty_table() {
        let table = CodeTable::empty();
        assert_eq!(table.iter().count(), 0);
        assert_eq!(table.payload_bits(&ByteFrequencyTable::new()), 0);
    }
}
