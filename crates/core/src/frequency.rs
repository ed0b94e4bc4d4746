//! Byte frequency counting.
//!
//! A [`ByteFrequencyTable`] is created fresh for each encode, filled by a
//! single streaming pass over the source, and never changed afterwards.

use std::io::{self, Read};

use crate::progress::PhaseProgress;

/// Number of symbols in the alphabet (raw bytes).
pub const ALPHABET_SIZE: usize = 256;

/// Read buffer size used when counting from a stream.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Occurrence count for every byte value.
///
/// # Invariants
/// - `total_bytes()` equals the number of bytes counted
/// - a symbol that never appeared has a count of exactly 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteFrequencyTable {
    counts: [u64; ALPHABET_SIZE],
}

impl ByteFrequencyTable {
    pub fn new() -> Self {
        Self {
            counts: [0; ALPHABET_SIZE],
        }
    }

    /// Build a table from an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = Self::new();
        table.count_all(data);
        table
    }

    /// Build a table from raw counts indexed by symbol.
    pub fn from_counts(counts: [u64; ALPHABET_SIZE]) -> Self {
        Self { counts }
    }

    /// Count every byte of `reader` in streaming order.
    ///
    /// `len_hint` is only used to scale progress; pass 0 when unknown.
    pub fn from_reader<R: Read>(
        reader: &mut R,
        len_hint: u64,
        progress: &mut PhaseProgress<'_>,
    ) -> io::Result<Self> {
        let mut table = Self::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut seen = 0u64;

        progress.update(0.0);
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            table.count_all(&buffer[..read]);
            seen += read as u64;
            if len_hint > 0 {
                progress.update_ratio(seen, len_hint);
            }
        }
        progress.finish();

        Ok(table)
    }

    /// Increment the count for one byte value.
    #[inline]
    pub fn count(&mut self, symbol: u8) {
        self.counts[symbol as usize] += 1;
    }

    /// Count every byte of `data`.
    pub fn count_all(&mut self, data: &[u8]) {
        for &byte in data {
            self.count(byte);
        }
    }

    /// Occurrences of `symbol`.
    pub fn get(&self, symbol: u8) -> u64 {
        self.counts[symbol as usize]
    }

    /// Sum of all counts (the uncompressed size).
    pub fn total_bytes(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of distinct symbols observed.
    pub fn non_zero_symbol_count(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Symbols with a non-zero count, in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(symbol, &count)| (symbol as u8, count))
    }

    pub fn counts(&self) -> &[u64; ALPHABET_SIZE] {
        &self.counts
    }
}

impl Default for ByteFrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    #[test]
    fn test_count_and_totals() {
        let table = ByteFrequencyTable::from_bytes(b"AAAB");
        assert_eq!(table.get(b'A'), 3);
        assert_eq!(table.get(b'B'), 1);
        assert_eq!(table.get(b'C'), 0);
        assert_eq!(table.total_bytes(), 4);
        assert_eq!(table.non_zero_symbol_count(), 2);
    }

    #[test]
    fn test_empty() {
        let table = ByteFrequencyTable::new();
        assert_eq!(table.total_bytes(), 0);
        assert_eq!(table.non_zero_symbol_count(), 0);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn test_iter_is_ordered_and_sparse() {
        let table = ByteFrequencyTable::from_bytes(&[200, 3, 3, 0, 255]);
        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![(0, 1), (3, 2), (200, 1), (255, 1)]);
    }

    #[test]
    fn test_from_reader_matches_from_bytes() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut sink = NoProgress;
        let mut progress = PhaseProgress::new(&mut sink, "Counting");
        let streamed =
            ByteFrequencyTable::from_reader(&mut &data[..], data.len() as u64, &mut progress)
                .unwrap();
        assert_eq!(streamed, ByteFrequencyTable::from_bytes(&data));
        assert_eq!(streamed.total_bytes(), 200_000);
    }

    #[test]
    fn test_from_reader_reports_progress() {
        let data = vec![7u8; READ_BUFFER_SIZE * 3];
        let mut fractions = Vec::new();
        let mut sink = |_: &str, f: f64| fractions.push(f);
        {
            let mut progress = PhaseProgress::new(&mut sink, "Counting");
            ByteFrequencyTable::from_reader(&mut &data[..], data.len() as u64, &mut progress)
                .unwrap();
        }
        assert_eq!(fractions.first(), Some(&0.0));
        assert_eq!(fractions.last(), Some(&1.0));
        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
    }
}
