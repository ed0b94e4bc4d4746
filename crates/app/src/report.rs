//! Text rows for the frequency and code tables.
//!
//! Each row shows the symbol as a glyph, its decimal and binary value, then
//! the count or code:
//!
//! ```text
//! a    97     1100001     =   12
//! ```

use huffpack_core::code_table::CodeTable;
use huffpack_core::frequency::ByteFrequencyTable;

/// Printable stand-in for a byte. Control characters become '.'.
fn glyph(symbol: u8) -> char {
    if symbol < 0x20 || symbol == 0x7F {
        '.'
    } else {
        char::from(symbol)
    }
}

/// One row: glyph, decimal value, binary value, then `value`.
pub fn format_row(symbol: u8, value: impl std::fmt::Display) -> String {
    format!(
        "{:<5}{:<7}{:<12}=   {}",
        glyph(symbol),
        symbol,
        format!("{:b}", symbol),
        value
    )
}

/// Rows for every symbol with a non-zero count.
pub fn count_rows(frequencies: &ByteFrequencyTable) -> Vec<String> {
    frequencies
        .iter()
        .map(|(symbol, count)| format_row(symbol, count))
        .collect()
}

/// Rows for every symbol that has a code.
pub fn code_rows(codes: &CodeTable) -> Vec<String> {
    codes
        .iter()
        .map(|(symbol, code)| format_row(symbol, code))
        .collect()
}

pub fn print_counts(frequencies: &ByteFrequencyTable) {
    println!("=== Character Counts ===");
    for row in count_rows(frequencies) {
        println!("{}", row);
    }
    println!();
}

pub fn print_codes(codes: &CodeTable) {
    println!("=== Character Encodings ===");
    for row in code_rows(codes) {
        println!("{}", row);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use huffpack_core::tree::PrefixTree;

    #[test]
    fn test_row_layout() {
        assert_eq!(format_row(b'a', 12), "a    97     1100001     =   12");
        assert_eq!(format_row(b'\n', 3), ".    10     1010        =   3");
        assert_eq!(format_row(0, 1), ".    0      0           =   1");
    }

    #[test]
    fn test_count_rows_skip_absent() {
        let freqs = ByteFrequencyTable::from_bytes(b"abba");
        let rows = count_rows(&freqs);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("a    97"));
        assert!(rows[0].ends_with("=   2"));
        assert!(rows[1].starts_with("b    98"));
    }

    #[test]
    fn test_code_rows() {
        let freqs = ByteFrequencyTable::from_bytes(b"AAAB");
        let tree = PrefixTree::from_frequencies(&freqs).unwrap();
        let rows = code_rows(&CodeTable::from_tree(&tree));
        assert_eq!(rows.len(), 2);
        assert!(rows[0].ends_with("=   1"));
        assert!(rows[1].ends_with("=   0"));
    }
}
