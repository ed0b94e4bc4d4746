//! Container format: header layout, size accounting, payload streaming.
//!
//! # Container Format
//!
//! ```text
//! +----------------------+
//! | signature (2)        |  u16 big-endian, 7006 (0x1B5E)
//! +----------------------+
//! | leaf_count - 1 (1)   |  0 for zero or one distinct symbol
//! +----------------------+
//! | serialized tree      |  preorder tag/leaf bits, zero-padded
//! | (variable)           |  (absent for empty input)
//! +----------------------+
//! | payload padding (1)  |  filler bits in the final payload byte
//! +----------------------+
//! | payload              |  bit-packed codes, MSB first
//! | (variable)           |
//! +----------------------+
//! ```
//!
//! An empty input has no tree and no payload, so its container is exactly
//! `1B 5E 00 00`. A zero leaf byte followed by more than the padding byte
//! always means a one-symbol tree.

use std::io::{self, Read, Write};

use crate::bitio::{BitReader, BitWriter};
use crate::code_table::CodeTable;
use crate::error::{Error, HeaderError, PayloadError, Result};
use crate::frequency::{ByteFrequencyTable, READ_BUFFER_SIZE};
use crate::progress::PhaseProgress;
use crate::tree::{PrefixTree, PrefixTreeNode};
use crate::tree_codec::{self, SerializedTree};

/// Container signature.
pub const SIGNATURE: u16 = 7006;

/// Signature + leaf count + payload padding.
pub const FIXED_HEADER_BYTES: u64 = 4;

/// Largest value the payload padding field may hold.
pub const MAX_PAYLOAD_PADDING: u8 = 8;

/// Default number of buffered payload bits before flushing to the sink.
pub const DEFAULT_FLUSH_BITS: usize = 262_144;

/// Size of an encode, computed from the frequency and code tables alone.
///
/// Everything here is known before the first output byte is written, so the
/// caller can refuse an encode that would make the file larger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    /// Sum of all frequency counts
    pub uncompressed_bytes: u64,
    /// Σ count × code length
    pub payload_bits: u64,
    /// Unpadded serialized tree length
    pub tree_bits: u64,
    /// Fixed fields plus padded tree
    pub header_bytes: u64,
    /// Header plus padded payload
    pub compressed_bytes: u64,
}

impl SizeReport {
    pub fn compute(
        frequencies: &ByteFrequencyTable,
        tree: Option<&PrefixTree>,
        codes: &CodeTable,
    ) -> Self {
        let tree_bits = tree.map_or(0, tree_codec::serialized_bit_len);
        let payload_bits = codes.payload_bits(frequencies);
        let header_bytes = FIXED_HEADER_BYTES + tree_bits.div_ceil(8);

        Self {
            uncompressed_bytes: frequencies.total_bytes(),
            payload_bits,
            tree_bits,
            header_bytes,
            compressed_bytes: header_bytes + payload_bits.div_ceil(8),
        }
    }

    /// Filler bits in the final payload byte.
    pub fn payload_padding(&self) -> u8 {
        payload_padding(self.payload_bits)
    }

    /// True if the container would be larger than the input.
    pub fn would_expand(&self) -> bool {
        self.compressed_bytes > self.uncompressed_bytes
    }
}

/// Zero bits needed to round `payload_bits` up to a whole byte.
pub fn payload_padding(payload_bits: u64) -> u8 {
    if payload_bits == 0 {
        0
    } else {
        (7 - (payload_bits - 1) % 8) as u8
    }
}

/// Leaf-count header byte for `leaf_count` distinct symbols.
pub fn leaf_count_field(leaf_count: usize) -> u8 {
    leaf_count.saturating_sub(1) as u8
}

/// Write signature, leaf count, tree and padding field.
pub fn write_header<W: Write>(
    sink: &mut W,
    leaf_count: usize,
    tree: Option<&SerializedTree>,
    payload_padding: u8,
) -> io::Result<u64> {
    sink.write_all(&SIGNATURE.to_be_bytes())?;
    sink.write_all(&[leaf_count_field(leaf_count)])?;
    let mut written = 3;
    if let Some(tree) = tree {
        sink.write_all(&tree.bytes)?;
        written += tree.bytes.len() as u64;
    }
    sink.write_all(&[payload_padding])?;
    Ok(written + 1)
}

/// Parsed header: everything before the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// `None` for an empty input
    pub tree: Option<PrefixTree>,
    pub payload_padding: u8,
    /// Bytes consumed from the source
    pub byte_len: u64,
}

impl Header {
    pub fn leaf_count(&self) -> usize {
        self.tree.as_ref().map_or(0, PrefixTree::leaf_count)
    }
}

/// Read and check the two signature bytes.
///
/// A source shorter than two bytes cannot carry the signature either.
pub fn read_signature<R: Read>(source: &mut R) -> Result<()> {
    let mut bytes = [0u8; 2];
    let got = read_up_to(source, &mut bytes)?;
    let actual = u16::from_be_bytes(bytes);
    if got < 2 || actual != SIGNATURE {
        return Err(Error::BadSignature {
            expected: SIGNATURE,
            actual,
        });
    }
    Ok(())
}

/// Read leaf count, tree and padding field. The signature must already
/// have been consumed; on success `source` is positioned at the payload.
pub fn read_header_body<R: Read>(source: &mut R) -> Result<Header> {
    let mut fixed = [0u8; 2];
    if read_up_to(source, &mut fixed)? < 2 {
        return Err(HeaderError::Truncated.into());
    }
    let [leaf_field, first] = fixed;

    if leaf_field == 0 && first == 0 {
        // No tree: `first` is the padding field of an empty container.
        return Ok(Header {
            tree: None,
            payload_padding: 0,
            byte_len: FIXED_HEADER_BYTES,
        });
    }

    let leaf_count = leaf_field as usize + 1;
    let mut bits = BitReader::preloaded(&mut *source, first);
    let tree = tree_codec::deserialize(leaf_count, &mut bits)?;
    bits.align();
    let tree_bytes = bits.position() / 8;

    let payload_padding = match bits.read_bits(8) {
        Ok(value) => value as u8,
        Err(Error::BitIo(_)) => return Err(HeaderError::Truncated.into()),
        Err(e) => return Err(e),
    };
    if payload_padding > MAX_PAYLOAD_PADDING {
        return Err(HeaderError::InvalidPadding {
            value: payload_padding,
        }
        .into());
    }

    Ok(Header {
        tree: Some(tree),
        payload_padding,
        byte_len: 3 + tree_bytes + 1,
    })
}

/// Stream `source` through `codes` into `sink`.
///
/// Complete bytes are flushed whenever more than `flush_bits` bits are
/// buffered. Returns the number of padding bits added to the final byte.
pub fn encode_payload<R: Read, W: Write>(
    codes: &CodeTable,
    source: &mut R,
    sink: &mut W,
    flush_bits: usize,
    len_hint: u64,
    progress: &mut PhaseProgress<'_>,
) -> Result<u8> {
    let flush_bytes = (flush_bits / 8).max(1);
    let mut writer = BitWriter::with_capacity(flush_bytes + 64);
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut seen = 0u64;

    progress.update(0.0);
    loop {
        let read = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        for &byte in &buffer[..read] {
            codes.get(byte).write_to(&mut writer)?;
            if writer.byte_len() >= flush_bytes {
                writer.flush_to(sink)?;
            }
        }
        seen += read as u64;
        if len_hint > 0 {
            progress.update_ratio(seen, len_hint);
        }
    }

    let padding = writer.finish_to(sink)?;
    progress.finish();
    Ok(padding)
}

/// Walks payload bits against the tree, emitting a symbol at each leaf.
struct PayloadWalker<'t> {
    root: &'t PrefixTreeNode,
    node: &'t PrefixTreeNode,
    position: u64,
    out: Vec<u8>,
}

impl<'t> PayloadWalker<'t> {
    fn new(root: &'t PrefixTreeNode) -> Self {
        Self {
            root,
            node: root,
            position: 0,
            out: Vec::with_capacity(READ_BUFFER_SIZE * 2),
        }
    }

    /// Consume the top `bits` bits of `byte`, MSB first.
    #[inline]
    fn feed(&mut self, byte: u8, bits: u8) -> Result<()> {
        for i in 0..bits {
            let bit = (byte >> (7 - i)) & 1 == 1;
            self.node = self.node.child(bit).ok_or(PayloadError::MissingBranch {
                position: self.position,
            })?;
            self.position += 1;
            if let PrefixTreeNode::Leaf { symbol } = self.node {
                self.out.push(*symbol);
                self.node = self.root;
            }
        }
        Ok(())
    }

    fn at_root(&self) -> bool {
        std::ptr::eq(self.node, self.root)
    }

    fn flush_to<W: Write>(&mut self, sink: &mut W) -> io::Result<u64> {
        let written = self.out.len() as u64;
        if written > 0 {
            sink.write_all(&self.out)?;
            self.out.clear();
        }
        Ok(written)
    }
}

/// Outcome of a payload decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodedPayload {
    /// Bytes written to the sink
    pub written: u64,
    /// Meaningful payload bits walked
    pub payload_bits: u64,
}

/// Decode the payload of a container whose header has been read.
///
/// The final byte is held back until the stream ends so that only its
/// `8 - payload_padding` meaningful bits are walked.
pub fn decode_payload<R: Read, W: Write>(
    header: &Header,
    source: &mut R,
    sink: &mut W,
    len_hint: u64,
    progress: &mut PhaseProgress<'_>,
) -> Result<DecodedPayload> {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    let Some(tree) = header.tree.as_ref() else {
        // Empty container: nothing may follow the header.
        if read_up_to(source, &mut buffer[..1])? > 0 {
            return Err(PayloadError::UnexpectedPayload.into());
        }
        progress.finish();
        return Ok(DecodedPayload::default());
    };

    let mut walker = PayloadWalker::new(tree.root());
    let mut held: Option<u8> = None;
    let mut written = 0u64;
    let mut seen = 0u64;

    progress.update(0.0);
    loop {
        let read = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if let Some(byte) = held.take() {
            walker.feed(byte, 8)?;
        }
        for &byte in &buffer[..read - 1] {
            walker.feed(byte, 8)?;
        }
        held = Some(buffer[read - 1]);

        written += walker.flush_to(sink)?;
        seen += read as u64;
        if len_hint > 0 {
            progress.update_ratio(seen, len_hint);
        }
    }

    let last = held.ok_or(PayloadError::MissingPayload)?;
    walker.feed(last, 8 - header.payload_padding)?;
    if !walker.at_root() {
        return Err(PayloadError::IncompleteCode.into());
    }
    written += walker.flush_to(sink)?;
    progress.finish();

    Ok(DecodedPayload {
        written,
        payload_bits: walker.position,
    })
}

/// Fill as much of `buf` as the stream allows; returns bytes read.
fn read_up_to<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    fn encode_all(data: &[u8]) -> (SizeReport, Vec<u8>) {
        let freqs = ByteFrequencyTable::from_bytes(data);
        let tree = PrefixTree::from_frequencies(&freqs);
        let codes = tree
            .as_ref()
            .map_or_else(CodeTable::empty, CodeTable::from_tree);
        let sizes = SizeReport::compute(&freqs, tree.as_ref(), &codes);
        let serialized = tree.as_ref().map(tree_codec::serialize);

        let mut out = Vec::new();
        write_header(
            &mut out,
            freqs.non_zero_symbol_count(),
            serialized.as_ref(),
            sizes.payload_padding(),
        )
        .unwrap();
        let mut sink = NoProgress;
        let mut progress = PhaseProgress::new(&mut sink, "Writing");
        let padding = encode_payload(
            &codes,
            &mut &data[..],
            &mut out,
            DEFAULT_FLUSH_BITS,
            data.len() as u64,
            &mut progress,
        )
        .unwrap();
        assert_eq!(padding, sizes.payload_padding());
        (sizes, out)
    }

    fn decode_all(container: &[u8]) -> Result<Vec<u8>> {
        let mut source = container;
        read_signature(&mut source)?;
        let header = read_header_body(&mut source)?;
        let mut out = Vec::new();
        let mut sink = NoProgress;
        let mut progress = PhaseProgress::new(&mut sink, "Decoding");
        decode_payload(&header, &mut source, &mut out, 0, &mut progress)?;
        Ok(out)
    }

    #[test]
    fn test_payload_padding_formula() {
        assert_eq!(payload_padding(0), 0);
        assert_eq!(payload_padding(1), 7);
        assert_eq!(payload_padding(7), 1);
        assert_eq!(payload_padding(8), 0);
        assert_eq!(payload_padding(9), 7);
    }

    #[test]
    fn test_aaab_container_bytes() {
        let (sizes, out) = encode_all(b"AAAB");
        // header: 1B 5E | 01 | 3 tree bytes | padding 4
        // payload: A=1 A=1 A=1 B=0 -> 1110_0000
        assert_eq!(sizes.payload_bits, 4);
        assert_eq!(sizes.header_bytes, 7);
        assert_eq!(
            out,
            vec![0x1B, 0x5E, 0x01, 0b0101_0000, 0b1010_1000, 0b0010_0000, 4, 0b1110_0000]
        );
        assert_eq!(out.len() as u64, sizes.compressed_bytes);
        assert_eq!(decode_all(&out).unwrap(), b"AAAB");
    }

    #[test]
    fn test_empty_container() {
        let (sizes, out) = encode_all(b"");
        assert_eq!(out, vec![0x1B, 0x5E, 0x00, 0x00]);
        assert_eq!(sizes.compressed_bytes, 4);
        assert_eq!(decode_all(&out).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_single_symbol_container() {
        let data = vec![0u8; 13];
        let (sizes, out) = encode_all(&data);
        assert_eq!(out[2], 0);
        assert_eq!(sizes.payload_bits, 13);
        assert_eq!(sizes.payload_padding(), 3);
        assert_eq!(decode_all(&out).unwrap(), data);
    }

    #[test]
    fn test_would_expand() {
        let (sizes, _) = encode_all(&[1, 2]);
        assert!(sizes.would_expand());

        let (sizes, _) = encode_all(&[b'x'; 1000]);
        assert!(!sizes.would_expand());
    }

    #[test]
    fn test_small_flush_threshold() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 13) as u8).collect();
        let freqs = ByteFrequencyTable::from_bytes(&data);
        let tree = PrefixTree::from_frequencies(&freqs).unwrap();
        let codes = CodeTable::from_tree(&tree);

        let mut small = Vec::new();
        let mut large = Vec::new();
        let mut sink = NoProgress;
        let mut progress = PhaseProgress::new(&mut sink, "Writing");
        encode_payload(&codes, &mut &data[..], &mut small, 8, 0, &mut progress).unwrap();
        encode_payload(&codes, &mut &data[..], &mut large, 1 << 20, 0, &mut progress).unwrap();
        assert_eq!(small, large);
    }

    #[test]
    fn test_bad_signature() {
        let (_, mut out) = encode_all(b"hello");
        out[0] ^= 0xFF;
        out[1] ^= 0xFF;
        assert!(matches!(decode_all(&out), Err(Error::BadSignature { .. })));
        assert!(matches!(decode_all(&[0x1B]), Err(Error::BadSignature { .. })));
    }

    #[test]
    fn test_missing_leaf_count() {
        assert!(matches!(
            decode_all(&[0x1B, 0x5E]),
            Err(Error::BadHeader(HeaderError::Truncated))
        ));
    }

    #[test]
    fn test_invalid_padding() {
        let (sizes, mut out) = encode_all(b"hello world");
        let padding_at = sizes.header_bytes as usize - 1;
        out[padding_at] = 9;
        assert!(matches!(
            decode_all(&out),
            Err(Error::BadHeader(HeaderError::InvalidPadding { value: 9 }))
        ));
    }

    #[test]
    fn test_padding_eight_skips_last_byte() {
        // Seven 1-bit 'A' codes and one 'B' fill exactly one byte.
        let data = b"AAAAAAAB";
        let (sizes, mut out) = encode_all(data);
        assert_eq!(sizes.payload_padding(), 0);

        let padding_at = sizes.header_bytes as usize - 1;
        out[padding_at] = 8;
        out.push(0xFF);
        assert_eq!(decode_all(&out).unwrap(), data);
    }

    #[test]
    fn test_missing_payload() {
        let (sizes, out) = encode_all(b"AAAB");
        let header_only = &out[..sizes.header_bytes as usize];
        assert!(matches!(
            decode_all(header_only),
            Err(Error::BadPayload(PayloadError::MissingPayload))
        ));
    }

    #[test]
    fn test_incomplete_code() {
        // Codes: b=0, a=11, c=100, d=101. Payload 18 bits:
        // 11111111 00001001 01|000000
        let data = b"aaaabbbbcd";
        let (sizes, mut out) = encode_all(data);
        assert_eq!(sizes.payload_bits, 18);
        assert_eq!(out[out.len() - 1], 0b0100_0000);

        // Claim only one meaningful bit in the final byte: decoding stops
        // between the second and third bit of 'd'.
        let padding_at = sizes.header_bytes as usize - 1;
        out[padding_at] = 7;
        assert!(matches!(
            decode_all(&out),
            Err(Error::BadPayload(PayloadError::IncompleteCode))
        ));
    }

    #[test]
    fn test_one_leaf_right_branch_missing() {
        // One-symbol tree has no right child; a set bit has nowhere to go.
        let (sizes, mut out) = encode_all(b"zz");
        let payload_at = sizes.header_bytes as usize;
        out[payload_at] = 0b0100_0000;
        assert!(matches!(
            decode_all(&out),
            Err(Error::BadPayload(PayloadError::MissingBranch { position: 1 }))
        ));
    }

    #[test]
    fn test_empty_container_with_trailing_bytes() {
        assert!(matches!(
            decode_all(&[0x1B, 0x5E, 0x00, 0x00, 0x42]),
            Err(Error::BadPayload(PayloadError::UnexpectedPayload))
        ));
    }

    #[test]
    fn test_truncated_mid_tree() {
        let data: Vec<u8> = (0..=255).collect();
        let (_, out) = encode_all(&data);
        let cut = &out[..40];
        assert!(matches!(decode_all(cut), Err(Error::BadHeader(_))));
    }

    #[test]
    fn test_header_byte_len() {
        let (sizes, out) = encode_all(b"some text to compress, some text to compress");
        let mut source = &out[..];
        read_signature(&mut source).unwrap();
        let header = read_header_body(&mut source).unwrap();
        assert_eq!(header.byte_len, sizes.header_bytes);
        assert_eq!(source.len() as u64, sizes.compressed_bytes - sizes.header_bytes);
    }
}
