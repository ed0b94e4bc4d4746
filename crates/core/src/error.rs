//! Error types for huffpack.
//!
//! All operations return structured errors rather than panicking. Each
//! failure is terminal for the operation that raised it; the caller decides
//! whether to retry, prompt, or abort.

use thiserror::Error;

/// Top-level error type for all codec operations.
///
/// Each variant corresponds to a specific failure domain:
/// - Signature: the source is not a huffpack container
/// - Header: leaf count, tree, or padding field is malformed or truncated
/// - Payload: the bit-packed payload does not walk the tree cleanly
/// - Expanded output: compression would grow the file and was not forced
/// - I/O: underlying read/write failure
#[derive(Debug, Error)]
pub enum Error {
    /// First two bytes don't match the container signature
    #[error("signature mismatch: expected {expected:#06x}, got {actual:#06x}")]
    BadSignature { expected: u16, actual: u16 },

    /// Header fields are out of range or the tree is truncated
    #[error("bad header: {0}")]
    BadHeader(#[from] HeaderError),

    /// Payload bits do not decode against the stored tree
    #[error("bad payload: {0}")]
    BadPayload(#[from] PayloadError),

    /// Compressed output would be larger than the input
    #[error("encoding results in a larger file ({uncompressed} -> {compressed} bytes); force encoding to proceed anyway")]
    ExpandedOutput { compressed: u64, uncompressed: u64 },

    /// Bit I/O operation failed (e.g., reading past end of buffer)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// File or stream I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A task phase was run before the phases it depends on
    #[error("phase '{phase}' run out of order")]
    OutOfOrder { phase: &'static str },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`], for collaborators that only care
/// about which kind of alert to raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadSignature,
    BadHeader,
    BadPayload,
    ExpandedOutput,
    Io,
    Usage,
}

impl Error {
    /// Map this error onto the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadSignature { .. } => ErrorKind::BadSignature,
            Error::BadHeader(_) => ErrorKind::BadHeader,
            Error::BadPayload(_) => ErrorKind::BadPayload,
            Error::ExpandedOutput { .. } => ErrorKind::ExpandedOutput,
            Error::Io(_) => ErrorKind::Io,
            // Bit-level EOF only escapes the codec when a caller drives
            // bitio directly; treat it like a short read.
            Error::BitIo(_) => ErrorKind::Io,
            Error::OutOfOrder { .. } | Error::Config(_) => ErrorKind::Usage,
        }
    }
}

/// Bit-level I/O errors.
#[derive(Debug, Error)]
pub enum BitIoError {
    /// Attempted to read past the end of the stream
    #[error("unexpected end of bit stream")]
    UnexpectedEof,

    /// Invalid bit count (e.g., more than 64 bits at once)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),
}

/// Container header errors.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// Stream ended before the fixed header fields were read
    #[error("header truncated")]
    Truncated,

    /// Stream ended while reconstructing the tree
    #[error("tree truncated: stream ended with {remaining} leaves still expected")]
    TruncatedTree { remaining: usize },

    /// Serialized tree starts with a leaf tag; the root is always internal
    #[error("serialized tree root is a leaf")]
    RootIsLeaf,

    /// Serialized tree nests deeper than any 256-leaf tree can
    #[error("serialized tree exceeds maximum depth {max}")]
    TreeTooDeep { max: usize },

    /// Payload padding field outside 0..=8
    #[error("impossible payload padding {value}")]
    InvalidPadding { value: u8 },
}

/// Payload decoding errors.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Payload ended part-way through a code
    #[error("payload ended in the middle of a code")]
    IncompleteCode,

    /// Payload walked into a branch the tree doesn't have
    #[error("no tree branch for payload bit {position}")]
    MissingBranch { position: u64 },

    /// Tree present but no payload bytes follow the header
    #[error("payload missing after non-empty tree")]
    MissingPayload,

    /// Bytes follow the header of an empty container
    #[error("payload present after empty tree")]
    UnexpectedPayload,
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
