//! huffpack-core: Huffman prefix-code compression with a self-describing container
//!
//! This library provides:
//! - Byte frequency counting over streams
//! - Deterministic Huffman tree construction and code tables
//! - A compact bit-level tree serialization stored in the file header
//! - Streaming payload encode/decode with bounded memory
//! - Phased encode/decode tasks that report progress as they go
//!
//! # Architecture
//!
//! - `frequency`: Byte occurrence counts
//! - `tree`: Prefix tree built from the counts
//! - `code_table`: Per-symbol bit codes derived from the tree
//! - `tree_codec`: Tree serialization for the header
//! - `bitio`: Low-level bit reading/writing
//! - `container`: Header layout, size accounting, payload streaming
//! - `pipeline`: Ordered phases for encode, decode and count
//! - `progress`: Progress reporting hooks
//! - `metrics`: Per-run statistics
//!
//! # Design Principles
//!
//! - **No panics**: Malformed input is reported as a structured error
//! - **Bounded memory**: Payloads are streamed, never held whole
//! - **Deterministic**: The same input always yields the same container bytes

pub mod bitio;
pub mod code_table;
pub mod container;
pub mod error;
pub mod frequency;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod tree;
pub mod tree_codec;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{decode, encode, EncodeOptions, PhasedTask};
