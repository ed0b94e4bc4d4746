//! Metrics collection and reporting for one encode or decode run.
//!
//! Tracks sizes, symbol statistics and timing. Filled in by the pipeline
//! phases as they complete and read by the front end once the run ends.
//!
//! # Thread Safety
//!
//! `Metrics` is plain data owned by a single run; nothing is shared
//! between runs.

use std::time::{Duration, Instant};

/// Which direction a run went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Decode,
    Count,
}

/// Statistics for one run.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub direction: Direction,

    // === Timing ===
    /// When the run started
    pub start_time: Instant,

    /// When the run ended (set on completion)
    pub end_time: Option<Instant>,

    // === Input/Output ===
    /// Bytes read from the source
    pub input_bytes: u64,

    /// Bytes written to the destination
    pub output_bytes: u64,

    // === Container ===
    /// Header bytes (signature, leaf count, tree, padding field)
    pub header_bytes: u64,

    /// Meaningful payload bits
    pub payload_bits: u64,

    /// Filler bits in the final payload byte
    pub payload_padding: u8,

    // === Symbols ===
    /// Distinct symbols (tree leaves)
    pub distinct_symbols: usize,

    /// Longest code length in bits
    pub max_code_len: usize,
}

impl Metrics {
    /// Create new metrics with start time set to now.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            start_time: Instant::now(),
            end_time: None,
            input_bytes: 0,
            output_bytes: 0,
            header_bytes: 0,
            payload_bits: 0,
            payload_padding: 0,
            distinct_symbols: 0,
            max_code_len: 0,
        }
    }

    /// Mark the run as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Uncompressed and compressed sizes, whichever way the run went.
    fn sizes(&self) -> (u64, u64) {
        match self.direction {
            Direction::Encode | Direction::Count => (self.input_bytes, self.output_bytes),
            Direction::Decode => (self.output_bytes, self.input_bytes),
        }
    }

    /// Compute compression ratio (compressed / uncompressed).
    ///
    /// Returns 0.0 if there is no uncompressed data.
    pub fn compression_ratio(&self) -> f64 {
        let (raw, packed) = self.sizes();
        if raw == 0 {
            0.0
        } else {
            packed as f64 / raw as f64
        }
    }

    /// Average bits per source symbol in the payload.
    pub fn bits_per_symbol(&self) -> f64 {
        let (raw, _) = self.sizes();
        if raw == 0 {
            0.0
        } else {
            self.payload_bits as f64 / raw as f64
        }
    }

    /// Compute throughput in bytes/second.
    pub fn throughput_bps(&self) -> f64 {
        let duration_secs = self.duration().as_secs_f64();
        if duration_secs == 0.0 {
            0.0
        } else {
            self.input_bytes as f64 / duration_secs
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        let (raw, packed) = self.sizes();

        println!("\n=== {:?} Summary ===", self.direction);
        println!("Duration: {} ms", self.duration().as_millis());
        println!();
        println!("Input:  {} bytes ({:.2} MiB)", self.input_bytes, self.input_bytes as f64 / 1024.0 / 1024.0);
        println!("Output: {} bytes ({:.2} MiB)", self.output_bytes, self.output_bytes as f64 / 1024.0 / 1024.0);
        println!();

        println!("=== Container ===");
        println!("Distinct symbols: {}", self.distinct_symbols);
        println!("Longest code: {} bits", self.max_code_len);
        println!("Header: {} bytes", self.header_bytes);
        println!("Payload: {} bits (+{} padding)", self.payload_bits, self.payload_padding);
        if self.direction != Direction::Count {
            println!("Ratio: {:.1}% ({} -> {} bytes)", self.compression_ratio() * 100.0, raw, packed);
            println!("Bits per symbol: {:.3}", self.bits_per_symbol());
        }
        println!();

        println!("=== Performance ===");
        println!("Throughput: {:.2} MB/s", self.throughput_bps() / 1_000_000.0);
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "direction={:?}\n\
             duration_ms={}\n\
             input_bytes={}\n\
             output_bytes={}\n\
             header_bytes={}\n\
             payload_bits={}\n\
             payload_padding={}\n\
             distinct_symbols={}\n\
             max_code_len={}\n\
             compression_ratio={:.4}\n",
            self.direction,
            self.duration().as_millis(),
            self.input_bytes,
            self.output_bytes,
            self.header_bytes,
            self.payload_bits,
            self.payload_padding,
            self.distinct_symbols,
            self.max_code_len,
            self.compression_ratio(),
        )
    }
}
