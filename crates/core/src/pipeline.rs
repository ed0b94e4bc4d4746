//! Encode and decode pipelines as ordered lists of phases.
//!
//! A front end drives a task one phase at a time, showing each phase's label
//! and progress however it likes, and can stop between phases to cancel.
//! The tasks themselves never spawn threads or touch a UI.
//!
//! # Phases
//!
//! ```text
//! encode: count -> build tree -> build codes -> verify size -> write
//! decode: verify signature -> extract tree -> decode payload
//! count:  count
//! ```
//!
//! Each [`Phase`] carries the overall-progress fraction at which it starts,
//! so a single progress bar can span the whole run.
//!
//! # Example
//! ```
//! use huffpack_core::pipeline::{decode, encode};
//! use huffpack_core::progress::NoProgress;
//!
//! let packed = encode(b"AAAB", true, &mut NoProgress).unwrap();
//! let unpacked = decode(&packed, &mut NoProgress).unwrap();
//! assert_eq!(unpacked, b"AAAB");
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::code_table::CodeTable;
use crate::container::{self, Header, SizeReport, DEFAULT_FLUSH_BITS};
use crate::error::{Error, Result};
use crate::frequency::{ByteFrequencyTable, READ_BUFFER_SIZE};
use crate::metrics::{Direction, Metrics};
use crate::progress::{PhaseProgress, ProgressSink};
use crate::tree::PrefixTree;
use crate::tree_codec;

/// One named step of a task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phase {
    pub label: &'static str,
    /// Overall progress when this phase begins.
    pub start: f64,
}

impl Phase {
    pub const fn new(label: &'static str, start: f64) -> Self {
        Self { label, start }
    }
}

pub const ENCODE_PHASES: &[Phase] = &[
    Phase::new("Counting character occurrences...", 0.0),
    Phase::new("Building huffman tree...", 0.45),
    Phase::new("Encoding characters...", 0.5),
    Phase::new("Verifying encoding size...", 0.6),
    Phase::new("Writing to destination...", 0.7),
];

pub const DECODE_PHASES: &[Phase] = &[
    Phase::new("Verifying huffman file...", 0.0),
    Phase::new("Extracting huffman tree...", 0.1),
    Phase::new("Decoding file...", 0.7),
];

pub const COUNT_PHASES: &[Phase] = &[Phase::new("Counting character occurrences...", 0.0)];

/// Map a phase-local fraction onto the whole run.
///
/// Unknown labels map to 0.
pub fn overall_progress(phases: &[Phase], label: &str, fraction: f64) -> f64 {
    let Some(index) = phases.iter().position(|p| p.label == label) else {
        return 0.0;
    };
    let start = phases[index].start;
    let end = phases.get(index + 1).map_or(1.0, |p| p.start);
    start + (end - start) * fraction.clamp(0.0, 1.0)
}

/// A task made of phases that must run in order.
pub trait PhasedTask {
    fn phases(&self) -> &'static [Phase];

    /// Index of the next phase to run; equals `phases().len()` when done.
    fn next_phase(&self) -> usize;

    /// Run phase `index`, which must be `next_phase()`.
    fn run_phase(&mut self, index: usize, progress: &mut dyn ProgressSink) -> Result<()>;

    /// Run every remaining phase.
    fn run_all(&mut self, progress: &mut dyn ProgressSink) -> Result<()> {
        for index in self.next_phase()..self.phases().len() {
            self.run_phase(index, progress)?;
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.next_phase() >= self.phases().len()
    }
}

fn check_order(phases: &'static [Phase], next: usize, index: usize) -> Result<&'static Phase> {
    match phases.get(index) {
        Some(phase) if index == next => Ok(phase),
        Some(phase) => Err(Error::OutOfOrder { phase: phase.label }),
        None => Err(Error::OutOfOrder { phase: "unknown" }),
    }
}

/// Encode settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Write the container even if it is larger than the input
    pub force: bool,
    /// Buffered payload bits before a flush to the sink
    pub flush_threshold_bits: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            force: false,
            flush_threshold_bits: DEFAULT_FLUSH_BITS,
        }
    }
}

impl EncodeOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }
}

/// Encode pipeline over a seekable source.
///
/// The source is read twice: once to count, once to encode.
pub struct EncodeTask<R, W> {
    source: R,
    sink: W,
    options: EncodeOptions,
    next: usize,
    source_len: u64,
    frequencies: ByteFrequencyTable,
    tree: Option<PrefixTree>,
    codes: CodeTable,
    sizes: Option<SizeReport>,
    metrics: Metrics,
}

impl<R: Read + Seek, W: Write> EncodeTask<R, W> {
    pub fn new(source: R, sink: W, options: EncodeOptions) -> Self {
        Self {
            source,
            sink,
            options,
            next: 0,
            source_len: 0,
            frequencies: ByteFrequencyTable::new(),
            tree: None,
            codes: CodeTable::empty(),
            sizes: None,
            metrics: Metrics::new(Direction::Encode),
        }
    }

    fn count(&mut self, progress: &mut PhaseProgress<'_>) -> Result<()> {
        if self.options.flush_threshold_bits == 0 {
            return Err(Error::Config(
                "flush threshold must be at least one bit".to_string(),
            ));
        }
        self.source_len = self.source.seek(SeekFrom::End(0))?;
        self.source.seek(SeekFrom::Start(0))?;

        self.frequencies =
            ByteFrequencyTable::from_reader(&mut self.source, self.source_len, progress)?;
        self.metrics.input_bytes = self.frequencies.total_bytes();
        self.metrics.distinct_symbols = self.frequencies.non_zero_symbol_count();

        log::debug!(
            "counted {} bytes, {} distinct symbols",
            self.metrics.input_bytes,
            self.metrics.distinct_symbols
        );
        Ok(())
    }

    fn build_tree(&mut self, progress: &mut PhaseProgress<'_>) -> Result<()> {
        self.tree = PrefixTree::from_frequencies(&self.frequencies);
        progress.finish();
        Ok(())
    }

    fn build_codes(&mut self, progress: &mut PhaseProgress<'_>) -> Result<()> {
        self.codes = self
            .tree
            .as_ref()
            .map_or_else(CodeTable::empty, CodeTable::from_tree);
        let sizes = SizeReport::compute(&self.frequencies, self.tree.as_ref(), &self.codes);

        self.metrics.header_bytes = sizes.header_bytes;
        self.metrics.payload_bits = sizes.payload_bits;
        self.metrics.payload_padding = sizes.payload_padding();
        self.metrics.max_code_len = self.codes.max_len();
        self.sizes = Some(sizes);

        log::debug!(
            "projected size: {} header + {} payload bits = {} bytes (from {})",
            sizes.header_bytes,
            sizes.payload_bits,
            sizes.compressed_bytes,
            sizes.uncompressed_bytes
        );
        progress.finish();
        Ok(())
    }

    fn verify_size(&mut self, progress: &mut PhaseProgress<'_>) -> Result<()> {
        let sizes = self.sizes.ok_or(Error::OutOfOrder {
            phase: ENCODE_PHASES[2].label,
        })?;

        if sizes.would_expand() {
            if !self.options.force {
                return Err(Error::ExpandedOutput {
                    compressed: sizes.compressed_bytes,
                    uncompressed: sizes.uncompressed_bytes,
                });
            }
            log::warn!(
                "forcing an expanding encode: {} -> {} bytes",
                sizes.uncompressed_bytes,
                sizes.compressed_bytes
            );
        }
        progress.finish();
        Ok(())
    }

    fn write(&mut self, progress: &mut PhaseProgress<'_>) -> Result<()> {
        let sizes = self.sizes.ok_or(Error::OutOfOrder {
            phase: ENCODE_PHASES[2].label,
        })?;
        let serialized = self.tree.as_ref().map(tree_codec::serialize);

        self.source.seek(SeekFrom::Start(0))?;
        let header_bytes = container::write_header(
            &mut self.sink,
            self.frequencies.non_zero_symbol_count(),
            serialized.as_ref(),
            sizes.payload_padding(),
        )?;
        let padding = container::encode_payload(
            &self.codes,
            &mut self.source,
            &mut self.sink,
            self.options.flush_threshold_bits,
            self.source_len,
            progress,
        )?;
        self.sink.flush()?;
        debug_assert_eq!(padding, sizes.payload_padding());
        debug_assert_eq!(header_bytes, sizes.header_bytes);

        self.metrics.output_bytes = sizes.compressed_bytes;
        self.metrics.complete();
        log::info!(
            "encoded {} bytes into {} bytes",
            self.metrics.input_bytes,
            self.metrics.output_bytes
        );
        Ok(())
    }

    pub fn frequencies(&self) -> &ByteFrequencyTable {
        &self.frequencies
    }

    pub fn tree(&self) -> Option<&PrefixTree> {
        self.tree.as_ref()
    }

    pub fn code_table(&self) -> &CodeTable {
        &self.codes
    }

    /// Projected sizes, available once codes are built.
    pub fn size_report(&self) -> Option<SizeReport> {
        self.sizes
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn into_inner(self) -> (R, W) {
        (self.source, self.sink)
    }
}

impl<R: Read + Seek, W: Write> PhasedTask for EncodeTask<R, W> {
    fn phases(&self) -> &'static [Phase] {
        ENCODE_PHASES
    }

    fn next_phase(&self) -> usize {
        self.next
    }

    fn run_phase(&mut self, index: usize, progress: &mut dyn ProgressSink) -> Result<()> {
        let phase = check_order(ENCODE_PHASES, self.next, index)?;
        let mut progress = PhaseProgress::new(progress, phase.label);
        match index {
            0 => self.count(&mut progress)?,
            1 => self.build_tree(&mut progress)?,
            2 => self.build_codes(&mut progress)?,
            3 => self.verify_size(&mut progress)?,
            _ => self.write(&mut progress)?,
        }
        self.next += 1;
        Ok(())
    }
}

/// Decode pipeline.
pub struct DecodeTask<R, W> {
    source: R,
    sink: W,
    /// Total source length if known; only scales progress
    len_hint: u64,
    next: usize,
    header: Option<Header>,
    codes: CodeTable,
    metrics: Metrics,
}

impl<R: Read, W: Write> DecodeTask<R, W> {
    pub fn new(source: R, sink: W) -> Self {
        Self {
            source,
            sink,
            len_hint: 0,
            next: 0,
            header: None,
            codes: CodeTable::empty(),
            metrics: Metrics::new(Direction::Decode),
        }
    }

    /// Tell the task how long the source is, for progress reporting.
    pub fn with_len_hint(mut self, len: u64) -> Self {
        self.len_hint = len;
        self
    }

    fn verify(&mut self, progress: &mut PhaseProgress<'_>) -> Result<()> {
        container::read_signature(&mut self.source)?;
        progress.finish();
        Ok(())
    }

    fn extract_tree(&mut self, progress: &mut PhaseProgress<'_>) -> Result<()> {
        let header = container::read_header_body(&mut self.source)?;
        self.codes = header
            .tree
            .as_ref()
            .map_or_else(CodeTable::empty, CodeTable::from_tree);

        self.metrics.header_bytes = header.byte_len;
        self.metrics.payload_padding = header.payload_padding;
        self.metrics.distinct_symbols = header.leaf_count();
        self.metrics.max_code_len = self.codes.max_len();

        log::debug!(
            "header: {} leaves, {} header bytes, padding {}",
            header.leaf_count(),
            header.byte_len,
            header.payload_padding
        );
        self.header = Some(header);
        progress.finish();
        Ok(())
    }

    fn decode(&mut self, progress: &mut PhaseProgress<'_>) -> Result<()> {
        let header = self.header.as_ref().ok_or(Error::OutOfOrder {
            phase: DECODE_PHASES[1].label,
        })?;

        let payload_len = self.len_hint.saturating_sub(header.byte_len);
        let decoded = container::decode_payload(
            header,
            &mut self.source,
            &mut self.sink,
            payload_len,
            progress,
        )?;
        self.sink.flush()?;

        self.metrics.output_bytes = decoded.written;
        self.metrics.payload_bits = decoded.payload_bits;
        let payload_bytes = (decoded.payload_bits + u64::from(header.payload_padding)).div_ceil(8);
        self.metrics.input_bytes = header.byte_len + payload_bytes;
        self.metrics.complete();
        log::info!(
            "decoded {} bytes from {} bytes",
            self.metrics.output_bytes,
            self.metrics.input_bytes
        );
        Ok(())
    }

    /// Parsed header, available after the tree is extracted.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Code table rebuilt from the stored tree.
    pub fn code_table(&self) -> &CodeTable {
        &self.codes
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn into_inner(self) -> (R, W) {
        (self.source, self.sink)
    }
}

impl<R: Read, W: Write> PhasedTask for DecodeTask<R, W> {
    fn phases(&self) -> &'static [Phase] {
        DECODE_PHASES
    }

    fn next_phase(&self) -> usize {
        self.next
    }

    fn run_phase(&mut self, index: usize, progress: &mut dyn ProgressSink) -> Result<()> {
        let phase = check_order(DECODE_PHASES, self.next, index)?;
        let mut progress = PhaseProgress::new(progress, phase.label);
        match index {
            0 => self.verify(&mut progress)?,
            1 => self.extract_tree(&mut progress)?,
            _ => self.decode(&mut progress)?,
        }
        self.next += 1;
        Ok(())
    }
}

/// Count-only pipeline: the frequency table without any output.
pub struct CountTask<R> {
    source: R,
    len_hint: u64,
    next: usize,
    frequencies: ByteFrequencyTable,
    metrics: Metrics,
}

impl<R: Read> CountTask<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            len_hint: 0,
            next: 0,
            frequencies: ByteFrequencyTable::new(),
            metrics: Metrics::new(Direction::Count),
        }
    }

    pub fn with_len_hint(mut self, len: u64) -> Self {
        self.len_hint = len;
        self
    }

    pub fn frequencies(&self) -> &ByteFrequencyTable {
        &self.frequencies
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn into_frequencies(self) -> ByteFrequencyTable {
        self.frequencies
    }
}

impl<R: Read> PhasedTask for CountTask<R> {
    fn phases(&self) -> &'static [Phase] {
        COUNT_PHASES
    }

    fn next_phase(&self) -> usize {
        self.next
    }

    fn run_phase(&mut self, index: usize, progress: &mut dyn ProgressSink) -> Result<()> {
        let phase = check_order(COUNT_PHASES, self.next, index)?;
        let mut progress = PhaseProgress::new(progress, phase.label);
        self.frequencies =
            ByteFrequencyTable::from_reader(&mut self.source, self.len_hint, &mut progress)?;
        self.metrics.input_bytes = self.frequencies.total_bytes();
        self.metrics.distinct_symbols = self.frequencies.non_zero_symbol_count();
        self.metrics.complete();
        self.next += 1;
        Ok(())
    }
}

/// What an encode produced, for display by the caller.
#[derive(Debug, Clone)]
pub struct EncodeReport {
    pub metrics: Metrics,
    pub frequencies: ByteFrequencyTable,
    pub codes: CodeTable,
    pub sizes: SizeReport,
}

/// What a decode produced, for display by the caller.
#[derive(Debug, Clone)]
pub struct DecodeReport {
    pub metrics: Metrics,
    pub codes: CodeTable,
}

/// Compress an in-memory buffer.
///
/// # Errors
/// `Error::ExpandedOutput` if the container would be larger than `source`
/// and `force` is off.
pub fn encode(source: &[u8], force: bool, progress: &mut dyn ProgressSink) -> Result<Vec<u8>> {
    let options = EncodeOptions {
        force,
        ..EncodeOptions::default()
    };
    let mut task = EncodeTask::new(Cursor::new(source), Vec::new(), options);
    task.run_all(progress)?;
    let (_, out) = task.into_inner();
    Ok(out)
}

/// Decompress an in-memory container.
pub fn decode(compressed: &[u8], progress: &mut dyn ProgressSink) -> Result<Vec<u8>> {
    let mut task = DecodeTask::new(compressed, Vec::new()).with_len_hint(compressed.len() as u64);
    task.run_all(progress)?;
    let (_, out) = task.into_inner();
    Ok(out)
}

/// Compress a seekable stream into `sink`.
pub fn encode_stream<R: Read + Seek, W: Write>(
    source: R,
    sink: W,
    options: EncodeOptions,
    progress: &mut dyn ProgressSink,
) -> Result<EncodeReport> {
    let mut task = EncodeTask::new(source, sink, options);
    task.run_all(progress)?;
    let sizes = task.size_report().ok_or(Error::OutOfOrder {
        phase: ENCODE_PHASES[2].label,
    })?;
    Ok(EncodeReport {
        metrics: task.metrics,
        frequencies: task.frequencies,
        codes: task.codes,
        sizes,
    })
}

/// Decompress a stream into `sink`. `len_hint` only scales progress.
pub fn decode_stream<R: Read, W: Write>(
    source: R,
    sink: W,
    len_hint: u64,
    progress: &mut dyn ProgressSink,
) -> Result<DecodeReport> {
    let mut task = DecodeTask::new(source, sink).with_len_hint(len_hint);
    task.run_all(progress)?;
    Ok(DecodeReport {
        metrics: task.metrics,
        codes: task.codes,
    })
}

/// Compress the file at `src` into a new file at `dst`.
///
/// `dst` is only created once there is something to write; if the run fails
/// after that, the partial file is removed.
pub fn encode_file(
    src: &Path,
    dst: &Path,
    options: EncodeOptions,
    progress: &mut dyn ProgressSink,
) -> Result<EncodeReport> {
    let source = BufReader::with_capacity(READ_BUFFER_SIZE, File::open(src)?);
    let mut sink = DestinationFile::new(dst);
    let result = encode_stream(source, &mut sink, options, progress).and_then(|report| {
        sink.commit()?;
        Ok(report)
    });
    if result.is_err() {
        sink.discard();
    }
    result
}

/// Decompress the file at `src` into a new file at `dst`.
///
/// `dst` is removed again if decoding fails after it was created.
pub fn decode_file(
    src: &Path,
    dst: &Path,
    progress: &mut dyn ProgressSink,
) -> Result<DecodeReport> {
    let file = File::open(src)?;
    let len = file.metadata()?.len();
    let source = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut sink = DestinationFile::new(dst);
    let result = decode_stream(source, &mut sink, len, progress).and_then(|report| {
        sink.commit()?;
        Ok(report)
    });
    if result.is_err() {
        sink.discard();
    }
    result
}

/// Count the symbols of the file at `src`.
pub fn count_file(src: &Path, progress: &mut dyn ProgressSink) -> Result<ByteFrequencyTable> {
    let file = File::open(src)?;
    let len = file.metadata()?.len();
    let source = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut task = CountTask::new(source).with_len_hint(len);
    task.run_all(progress)?;
    Ok(task.into_frequencies())
}

/// Output file that is created on first write.
///
/// Failing before any output exists leaves the destination path untouched;
/// failing afterwards lets the caller `discard` what was written.
#[derive(Debug)]
pub struct DestinationFile {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl DestinationFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn open(&mut self) -> io::Result<&mut BufWriter<File>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                log::debug!("creating {}", self.path.display());
                BufWriter::with_capacity(READ_BUFFER_SIZE, File::create(&self.path)?)
            }
        };
        Ok(self.file.insert(file))
    }

    /// Make sure the file exists (even if empty) and is flushed.
    pub fn commit(&mut self) -> io::Result<()> {
        self.open()?.flush()
    }

    /// Remove the file if this writer created it.
    pub fn discard(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("failed to remove partial output {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Write for DestinationFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.open()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
