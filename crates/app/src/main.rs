//! huffpack: command-line front end for huffpack-core.
//!
//! Drives the encode/decode/count pipelines, shows a single progress line on
//! stderr and turns errors into a message plus a non-zero exit code.

mod config;
mod input_gen;
mod report;

use std::io::{self, Cursor, Write};
use std::process::ExitCode;

use config::{Command, Config, Parsed};
use huffpack_core::code_table::CodeTable;
use huffpack_core::metrics::Metrics;
use huffpack_core::pipeline::{self, Phase, COUNT_PHASES, DECODE_PHASES, ENCODE_PHASES};
use huffpack_core::progress::ProgressSink;
use huffpack_core::tree::PrefixTree;
use huffpack_core::{Error, ErrorKind};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(Parsed::Run(config)) => config,
        Ok(Parsed::Help) => {
            config::print_help();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    init_logging(config.verbose);
    log::debug!("{:?}", config);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", alert_title(e.kind()), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn alert_title(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::BadSignature => "Not a huffman file",
        ErrorKind::BadHeader => "Corrupted huffman header",
        ErrorKind::BadPayload => "Corrupted huffman data",
        ErrorKind::ExpandedOutput => "Encoding refused",
        ErrorKind::Io => "I/O error",
        ErrorKind::Usage => "Usage error",
    }
}

fn run(config: &Config) -> huffpack_core::Result<()> {
    match &config.command {
        Command::Encode { input, output } => {
            let mut status = StatusLine::new(ENCODE_PHASES, config.show_progress);
            let result = pipeline::encode_file(input, output, config.encode_options(), &mut status);
            status.finish();
            let encoded = result?;

            if config.show_counts {
                report::print_counts(&encoded.frequencies);
            }
            if config.show_codes {
                report::print_codes(&encoded.codes);
            }
            finish_metrics(config, &encoded.metrics);
        }
        Command::Decode { input, output } => {
            let mut status = StatusLine::new(DECODE_PHASES, config.show_progress);
            let result = pipeline::decode_file(input, output, &mut status);
            status.finish();
            let decoded = result?;

            if config.show_counts {
                log::warn!("counts are not stored in the container; use `count` on the output");
            }
            if config.show_codes {
                report::print_codes(&decoded.codes);
            }
            finish_metrics(config, &decoded.metrics);
        }
        Command::Count { input } => {
            let mut status = StatusLine::new(COUNT_PHASES, config.show_progress);
            let result = pipeline::count_file(input, &mut status);
            status.finish();
            let frequencies = result?;

            report::print_counts(&frequencies);
            if config.show_codes {
                let codes = PrefixTree::from_frequencies(&frequencies)
                    .map_or_else(CodeTable::empty, |tree| CodeTable::from_tree(&tree));
                report::print_codes(&codes);
            }
        }
        Command::Demo { seed, size_bytes } => run_demo(config, *seed, *size_bytes)?,
    }
    Ok(())
}

/// Encode and decode generated data in memory and check the result.
fn run_demo(config: &Config, seed: u64, size_bytes: usize) -> huffpack_core::Result<()> {
    if config.print_metrics {
        config.print();
    }
    let data = input_gen::generate_sample_data(seed, size_bytes);

    let mut packed = Vec::new();
    let mut status = StatusLine::new(ENCODE_PHASES, config.show_progress);
    let result = pipeline::encode_stream(
        Cursor::new(&data),
        &mut packed,
        config.encode_options(),
        &mut status,
    );
    status.finish();
    let encoded = result?;

    let mut restored = Vec::with_capacity(data.len());
    let mut status = StatusLine::new(DECODE_PHASES, config.show_progress);
    let packed_len = packed.len() as u64;
    let result = pipeline::decode_stream(&packed[..], &mut restored, packed_len, &mut status);
    status.finish();
    let decoded = result?;

    if restored != data {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("demo round trip mismatch (seed {})", seed),
        )));
    }
    println!(
        "Round trip OK: {} -> {} -> {} bytes",
        data.len(),
        packed.len(),
        restored.len()
    );

    if config.show_counts {
        report::print_counts(&encoded.frequencies);
    }
    if config.show_codes {
        report::print_codes(&encoded.codes);
    }
    finish_metrics(config, &encoded.metrics);
    finish_metrics(config, &decoded.metrics);
    Ok(())
}

fn finish_metrics(config: &Config, metrics: &Metrics) {
    if let Some(text) = metrics_text(config, metrics) {
        print!("{}", text);
    } else if config.print_metrics {
        metrics.print_summary();
    }
}

/// Machine-readable metrics, when asked for.
fn metrics_text(config: &Config, metrics: &Metrics) -> Option<String> {
    (config.print_metrics && config.metrics_text).then(|| metrics.export_text())
}

/// Single-line progress display on stderr.
///
/// Phase-local fractions are mapped onto the whole run; the line is only
/// redrawn when the whole percentage changes.
struct StatusLine {
    phases: &'static [Phase],
    enabled: bool,
    last_percent: Option<u32>,
}

impl StatusLine {
    fn new(phases: &'static [Phase], enabled: bool) -> Self {
        Self {
            phases,
            enabled,
            last_percent: None,
        }
    }

    fn finish(&mut self) {
        if self.enabled && self.last_percent.is_some() {
            eprintln!();
        }
        self.last_percent = None;
    }
}

impl ProgressSink for StatusLine {
    fn report(&mut self, label: &str, fraction: f64) {
        if !self.enabled {
            return;
        }
        let overall = pipeline::overall_progress(self.phases, label, fraction);
        let percent = (overall * 100.0).round() as u32;
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);

        let mut stderr = io::stderr().lock();
        // Progress is best effort; a closed stderr must not fail the run.
        let _ = write!(stderr, "\r{:<36} {:>3}%", label, percent);
        let _ = stderr.flush();
    }
}
