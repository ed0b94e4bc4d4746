//! Configuration for the huffpack application.
//!
//! Handles parsing command-line arguments into a [`Config`]. The first
//! positional argument selects the command; paths follow it.
//!
//! # Philosophy
//!
//! `huffpack demo` works with no other arguments, using a time-based seed
//! that is printed so the run can be repeated with `--seed`.

use huffpack_core::container::DEFAULT_FLUSH_BITS;
use huffpack_core::EncodeOptions;
use std::path::PathBuf;

/// Default size of generated demo data.
pub const DEFAULT_DEMO_BYTES: usize = 256 * 1024;

/// What to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Compress `input` into `output`
    Encode { input: PathBuf, output: PathBuf },
    /// Decompress `input` into `output`
    Decode { input: PathBuf, output: PathBuf },
    /// Print the frequency table of `input`
    Count { input: PathBuf },
    /// Generate sample data, encode and decode it in memory, verify
    Demo { seed: u64, size_bytes: usize },
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub command: Command,

    // === Encoding ===
    /// Write the container even when it is larger than the input
    pub force: bool,

    /// Buffered payload bits before a flush
    pub flush_threshold_bits: usize,

    // === Output ===
    /// Print the character count table
    pub show_counts: bool,

    /// Print the character encoding table
    pub show_codes: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,

    /// Print metrics as `key=value` lines instead of the summary
    pub metrics_text: bool,

    /// Whether to show the progress line on stderr
    pub show_progress: bool,

    /// Log at debug level
    pub verbose: bool,
}

/// Outcome of argument parsing.
#[derive(Debug)]
pub enum Parsed {
    Run(Config),
    Help,
}

impl Config {
    /// Parse configuration from command-line arguments (without the program name).
    pub fn from_args(args: &[String]) -> Result<Parsed, String> {
        let mut positional: Vec<&str> = Vec::new();
        let mut seed: Option<u64> = None;
        let mut size_bytes: Option<usize> = None;
        let mut flush_threshold_bits: Option<usize> = None;
        let mut force = false;
        let mut show_counts = false;
        let mut show_codes = false;
        let mut print_metrics = true;
        let mut metrics_text = false;
        let mut show_progress = true;
        let mut verbose = false;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--size" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--size requires a number".to_string());
                    }
                    size_bytes = Some(args[i].parse().map_err(|_| "invalid size")?);
                }
                "--flush-bits" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--flush-bits requires a number".to_string());
                    }
                    flush_threshold_bits = Some(args[i].parse().map_err(|_| "invalid flush-bits")?);
                }
                "--force" | "-f" => {
                    force = true;
                }
                "--show-counts" => {
                    show_counts = true;
                }
                "--show-codes" => {
                    show_codes = true;
                }
                "--no-metrics" => {
                    print_metrics = false;
                }
                "--metrics-text" => {
                    metrics_text = true;
                }
                "--quiet" | "-q" => {
                    show_progress = false;
                }
                "--verbose" | "-v" => {
                    verbose = true;
                }
                "--help" | "-h" => {
                    return Ok(Parsed::Help);
                }
                arg if arg.starts_with('-') => {
                    return Err(format!("unknown argument: {}", arg));
                }
                arg => positional.push(arg),
            }
            i += 1;
        }

        let command = match positional.as_slice() {
            ["encode", input, output] => Command::Encode {
                input: PathBuf::from(input),
                output: PathBuf::from(output),
            },
            ["decode", input, output] => Command::Decode {
                input: PathBuf::from(input),
                output: PathBuf::from(output),
            },
            ["count", input] => Command::Count {
                input: PathBuf::from(input),
            },
            ["demo"] => Command::Demo {
                seed: seed.unwrap_or_else(time_seed),
                size_bytes: size_bytes.unwrap_or(DEFAULT_DEMO_BYTES),
            },
            ["encode" | "decode", ..] => {
                return Err(format!("{} requires <IN> and <OUT> paths", positional[0]));
            }
            ["count", ..] => return Err("count requires an <IN> path".to_string()),
            ["demo", ..] => return Err("demo takes no paths".to_string()),
            [] => return Err("missing command (encode, decode, count or demo)".to_string()),
            [other, ..] => return Err(format!("unknown command: {}", other)),
        };

        let flush_threshold_bits = flush_threshold_bits.unwrap_or(DEFAULT_FLUSH_BITS);
        if flush_threshold_bits == 0 {
            return Err("--flush-bits must be positive".to_string());
        }

        Ok(Parsed::Run(Config {
            command,
            force,
            flush_threshold_bits,
            show_counts,
            show_codes,
            print_metrics,
            metrics_text,
            show_progress,
            verbose,
        }))
    }

    /// Core-side encode settings.
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            force: self.force,
            flush_threshold_bits: self.flush_threshold_bits,
        }
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.command {
            Command::Encode { input, output } => {
                println!("Command: encode");
                println!("Input file:  {}", input.display());
                println!("Output file: {}", output.display());
            }
            Command::Decode { input, output } => {
                println!("Command: decode");
                println!("Input file:  {}", input.display());
                println!("Output file: {}", output.display());
            }
            Command::Count { input } => {
                println!("Command: count");
                println!("Input file:  {}", input.display());
            }
            Command::Demo { seed, size_bytes } => {
                println!("Command: demo");
                println!("Seed: {}", seed);
                println!("Sample size: {} bytes ({} KiB)", size_bytes, size_bytes / 1024);
            }
        }
        println!("Force: {}", self.force);
        println!("Flush threshold: {} bits", self.flush_threshold_bits);
        println!();
    }
}

fn time_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn print_help() {
    println!("huffpack: Huffman compression with a self-describing container");
    println!();
    println!("USAGE:");
    println!("    huffpack encode <IN> <OUT> [OPTIONS]");
    println!("    huffpack decode <IN> <OUT> [OPTIONS]");
    println!("    huffpack count <IN> [OPTIONS]");
    println!("    huffpack demo [--seed <N>] [--size <N>] [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --force, -f             Encode even if the output is larger than the input");
    println!(
        "    --flush-bits <N>        Payload bits buffered before a write (default: {})",
        DEFAULT_FLUSH_BITS
    );
    println!("    --seed <N>              Demo data seed (default: time-based)");
    println!(
        "    --size <N>              Demo data size in bytes (default: {})",
        DEFAULT_DEMO_BYTES
    );
    println!();
    println!("    --show-counts           Print the character count table");
    println!("    --show-codes            Print the character encoding table");
    println!("    --no-metrics            Don't print metrics summary");
    println!("    --metrics-text          Print metrics as key=value lines");
    println!("    --quiet, -q             No progress line");
    println!("    --verbose, -v           Debug logging (RUST_LOG also works)");
    println!("    --help, -h              Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    huffpack encode notes.txt notes.huff");
    println!("    huffpack decode notes.huff notes.txt");
    println!("    huffpack count notes.txt --show-counts");
    println!("    huffpack demo --seed 42");
    println!();
}
