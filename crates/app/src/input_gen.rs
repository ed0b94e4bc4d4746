//! Sample data for the `demo` command.
//!
//! Huffman coding only pays off when some bytes are much more common than
//! others, so the sample mixes sections with very different symbol
//! distributions:
//! - prose built from a small word list (skewed, compresses well)
//! - long runs of one byte (one dominant symbol)
//! - uniformly random bytes (flat, will not compress)
//!
//! The mix shows up directly in the code table and the ratio.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const WORDS: &[&str] = &[
    "the", "of", "and", "to", "in", "is", "that", "for", "it", "as", "was", "with", "be", "by",
    "on", "not", "he", "this", "are", "or", "his", "from", "at", "which", "but", "have", "an",
    "had", "they", "you", "were", "their", "one", "all", "we", "can", "her", "has", "there",
    "been", "if", "more", "when", "will", "would", "who", "so", "no",
];

/// Section size before switching to another kind of content.
const SECTION_BYTES: usize = 4096;

/// Generate `size_bytes` of mixed sample data from `seed`.
pub fn generate_sample_data(seed: u64, size_bytes: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(size_bytes + SECTION_BYTES);

    while data.len() < size_bytes {
        let section = SECTION_BYTES.min(size_bytes - data.len());
        match rng.gen_range(0..10) {
            // 70% prose
            0..=6 => push_prose(&mut rng, &mut data, section),
            // 20% runs
            7..=8 => {
                let byte: u8 = rng.gen();
                let run = rng.gen_range(1..=section);
                data.extend(std::iter::repeat(byte).take(run));
            }
            // 10% noise
            _ => data.extend((0..section).map(|_| rng.gen::<u8>())),
        }
    }

    data.truncate(size_bytes);
    data
}

fn push_prose(rng: &mut ChaCha8Rng, data: &mut Vec<u8>, len: usize) {
    let end = data.len() + len;
    let mut sentence_start = true;
    while data.len() < end {
        let word = WORDS.choose(rng).copied().unwrap_or("the");
        let mut bytes = word.as_bytes().to_vec();
        if sentence_start {
            bytes[0] = bytes[0].to_ascii_uppercase();
            sentence_start = false;
        }
        data.extend_from_slice(&bytes);

        if rng.gen_bool(0.1) {
            data.extend_from_slice(if rng.gen_bool(0.2) { b".\n" } else { b". " });
            sentence_start = true;
        } else if rng.gen_bool(0.08) {
            data.extend_from_slice(b", ");
        } else {
            data.push(b' ');
        }
    }
}
