//! A plain text element type for sumrope, plus helpers for generating random test content. It's
//! used by the integration tests, doc tests and benchmarks.

use rand::Rng;
use str_indices::chars;
use sumrope::{Element, Metric, Rope, Summary};

/// Chunks smaller than this get merged with a neighbour.
pub const MIN_CHUNK_BYTES: usize = 4;
/// Neighbouring chunks are only merged if the result fits in this many bytes.
pub const MAX_CHUNK_BYTES: usize = 64;

/// A run of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunk(String);

impl Chunk {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Chunk(s.to_string())
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkSummary {
    pub chunks: usize,
    pub bytes: usize,
    pub chars: usize,
}

impl Summary for ChunkSummary {
    const MAX_CHILDREN: usize = 16;
    const CHILD_COUNT_BITS: u32 = 4;

    fn zero() -> Self { Self::default() }

    fn is_zero(&self) -> bool { *self == Self::default() }

    fn add(&mut self, other: &Self) {
        self.chunks += other.chunks;
        self.bytes += other.bytes;
        self.chars += other.chars;
    }

    fn subtract(&mut self, other: &Self) {
        self.chunks -= other.chunks;
        self.bytes -= other.bytes;
        self.chars -= other.chars;
    }
}

impl Element for Chunk {
    type Summary = ChunkSummary;

    fn summary(&self) -> ChunkSummary {
        ChunkSummary {
            chunks: 1,
            bytes: self.0.len(),
            chars: chars::count(&self.0),
        }
    }

    /// Chunks are indexed by byte.
    fn len(&self) -> usize { self.0.len() }

    fn is_undersized(&self) -> bool { self.0.len() < MIN_CHUNK_BYTES }

    fn split_off(&mut self, at: usize) -> Self {
        Chunk(self.0.split_off(at))
    }

    fn rebalance_with_next(&mut self, next: &mut Self) -> bool {
        if self.0.len() + next.0.len() <= MAX_CHUNK_BYTES {
            self.0.push_str(&next.0);
            next.0.clear();
            return true;
        }

        // Too big to merge, so at least one side has plenty to spare. Move characters across
        // until neither side is undersized.
        while self.0.len() < MIN_CHUNK_BYTES && !next.0.is_empty() {
            let c = next.0.remove(0);
            self.0.push(c);
        }
        while next.0.len() < MIN_CHUNK_BYTES {
            let Some(c) = self.0.pop() else { break; };
            next.0.insert(0, c);
        }
        false
    }

    fn rebalance_with_prev(&mut self, prev: &mut Self) -> bool {
        if prev.0.len() + self.0.len() <= MAX_CHUNK_BYTES {
            prev.0.push_str(&self.0);
            self.0 = std::mem::take(&mut prev.0);
            return true;
        }
        prev.rebalance_with_next(self)
    }

    fn check(&self) {
        assert!(!self.0.is_empty());
    }
}

/// Addresses text by byte offset. Offsets must land on character boundaries when they're used to
/// split a chunk.
pub struct Bytes;

impl Metric<Chunk> for Bytes {
    fn size(&self, summary: &ChunkSummary) -> usize { summary.bytes }

    fn index(&self, offset: usize, chunk: &Chunk) -> usize {
        assert!(offset <= chunk.0.len());
        offset
    }
}

/// Addresses text by unicode character (codepoint).
pub struct Chars;

impl Metric<Chunk> for Chars {
    fn size(&self, summary: &ChunkSummary) -> usize { summary.chars }

    fn index(&self, offset: usize, chunk: &Chunk) -> usize {
        assert!(offset <= chars::count(&chunk.0));
        chars::to_byte_idx(&chunk.0, offset)
    }
}

/// Addresses text by chunk. Offset n is the start of the nth chunk.
pub struct Chunks;

impl Metric<Chunk> for Chunks {
    fn size(&self, summary: &ChunkSummary) -> usize { summary.chunks }

    fn index(&self, offset: usize, chunk: &Chunk) -> usize {
        assert!(offset <= 1);
        if offset == 0 { 0 } else { chunk.0.len() }
    }
}

/// The full text of a rope of chunks.
pub fn flatten(rope: &Rope<Chunk>) -> String {
    let mut content = String::with_capacity(rope.size(&Bytes));
    for chunk in rope {
        content.push_str(chunk.as_str());
    }
    content
}

pub static UCHARS: [char; 23] = [
    'a', 'b', 'c', '1', '2', '3', ' ', '\n', // ASCII
    '©', '¥', '½', // The Latin-1 suppliment (U+80 - U+ff)
    'Ύ', 'Δ', 'δ', 'Ϡ', // Greek (U+0370 - U+03FF)
    '←', '↯', '↻', '⇈', // Arrows (U+2190 – U+21FF)
    '𐆐', '𐆔', '𐆘', '𐆚', // Ancient roman symbols (U+10190 – U+101CF)
];

pub fn random_unicode_string<R: Rng>(rng: &mut R, len: usize) -> String {
    let mut s = String::new();
    for _ in 0..len {
        s.push(UCHARS[rng.gen_range(0..UCHARS.len())]);
    }
    s
}

const ASCII: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789 ";

pub fn random_ascii_string<R: Rng>(rng: &mut R, len: usize) -> String {
    let mut s = String::new();
    for _ in 0..len {
        s.push(ASCII[rng.gen_range(0..ASCII.len())] as char);
    }
    s
}

/// `n` chunks of 1-16 random characters. Plenty of these will be undersized.
pub fn random_chunks<R: Rng>(rng: &mut R, n: usize) -> Vec<Chunk> {
    (0..n).map(|_| {
        let len = rng.gen_range(1..=16);
        Chunk::from(random_unicode_string(&mut *rng, len))
    }).collect()
}

/// `n` chunks of `len` copies of a single digit. Chunk i is made from digit i % 10, so it's easy
/// to see where content came from.
pub fn digit_chunks(n: usize, len: usize) -> Vec<Chunk> {
    (0..n).map(|i| {
        let digit = char::from(b'0' + (i % 10) as u8);
        Chunk::from(std::iter::repeat(digit).take(len).collect::<String>())
    }).collect()
}

/// Cut a string into chunks of at most `max_bytes` bytes, on character boundaries.
pub fn chunk_str(s: &str, max_bytes: usize) -> Vec<Chunk> {
    assert!(max_bytes >= 4);
    let mut chunks = vec![];
    let mut rest = s;
    while !rest.is_empty() {
        let mut end = max_bytes.min(rest.len());
        while !rest.is_char_boundary(end) { end -= 1; }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(Chunk::from(chunk));
        rest = tail;
    }
    chunks
}
