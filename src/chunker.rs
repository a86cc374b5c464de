//! Recursive character chunking for the RAG index
//!
//! Splits text into ~1000-byte windows with ~200-byte overlap, preferring
//! paragraph breaks, then lines, sentences, clauses, and finally single
//! spaces. Only text with no separators at all is hard-split by character
//! count.

/// Separator preference order, coarsest first.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", ", ", " "];

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split text into overlapping chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_with_separators(text, &SEPARATORS)
    }

    fn split_with_separators(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // Pick the coarsest separator actually present in the text
        let (separator, finer) = match separators
            .iter()
            .position(|s| text.contains(s))
        {
            Some(i) => (separators[i], &separators[i + 1..]),
            None => return self.hard_split(text),
        };

        let mut chunks = Vec::new();
        let mut run: Vec<&str> = Vec::new();

        for piece in text.split(separator).filter(|p| !p.is_empty()) {
            if piece.len() < self.chunk_size {
                run.push(piece);
                continue;
            }
            // Oversized piece: flush the pending run, then recurse with
            // finer separators
            if !run.is_empty() {
                chunks.extend(self.merge_run(&run, separator));
                run.clear();
            }
            if finer.is_empty() {
                chunks.extend(self.hard_split(piece));
            } else {
                chunks.extend(self.split_with_separators(piece, finer));
            }
        }
        if !run.is_empty() {
            chunks.extend(self.merge_run(&run, separator));
        }

        chunks
    }

    /// Greedily pack adjacent pieces into chunks up to `chunk_size`,
    /// carrying a tail of up to `chunk_overlap` bytes into the next chunk.
    fn merge_run(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = separator.len();
        let mut chunks = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for &piece in pieces {
            let added = piece.len() + if window.is_empty() { 0 } else { sep_len };
            if total + added > self.chunk_size && !window.is_empty() {
                chunks.push(window.join(separator));
                // Drop leading pieces until the retained tail fits the
                // overlap budget and leaves room for the incoming piece
                while total > self.chunk_overlap
                    || (total + piece.len() + if window.is_empty() { 0 } else { sep_len }
                        > self.chunk_size
                        && total > 0)
                {
                    total -= window[0].len() + if window.len() > 1 { sep_len } else { 0 };
                    window.remove(0);
                }
            }
            total += piece.len() + if window.is_empty() { 0 } else { sep_len };
            window.push(piece);
        }

        if !window.is_empty() {
            chunks.push(window.join(separator));
        }
        chunks
    }

    /// Last resort for separator-free text: fixed windows by char count.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end >= chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}
