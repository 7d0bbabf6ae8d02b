//! Recursive text splitting with overlap.
//!
//! Text is cut on the coarsest separator that still yields pieces no longer
//! than `chunk_size` (paragraph, then line, sentence, word, and finally single
//! characters). Pieces are then packed greedily into chunks, and consecutive
//! chunks share up to `chunk_overlap` bytes. Every chunk keeps the byte offset
//! where it starts within its page. Form feeds (`\x0c`) separate pages.

use std::collections::VecDeque;
use std::ops::Range;

const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];
const PAGE_BREAK: char = '\x0c';

/// Chunk size and overlap, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// One piece of a document, ready for [`CorpusIndex::add_chunk`](super::CorpusIndex::add_chunk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// 1-based page number.
    pub page: u32,
    /// Byte offset of `text` within its page.
    pub start_offset: usize,
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    size: usize,
    overlap: usize,
}

impl TextChunker {
    /// `chunk_size` of 0 is treated as 1; overlap is kept below the size.
    pub fn new(config: ChunkerConfig) -> Self {
        let size = config.chunk_size.max(1);
        Self {
            size,
            overlap: config.chunk_overlap.min(size - 1),
        }
    }

    /// Splits a whole document, page by page.
    pub fn split_document(&self, text: &str) -> Vec<Chunk> {
        self.split_pages(text.split(PAGE_BREAK))
    }

    /// Splits already-separated pages; the first item is page 1.
    pub fn split_pages<'a, I>(&self, pages: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = &'a str>,
    {
        pages
            .into_iter()
            .enumerate()
            .flat_map(|(i, page)| {
                let page_no = i as u32 + 1;
                self.split_page(page)
                    .into_iter()
                    .map(move |(start_offset, text)| Chunk {
                        text,
                        page: page_no,
                        start_offset,
                    })
            })
            .collect()
    }

    /// Splits one page into `(start_offset, text)` pairs. Chunks are trimmed;
    /// whitespace-only chunks are dropped.
    pub fn split_page(&self, page: &str) -> Vec<(usize, String)> {
        let mut atoms = Vec::new();
        self.collect_atoms(page, 0, SEPARATORS, &mut atoms);

        let mut out = Vec::new();
        let mut window: VecDeque<Range<usize>> = VecDeque::new();
        let mut window_len = 0usize;

        for atom in atoms {
            let len = atom.len();
            if !window.is_empty() && window_len + len > self.size {
                Self::emit(page, &window, &mut out);
                while let Some(front) = window.front() {
                    if window_len > self.overlap || window_len + len > self.size {
                        window_len -= front.len();
                        window.pop_front();
                    } else {
                        break;
                    }
                }
            }
            window_len += len;
            window.push_back(atom);
        }
        if !window.is_empty() {
            Self::emit(page, &window, &mut out);
        }
        out
    }

    fn emit(page: &str, window: &VecDeque<Range<usize>>, out: &mut Vec<(usize, String)>) {
        let (Some(first), Some(last)) = (window.front(), window.back()) else {
            return;
        };
        let raw = &page[first.start..last.end];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        let lead = raw.len() - raw.trim_start().len();
        out.push((first.start + lead, trimmed.to_string()));
    }

    /// Breaks `text` into contiguous ranges no longer than the chunk size.
    fn collect_atoms(&self, text: &str, offset: usize, seps: &[&str], out: &mut Vec<Range<usize>>) {
        if text.len() <= self.size {
            if !text.is_empty() {
                out.push(offset..offset + text.len());
            }
            return;
        }
        match seps.iter().position(|sep| text.contains(sep)) {
            Some(i) => {
                let mut local = 0;
                for piece in text.split_inclusive(seps[i]) {
                    self.collect_atoms(piece, offset + local, &seps[i + 1..], out);
                    local += piece.len();
                }
            }
            None => {
                for (i, c) in text.char_indices() {
                    out.push(offset + i..offset + i + c.len_utf8());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> TextChunker {
        TextChunker::new(ChunkerConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
    }

    /// **Scenario**: short text is one chunk at offset 0 on page 1.
    #[test]
    fn short_text_single_chunk() {
        let chunks = chunker(100, 10).split_document("  hello world  ");
        assert_eq!(
            chunks,
            vec![Chunk {
                text: "hello world".into(),
                page: 1,
                start_offset: 2
            }]
        );
    }

    /// **Scenario**: paragraphs are kept whole when they fit, and offsets point at the chunk text.
    #[test]
    fn splits_on_paragraphs_with_exact_offsets() {
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird one.";
        let chunks = chunker(30, 0).split_page(text);
        assert_eq!(chunks.len(), 3);
        for (offset, chunk) in &chunks {
            assert!(chunk.len() <= 30);
            assert!(text[*offset..].starts_with(chunk.as_str()), "{:?}", chunk);
        }
        assert_eq!(chunks[1].1, "Second paragraph here.");
    }

    /// **Scenario**: consecutive chunks overlap and no chunk exceeds the size.
    #[test]
    fn word_chunks_overlap() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = chunker(20, 8).split_page(text);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let (a_off, a) = &pair[0];
            let (b_off, _) = &pair[1];
            assert!(b_off < &(a_off + a.len()), "expected overlap: {:?}", pair);
        }
        for (offset, chunk) in &chunks {
            assert!(chunk.len() <= 20);
            assert_eq!(&text[*offset..*offset + chunk.len()], chunk);
        }
        let covered: String = chunks.last().map(|c| c.1.clone()).unwrap();
        assert!(covered.ends_with("kappa"));
    }

    /// **Scenario**: a word longer than the chunk size falls back to character splitting.
    #[test]
    fn long_word_falls_back_to_chars() {
        let chunks = chunker(4, 0).split_page("abcdefghij");
        let texts: Vec<&str> = chunks.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, ["abcd", "efgh", "ij"]);
        assert_eq!(chunks[2].0, 8);
    }

    /// **Scenario**: form feeds start new 1-based pages with page-relative offsets.
    #[test]
    fn form_feed_pages() {
        let chunks = chunker(100, 0).split_document("page one\x0c\x0c  page three");
        assert_eq!(chunks.len(), 2);
        assert_eq!((chunks[0].page, chunks[0].start_offset), (1, 0));
        assert_eq!((chunks[1].page, chunks[1].start_offset), (3, 2));
        assert_eq!(chunks[1].text, "page three");
    }

    #[test]
    fn overlap_clamped_below_size() {
        let c = chunker(5, 50);
        assert_eq!(c.overlap, 4);
        assert!(!c.split_page("one two three four").is_empty());
    }
}
